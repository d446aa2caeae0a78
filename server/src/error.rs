use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use osm::auth::AuthError;
use osm::editing::EditError;
use osm::overpass::OverpassError;
use serde_json::json;

/// Domain failures surfaced to the browser. Every variant maps to a
/// structured JSON body `{"error": <identifier>, "detail": ...}`; no
/// failure is converted to success.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("missing authorization code")]
    MissingCode,

    #[error("bbox query parameter required")]
    MissingBbox,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Overpass(#[from] OverpassError),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::MissingCode | Self::MissingBbox => StatusCode::BAD_REQUEST,
            Self::Auth(AuthError::MissingCredentials) | Self::Auth(AuthError::InvalidUrl(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(_) => StatusCode::BAD_GATEWAY,
            Self::Edit(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            Self::Edit(_) => StatusCode::BAD_GATEWAY,
            Self::Overpass(OverpassError::InvalidBbox(_)) => StatusCode::BAD_REQUEST,
            Self::Overpass(OverpassError::Unavailable { .. }) => StatusCode::BAD_GATEWAY,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "not_authenticated",
            Self::MissingCode => "missing_code",
            Self::MissingBbox => "bbox_required",
            Self::Auth(AuthError::MissingCredentials) => "missing_oauth_config",
            Self::Auth(AuthError::TokenExchange { .. }) => "token_exchange_failed",
            Self::Auth(AuthError::InvalidUrl(_)) => "invalid_provider_url",
            Self::Auth(AuthError::Http(_)) => "identity_provider_unavailable",
            Self::Edit(e) => edit_code(e),
            Self::Overpass(OverpassError::InvalidBbox(_)) => "invalid_bbox",
            Self::Overpass(OverpassError::Unavailable { .. }) => "overpass_unavailable",
        }
    }
}

fn edit_code(e: &EditError) -> &'static str {
    match e {
        EditError::MissingComment => "missing_comment",
        EditError::MissingTags(_) => "missing_tags",
        EditError::MissingCoordinates => "missing_coordinates",
        EditError::UnsupportedType(_) => "invalid_type",
        EditError::MissingIdOrVersion => "missing_id_version",
        EditError::EmptyBatch => "no_updates",
        EditError::BatchItem { source, .. } => edit_code(source),
        EditError::Upstream { .. } => "update_failed",
        EditError::Http(_) => "osm_unavailable",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "error": self.code(),
            "detail": self.to_string(),
        });

        match &self {
            AppError::Edit(EditError::MissingTags(tags)) => {
                body["tags"] = json!(tags);
            }
            AppError::Edit(EditError::BatchItem { index, .. }) => {
                body["item"] = json!(index);
            }
            _ => {}
        }

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(body)).into_response()
    }
}
