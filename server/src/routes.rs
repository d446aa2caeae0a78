use crate::error::AppError;
use crate::session::{self, Session};
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::http::header::HOST;
use axum::response::{Html, Redirect};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use osm::auth::UserInfo;
use osm::editing::{BatchOutcome, BatchUpdate, CreateOutcome, CreateStation, UpdateOutcome, UpdateStation};
use osm::overpass::Bbox;
use serde::Deserialize;
use serde_json::{Value, json};

const SESSION_COOKIE: &str = "chargemap_session";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/auth/osm", get(auth_begin))
        .route("/auth/osm/callback", get(auth_callback))
        .route("/auth/logout", post(logout))
        .route("/api/me", get(me))
        .route("/api/pois", get(pois))
        .route("/api/changeset", post(create_station))
        .route("/api/changeset/update", patch(update_station))
        .route("/api/changeset/batch", post(batch_update))
        .with_state(state)
}

/// Map UI shell with the map-provider token injected.
async fn index(State(state): State<AppState>) -> Html<String> {
    let page = include_str!("../assets/index.html")
        .replace("__MAPBOX_TOKEN__", &state.config.mapbox_token);
    Html(page)
}

/// Callback URL for the OAuth redirect: the configured base URL when
/// present, otherwise derived from the request's Host header.
fn callback_url(state: &AppState, headers: &HeaderMap) -> String {
    let base = match &state.config.base_url {
        Some(base) => base.trim_end_matches('/').to_string(),
        None => {
            let host = headers
                .get(HOST)
                .and_then(|h| h.to_str().ok())
                .unwrap_or("localhost");
            format!("http://{host}")
        }
    };
    format!("{base}/auth/osm/callback")
}

async fn auth_begin(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Redirect, AppError> {
    let redirect_uri = callback_url(&state, &headers);
    let url = state.auth.authorize_url(&redirect_uri, &session::opaque_id())?;
    Ok(Redirect::to(&url))
}

#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
}

async fn auth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Result<(CookieJar, Redirect), AppError> {
    let code = params.code.ok_or(AppError::MissingCode)?;
    let redirect_uri = callback_url(&state, &headers);
    let token = state.auth.exchange_code(&code, &redirect_uri).await?;

    // Profile fetch is best-effort; a failure downgrades to an empty
    // profile rather than failing the login.
    let user = match state.auth.user_details(&token.access_token).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "profile fetch failed, continuing without it");
            UserInfo::default()
        }
    };

    let id = state.sessions.insert(Session {
        access_token: token.access_token,
        user,
    });
    let cookie = Cookie::build((SESSION_COOKIE, id))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build();
    Ok((jar.add(cookie), Redirect::to("/")))
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, &'static str) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    (jar.remove(Cookie::from(SESSION_COOKIE)), "ok")
}

async fn me(State(state): State<AppState>, jar: CookieJar) -> Json<Value> {
    match current_session(&state, &jar) {
        Some(session) => Json(json!({"authenticated": true, "user": session.user})),
        None => Json(json!({"authenticated": false, "user": {}})),
    }
}

#[derive(Deserialize)]
struct PoisParams {
    bbox: Option<String>,
}

async fn pois(
    State(state): State<AppState>,
    Query(params): Query<PoisParams>,
) -> Result<Json<Value>, AppError> {
    let raw = params.bbox.ok_or(AppError::MissingBbox)?;
    let bbox = Bbox::parse(&raw)?;
    let collection = state.overpass.charging_stations(&bbox).await?;
    Ok(Json(collection))
}

async fn create_station(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<CreateStation>,
) -> Result<Json<CreateOutcome>, AppError> {
    let session = require_session(&state, &jar)?;
    let outcome = state
        .edit
        .create_station(&session.access_token, &payload)
        .await?;
    Ok(Json(outcome))
}

async fn update_station(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<UpdateStation>,
) -> Result<Json<UpdateOutcome>, AppError> {
    let session = require_session(&state, &jar)?;
    let outcome = state
        .edit
        .update_station(&session.access_token, &payload)
        .await?;
    Ok(Json(outcome))
}

async fn batch_update(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<BatchUpdate>,
) -> Result<Json<BatchOutcome>, AppError> {
    let session = require_session(&state, &jar)?;
    let outcome = state
        .edit
        .batch_update(&session.access_token, &payload)
        .await?;
    Ok(Json(outcome))
}

fn current_session(state: &AppState, jar: &CookieJar) -> Option<Session> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| state.sessions.get(cookie.value()))
}

/// Auth gate for write endpoints: resolved purely from the session
/// store, with no upstream call.
fn require_session(state: &AppState, jar: &CookieJar) -> Result<Session, AppError> {
    current_session(state, jar).ok_or(AppError::Unauthenticated)
}
