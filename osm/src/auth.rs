//! OAuth2 authorization-code flow against the OSM identity provider,
//! plus the bearer-authenticated profile fetch. The client is
//! confidential: the token exchange authenticates with the client
//! id/secret over HTTP basic auth.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Scopes requested on every authorization: profile read + API write.
const SCOPE: &str = "read_prefs write_api";

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("OAuth client id/secret not configured")]
    MissingCredentials,

    #[error("token exchange failed ({status}): {body}")]
    TokenExchange { status: u16, body: String },

    #[error("invalid provider URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Identity-provider endpoints and client credentials.
///
/// Endpoint URLs default to openstreetmap.org; credentials have no
/// default and requests fail with [`AuthError::MissingCredentials`]
/// until they are configured.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_user_details_url")]
    pub user_details_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            user_details_url: default_user_details_url(),
        }
    }
}

fn default_authorize_url() -> String {
    "https://www.openstreetmap.org/oauth2/authorize".to_string()
}

fn default_token_url() -> String {
    "https://www.openstreetmap.org/oauth2/token".to_string()
}

fn default_user_details_url() -> String {
    "https://api.openstreetmap.org/api/0.6/user/details.json".to_string()
}

/// Token endpoint response. Only the access token is used; the
/// provider never issues a refresh token for this flow.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Display profile fetched once at login. Both fields are best-effort;
/// a failed or partial fetch leaves them empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
struct UserDetails {
    #[serde(default)]
    user: UserInfo,
}

pub struct AuthClient {
    config: AuthConfig,
    http: reqwest::Client,
}

impl AuthClient {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn require_credentials(&self) -> Result<(), AuthError> {
        if self.config.client_id.is_empty() || self.config.client_secret.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        Ok(())
    }

    /// Builds the authorization redirect URL for the given callback.
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<String, AuthError> {
        self.require_credentials()?;
        let mut url = Url::parse(&self.config.authorize_url)
            .map_err(|e| AuthError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", SCOPE)
            .append_pair("state", state);
        Ok(url.into())
    }

    /// Exchanges an authorization code for a bearer token.
    ///
    /// A non-success response surfaces the provider's status and body
    /// verbatim; nothing is retried.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, AuthError> {
        self.require_credentials()?;
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&params)
            .timeout(UPSTREAM_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenExchange { status, body });
        }
        Ok(response.json::<TokenResponse>().await?)
    }

    /// Fetches the logged-in user's display profile. Callers treat a
    /// failure here as non-fatal and fall back to an empty profile.
    pub async fn user_details(&self, access_token: &str) -> Result<UserInfo, AuthError> {
        let response = self
            .http
            .get(&self.config.user_details_url)
            .bearer_auth(access_token)
            .timeout(UPSTREAM_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<UserDetails>().await?.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::serve;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    fn config_with(token_url: String) -> AuthConfig {
        AuthConfig {
            client_id: "cid".into(),
            client_secret: "sekrit".into(),
            token_url,
            ..AuthConfig::default()
        }
    }

    #[test]
    fn authorize_url_carries_flow_parameters() {
        let client = AuthClient::new(config_with(default_token_url()));
        let url = client
            .authorize_url("https://app.example/auth/osm/callback", "st4te")
            .unwrap();

        assert!(url.starts_with("https://www.openstreetmap.org/oauth2/authorize?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("scope=read_prefs+write_api"));
        assert!(url.contains("state=st4te"));
    }

    #[test]
    fn missing_credentials_fail_before_any_call() {
        let client = AuthClient::new(AuthConfig::default());
        let err = client.authorize_url("https://app.example/cb", "s").unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));
    }

    #[tokio::test]
    async fn exchange_code_returns_token() {
        let app = Router::new().route(
            "/token",
            post(|| async { Json(json!({"access_token": "tok-1", "token_type": "Bearer"})) }),
        );
        let addr = serve(app).await;

        let client = AuthClient::new(config_with(format!("http://{addr}/token")));
        let token = client
            .exchange_code("the-code", "https://app.example/cb")
            .await
            .unwrap();
        assert_eq!(token.access_token, "tok-1");
    }

    #[tokio::test]
    async fn exchange_failure_surfaces_status_and_body() {
        let app = Router::new().route(
            "/token",
            post(|| async { (axum::http::StatusCode::BAD_REQUEST, "invalid_grant") }),
        );
        let addr = serve(app).await;

        let client = AuthClient::new(config_with(format!("http://{addr}/token")));
        let err = client
            .exchange_code("stale", "https://app.example/cb")
            .await
            .unwrap_err();
        match err {
            AuthError::TokenExchange { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "invalid_grant");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn user_details_parses_profile() {
        let app = Router::new().route(
            "/user/details.json",
            get(|| async { Json(json!({"user": {"id": 99, "display_name": "mapper"}})) }),
        );
        let addr = serve(app).await;

        let mut config = config_with(default_token_url());
        config.user_details_url = format!("http://{addr}/user/details.json");
        let client = AuthClient::new(config);

        let user = client.user_details("tok").await.unwrap();
        assert_eq!(user.id, Some(99));
        assert_eq!(user.display_name.as_deref(), Some("mapper"));
    }
}
