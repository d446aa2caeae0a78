//! HTTP surface for the charging-station map editor. Pure dispatch:
//! handlers validate field presence, delegate to the `osm` clients,
//! and translate domain failures to HTTP statuses.

pub mod config;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;

use crate::config::Config;
use crate::state::AppState;

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn run(config: Config) -> Result<(), ServerError> {
    let addr = format!("{}:{}", config.listener.host, config.listener.port);
    let state = AppState::new(config);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "chargemap server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
