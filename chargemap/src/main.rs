use clap::Parser;
use server::config::{Config, ConfigError};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Crowd-sourced EV charging-station map editor.
#[derive(Parser)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum MainError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Server(#[from] server::ServerError),
}

#[tokio::main]
async fn main() -> Result<(), MainError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;
    server::run(config).await?;
    Ok(())
}
