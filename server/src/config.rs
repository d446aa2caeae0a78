use osm::auth::AuthConfig;
use osm::editing::DEFAULT_API_BASE;
use osm::overpass::DEFAULT_MIRRORS;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

#[derive(Debug, Deserialize)]
pub struct Listener {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    5891
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,
    #[serde(default)]
    pub oauth: AuthConfig,
    /// Externally visible base URL for the OAuth redirect. When unset
    /// the callback URL is derived from the request's Host header.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub mapbox_token: String,
    #[serde(default = "default_osm_api")]
    pub osm_api: String,
    #[serde(default = "default_overpass_mirrors")]
    pub overpass_mirrors: Vec<String>,
}

fn default_osm_api() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_overpass_mirrors() -> Vec<String> {
    DEFAULT_MIRRORS.iter().map(|m| m.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: Listener::default(),
            oauth: AuthConfig::default(),
            base_url: None,
            mapbox_token: String::new(),
            osm_api: default_osm_api(),
            overpass_mirrors: default_overpass_mirrors(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let mut config: Config = serde_yaml::from_reader(file)?;
        config.override_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies deployment-supplied overrides. Secrets in particular
    /// arrive via the environment rather than the config file.
    pub fn override_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("OSM_CLIENT_ID") {
            self.oauth.client_id = v;
        }
        if let Some(v) = var("OSM_CLIENT_SECRET") {
            self.oauth.client_secret = v;
        }
        if let Some(v) = var("BASE_URL") {
            self.base_url = Some(v);
        }
        if let Some(v) = var("MAPBOX_TOKEN") {
            self.mapbox_token = v;
        }
        if let Some(port) = var("PORT").and_then(|v| v.parse().ok()) {
            self.listener.port = port;
        }
    }
}
