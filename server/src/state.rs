use crate::config::Config;
use crate::session::SessionStore;
use osm::auth::AuthClient;
use osm::editing::EditClient;
use osm::overpass::OverpassClient;
use std::sync::Arc;

/// Shared handler state: configuration plus one client per upstream
/// service and the in-memory session store.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: SessionStore,
    pub auth: Arc<AuthClient>,
    pub edit: Arc<EditClient>,
    pub overpass: Arc<OverpassClient>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let auth = Arc::new(AuthClient::new(config.oauth.clone()));
        let edit = Arc::new(EditClient::new(config.osm_api.clone()));
        let overpass = Arc::new(OverpassClient::new(config.overpass_mirrors.clone()));

        Self {
            config: Arc::new(config),
            sessions: SessionStore::new(),
            auth,
            edit,
            overpass,
        }
    }
}
