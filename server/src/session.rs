//! In-memory per-user sessions keyed by an opaque random id carried in
//! an HttpOnly cookie. Nothing is persisted; a restart logs everyone
//! out, which is acceptable for a stateless edit proxy.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use osm::auth::UserInfo;
use rand::Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Bearer token plus the display profile fetched once at login.
#[derive(Clone, Debug, Serialize)]
pub struct Session {
    #[serde(skip)]
    pub access_token: String,
    pub user: UserInfo,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the session under a freshly generated id.
    pub fn insert(&self, session: Session) -> String {
        let id = opaque_id();
        self.inner
            .write()
            .expect("session store lock poisoned")
            .insert(id.clone(), session);
        id
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.inner
            .read()
            .expect("session store lock poisoned")
            .get(id)
            .cloned()
    }

    pub fn remove(&self, id: &str) {
        self.inner
            .write()
            .expect("session store lock poisoned")
            .remove(id);
    }
}

/// 32 random bytes, base64url without padding. Used for session ids
/// and the OAuth `state` parameter.
pub fn opaque_id() -> String {
    let random_bytes: [u8; 32] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: &str) -> Session {
        Session {
            access_token: token.into(),
            user: UserInfo::default(),
        }
    }

    #[test]
    fn insert_get_remove_round_trip() {
        let store = SessionStore::new();
        let id = store.insert(session("tok-1"));

        let found = store.get(&id).expect("session exists");
        assert_eq!(found.access_token, "tok-1");

        store.remove(&id);
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn unknown_id_is_absent() {
        let store = SessionStore::new();
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn ids_are_unique_and_url_safe() {
        let a = opaque_id();
        let b = opaque_id();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn serialized_session_hides_the_token() {
        let json = serde_json::to_value(session("secret")).unwrap();
        assert!(json.get("access_token").is_none());
        assert!(json.get("user").is_some());
    }
}
