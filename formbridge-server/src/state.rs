//! Shared application state for the HTTP server.

use std::sync::Arc;

use formbridge::io::airtable::RemoteTables;
use formbridge::io::config::AppConfig;
use formbridge::io::oauth::TokenExchange;
use formbridge::io::store::JsonStore;

use crate::session::{SessionStore, SessionTtl};

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<JsonStore>,
    /// Remote table API client.
    pub remote: Arc<dyn RemoteTables>,
    /// OAuth authorize/token endpoints.
    pub oauth: Arc<dyn TokenExchange>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: JsonStore,
        remote: Arc<dyn RemoteTables>,
        oauth: Arc<dyn TokenExchange>,
    ) -> Self {
        let sessions = SessionStore::new(SessionTtl::from_config(&config.server));
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            remote,
            oauth,
            sessions: Arc::new(sessions),
        }
    }
}
