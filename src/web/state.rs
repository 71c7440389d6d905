//! Application state shared across handlers

use crate::config::Settings;
use crate::gateway::SearchGateway;
use crate::search::Search;
use crate::session::SessionStore;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Global settings
    pub settings: Arc<Settings>,
    /// Search executor
    pub search: Arc<Search>,
    /// Per-user sessions
    pub sessions: Arc<SessionStore>,
    /// Template renderer
    pub templates: Arc<super::Templates>,
}

impl AppState {
    /// Create new application state
    pub fn new(settings: Settings, gateway: Arc<dyn SearchGateway>) -> anyhow::Result<Self> {
        settings.validate()?;
        // vqd lookup plus up to five result pages
        let search_timeout = Duration::try_from_secs_f64(settings.outgoing.request_timeout * 6.0)?;
        let search = Arc::new(Search::new(gateway).with_timeout(search_timeout));
        let sessions = Arc::new(SessionStore::new(
            settings.session.ttl,
            settings.session.max_sessions,
        ));
        let templates = Arc::new(super::Templates::new()?);

        Ok(Self {
            settings: Arc::new(settings),
            search,
            sessions,
            templates,
        })
    }

    /// Get instance name
    pub fn instance_name(&self) -> &str {
        &self.settings.general.instance_name
    }

    /// Check if instance is public
    pub fn is_public(&self) -> bool {
        self.settings.server.public_instance
    }
}
