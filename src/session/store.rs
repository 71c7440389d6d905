//! In-memory session storage

use super::Session;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A session shared between requests of the same user
pub type SharedSession = Arc<Mutex<Session>>;

/// Sessions keyed by id, evicted after a period of inactivity
pub struct SessionStore {
    cache: Cache<String, SharedSession>,
}

impl SessionStore {
    /// Create a store with the given idle timeout and capacity
    pub fn new(ttl_seconds: u64, max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .time_to_idle(Duration::from_secs(ttl_seconds))
            .max_capacity(max_capacity)
            .build();

        Self { cache }
    }

    /// Look up an existing session
    pub async fn get(&self, id: &str) -> Option<SharedSession> {
        self.cache.get(id).await
    }

    /// Create and store a fresh session
    pub async fn create(&self) -> (String, SharedSession) {
        let id = Uuid::new_v4().to_string();
        let session = Arc::new(Mutex::new(Session::new(id.clone())));
        self.cache.insert(id.clone(), session.clone()).await;
        (id, session)
    }

    /// Existing session for `id`, or a new one
    ///
    /// The returned flag is true when a session was created, so the caller
    /// knows to hand the new id back to the client.
    pub async fn get_or_create(&self, id: Option<&str>) -> (String, SharedSession, bool) {
        if let Some(id) = id {
            if let Some(session) = self.get(id).await {
                return (id.to_string(), session, false);
            }
        }

        let (id, session) = self.create().await;
        (id, session, true)
    }

    /// Forget a session
    pub async fn remove(&self, id: &str) {
        self.cache.remove(id).await;
    }

    /// Approximate number of live sessions
    pub fn size(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(3600, 10_000) // 1 hour idle timeout
    }
}
