//! Search provider boundary
//!
//! A gateway turns a [`QueryDescriptor`] into loosely shaped records. It does
//! no typing of its own; [`crate::results::normalize`] takes it from there.

pub mod duckduckgo;

pub use duckduckgo::DuckDuckGo;

use crate::error::Result;
use crate::query::QueryDescriptor;
use async_trait::async_trait;

/// One hit as delivered by the provider
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// External search backend
#[async_trait]
pub trait SearchGateway: Send + Sync {
    /// Provider name, used in logs
    fn name(&self) -> &str;

    /// Run one search
    ///
    /// Network and provider failures come back as [`crate::SearchError::Gateway`].
    /// At most `query.max_results` records are returned.
    async fn search(&self, query: &QueryDescriptor) -> Result<Vec<RawRecord>>;
}
