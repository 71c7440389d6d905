//! Search execution

use crate::error::{Result, SearchError};
use crate::gateway::SearchGateway;
use crate::query::QueryDescriptor;
use crate::results::{normalize, Normalized, ResultTable};
use crate::session::Session;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, warn};

/// Runs queries against a gateway and normalizes what comes back
pub struct Search {
    gateway: Arc<dyn SearchGateway>,
    /// Upper bound for one gateway call, pagination included
    timeout: Duration,
}

impl Search {
    pub fn new(gateway: Arc<dyn SearchGateway>) -> Self {
        Self {
            gateway,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the overall timeout of a search
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.name()
    }

    /// Query the gateway and normalize its records
    ///
    /// Malformed records are reported in [`Normalized::skipped`] and never
    /// fail the search.
    pub async fn execute(&self, query: &QueryDescriptor) -> Result<Normalized> {
        let start = Instant::now();
        info!(
            "Searching {} for '{}' ({}, max {})",
            self.gateway.name(),
            query.provider_keywords(),
            query.kind,
            query.max_results
        );

        let raw = match timeout(self.timeout, self.gateway.search(query)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!("{} failed after {:?}: {}", self.gateway.name(), start.elapsed(), e);
                return Err(e);
            }
            Err(_) => {
                warn!("{} timed out after {:?}", self.gateway.name(), self.timeout);
                return Err(SearchError::Gateway(format!(
                    "timed out after {} seconds",
                    self.timeout.as_secs_f64()
                )));
            }
        };

        let normalized = normalize(query.kind, raw);
        info!(
            "{} results ({} skipped) in {:?}",
            normalized.table.len(),
            normalized.skipped.len(),
            start.elapsed()
        );
        Ok(normalized)
    }

    /// Run `query` inside `session`, replacing its table on success
    ///
    /// The session is borrowed for the whole call. Callers that share a
    /// session between tasks should use [`Session::begin_search`] and
    /// [`Session::finish_search`] around [`Search::execute`] instead, so
    /// the lock is not held across the network round trip.
    pub async fn run_search<'s>(
        &self,
        session: &'s mut Session,
        query: QueryDescriptor,
    ) -> Result<&'s ResultTable> {
        session.begin_search(query.clone())?;
        let outcome = self.execute(&query).await;
        session.finish_search(outcome)
    }
}
