//! Error types for Duck Search
//!
//! Every error carries a message that can be shown to the user as is.
//! The web layer converts them into rendered notices or JSON bodies.

use crate::session::SessionState;
use chrono::NaiveDate;

/// Errors raised by the search pipeline
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Explicit date range with start after end
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// A UI parameter could not be interpreted
    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },

    /// The search provider failed or could not be reached
    #[error("search failed: {0}")]
    Gateway(String),

    /// A provider record lacked a mandatory field
    #[error("malformed record #{index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    /// Another operation is still running on this session
    #[error("a {0} operation is still in progress")]
    SessionBusy(SessionState),

    /// The session state machine does not allow this step
    #[error("cannot go from {from} to {to}")]
    InvalidTransition { from: SessionState, to: SessionState },

    /// The client went away before the search finished
    #[error("search was cancelled")]
    Cancelled,

    /// Filter or export requested before any search completed
    #[error("no search results yet")]
    NoResults,

    /// Serializing a table failed
    #[error("export failed: {0}")]
    Export(String),

    /// Reading an exported table back failed
    #[error("import failed: {0}")]
    Import(String),
}

impl SearchError {
    /// Shorthand for [`SearchError::InvalidParameter`]
    pub fn invalid(name: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            value: value.into(),
        }
    }

    /// Whether the error was caused by user input rather than the system
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRange { .. }
                | Self::InvalidParameter { .. }
                | Self::SessionBusy(_)
                | Self::InvalidTransition { .. }
                | Self::NoResults
        )
    }
}

impl From<csv::Error> for SearchError {
    fn from(e: csv::Error) -> Self {
        Self::Export(e.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for SearchError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        Self::Export(e.to_string())
    }
}

/// Convenience alias used across the pipeline
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_range_message() {
        let err = SearchError::InvalidRange {
            start: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "invalid date range: start 2024-01-07 is after end 2024-01-01"
        );
        assert!(err.is_user_error());
    }

    #[test]
    fn test_gateway_message_is_verbatim() {
        let err = SearchError::Gateway("HTTP error: 503".to_string());
        assert_eq!(err.to_string(), "search failed: HTTP error: 503");
        assert!(!err.is_user_error());
    }

    #[test]
    fn test_busy_message() {
        let err = SearchError::SessionBusy(SessionState::Searching);
        assert_eq!(err.to_string(), "a searching operation is still in progress");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchError>();
    }
}
