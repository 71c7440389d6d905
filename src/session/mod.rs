//! Session state
//!
//! A [`Session`] owns everything one user has produced so far: the last
//! query, its result table, the active filter and any messages to show.
//! Operations move the session through a small state machine:
//!
//! ```text
//! Idle -> Searching -> Ready -> Filtering -> Ready -> Exporting -> Ready
//!                        \-> Searching (new search discards the table)
//! ```
//!
//! `Searching`, `Filtering` and `Exporting` are transient. Starting any
//! operation while one of them is active fails with
//! [`SearchError::SessionBusy`]. Failures return to `Ready` when a table
//! exists and to `Idle` otherwise.

mod store;

pub use store::{SessionStore, SharedSession};

use crate::error::{Result, SearchError};
use crate::export::{self, ExportFormat, ExportedFile};
use crate::filter::{self, FilterSpec};
use crate::query::QueryDescriptor;
use crate::results::{Normalized, ResultTable};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

/// Position in the session state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Searching,
    Ready,
    Filtering,
    Exporting,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Searching => "searching",
            Self::Ready => "ready",
            Self::Filtering => "filtering",
            Self::Exporting => "exporting",
        }
    }

    /// States that only last for the duration of one operation
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Searching | Self::Filtering | Self::Exporting)
    }

    /// Allowed edges of the state machine
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Searching)
                | (Ready, Searching)
                | (Ready, Filtering)
                | (Ready, Exporting)
                | (Searching, Ready)
                | (Searching, Idle)
                | (Filtering, Ready)
                | (Exporting, Ready)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Informational message; not an error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// The search succeeded but the provider returned nothing usable
    NoResults,
    /// The active filter matched no rows
    EmptyFilterResult { terms: Vec<String> },
    /// Some provider records were dropped during normalization
    SkippedRecords { count: usize },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResults => write!(f, "The search returned no results."),
            Self::EmptyFilterResult { terms } => {
                write!(f, "No results match the filter \"{}\".", terms.join(" "))
            }
            Self::SkippedRecords { count } => {
                write!(f, "{} malformed result(s) were skipped.", count)
            }
        }
    }
}

/// Per-user search state
#[derive(Debug, Clone, Default)]
pub struct Session {
    id: String,
    state: SessionState,
    query: Option<QueryDescriptor>,
    pending: Option<QueryDescriptor>,
    table: Option<ResultTable>,
    filter: Option<FilterSpec>,
    filtered: Option<ResultTable>,
    last_error: Option<String>,
    notices: Vec<Notice>,
    warnings: Vec<String>,
}

impl Session {
    /// Create an idle session
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Query that produced the stored table
    pub fn query(&self) -> Option<&QueryDescriptor> {
        self.query.as_ref()
    }

    /// Full table of the last successful search
    pub fn table(&self) -> Option<&ResultTable> {
        self.table.as_ref()
    }

    /// Active filter, if any
    pub fn filter(&self) -> Option<&FilterSpec> {
        self.filter.as_ref()
    }

    /// Table to display or export: filtered when a filter is active
    pub fn current_table(&self) -> Option<&ResultTable> {
        self.filtered.as_ref().or(self.table.as_ref())
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Per-record problems reported by the last search
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn transition(&mut self, next: SessionState) -> Result<()> {
        if self.state.is_transient() && next.is_transient() {
            return Err(SearchError::SessionBusy(self.state));
        }
        if !self.state.can_transition_to(next) {
            return Err(SearchError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        debug!("Session {}: {} -> {}", self.id, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Leave a transient state after a failure, keeping the message
    fn fail(&mut self, err: &SearchError) {
        self.state = if self.table.is_some() {
            SessionState::Ready
        } else {
            SessionState::Idle
        };
        self.last_error = Some(err.to_string());
    }

    /// Enter `Searching` for `query`
    ///
    /// The previous table stays available until the search settles.
    pub fn begin_search(&mut self, query: QueryDescriptor) -> Result<()> {
        self.transition(SessionState::Searching)?;
        self.last_error = None;
        self.notices.clear();
        self.pending = Some(query);
        Ok(())
    }

    /// Store the outcome of the search started by [`Session::begin_search`]
    pub fn finish_search(&mut self, outcome: Result<Normalized>) -> Result<&ResultTable> {
        if self.state != SessionState::Searching {
            return Err(SearchError::InvalidTransition {
                from: self.state,
                to: SessionState::Ready,
            });
        }

        let pending = self.pending.take();
        let normalized = match outcome {
            Ok(normalized) => normalized,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        self.warnings = normalized.skipped.iter().map(|e| e.to_string()).collect();
        if !self.warnings.is_empty() {
            self.notices.push(Notice::SkippedRecords {
                count: self.warnings.len(),
            });
        }
        if normalized.table.is_empty() {
            self.notices.push(Notice::NoResults);
        }

        info!(
            "Session {}: stored {} {} results",
            self.id,
            normalized.table.len(),
            normalized.table.kind()
        );

        self.query = pending;
        self.filter = None;
        self.filtered = None;
        self.state = SessionState::Ready;
        Ok(self.table.insert(normalized.table))
    }

    /// Apply `spec` to the stored table; an empty spec clears the filter
    pub fn apply_filter(&mut self, spec: FilterSpec) -> Result<&ResultTable> {
        if self.table.is_none() {
            let err = SearchError::NoResults;
            self.last_error = Some(err.to_string());
            return Err(err);
        }
        self.transition(SessionState::Filtering)?;
        self.last_error = None;
        self.notices.clear();

        let filtered = match &self.table {
            Some(table) if !spec.is_empty() => Some(filter::apply(table, &spec)),
            _ => None,
        };

        match filtered {
            Some(filtered) => {
                if filtered.is_empty() {
                    self.notices.push(Notice::EmptyFilterResult {
                        terms: spec.terms().to_vec(),
                    });
                }
                self.filter = Some(spec);
                self.filtered = Some(filtered);
            }
            None => {
                self.filter = None;
                self.filtered = None;
            }
        }

        self.transition(SessionState::Ready)?;
        self.current_table().ok_or(SearchError::NoResults)
    }

    /// Drop the active filter
    pub fn clear_filter(&mut self) -> Result<&ResultTable> {
        self.apply_filter(FilterSpec::default())
    }

    /// Serialize the current (possibly filtered) table
    pub fn export(&mut self, format: ExportFormat) -> Result<ExportedFile> {
        if self.table.is_none() {
            let err = SearchError::NoResults;
            self.last_error = Some(err.to_string());
            return Err(err);
        }
        self.transition(SessionState::Exporting)?;

        let keyword = self
            .query
            .as_ref()
            .map(|q| q.keyword.clone())
            .unwrap_or_default();

        let outcome = match self.current_table() {
            Some(table) => export::export(table, format).map(|bytes| ExportedFile {
                file_name: format.file_name(&keyword, table.kind()),
                mime_type: format.mime_type(),
                bytes,
            }),
            None => Err(SearchError::NoResults),
        };

        match outcome {
            Ok(file) => {
                self.transition(SessionState::Ready)?;
                info!(
                    "Session {}: exported {} ({} bytes)",
                    self.id,
                    file.file_name,
                    file.bytes.len()
                );
                Ok(file)
            }
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ResultKind;
    use crate::results::{Link, ResultRecord, TextRecord};

    fn normalized(titles: &[&str]) -> Normalized {
        let records = titles
            .iter()
            .map(|t| {
                ResultRecord::Text(TextRecord {
                    title: t.to_string(),
                    body: String::new(),
                    link: Link::empty(),
                })
            })
            .collect();
        Normalized {
            table: ResultTable::from_records(ResultKind::Text, records).unwrap(),
            skipped: vec![],
        }
    }

    fn ready_session(titles: &[&str]) -> Session {
        let mut session = Session::new("s1");
        session
            .begin_search(QueryDescriptor::simple("tokyo", ResultKind::Text))
            .unwrap();
        session.finish_search(Ok(normalized(titles))).unwrap();
        session
    }

    #[test]
    fn test_search_cycle() {
        let session = ready_session(&["a", "b"]);
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.table().unwrap().len(), 2);
        assert_eq!(session.query().unwrap().keyword, "tokyo");
    }

    #[test]
    fn test_search_rejected_while_searching() {
        let mut session = Session::new("s1");
        session
            .begin_search(QueryDescriptor::simple("a", ResultKind::Text))
            .unwrap();

        let err = session
            .begin_search(QueryDescriptor::simple("b", ResultKind::Text))
            .unwrap_err();
        assert!(matches!(err, SearchError::SessionBusy(SessionState::Searching)));
    }

    #[test]
    fn test_failed_first_search_returns_to_idle() {
        let mut session = Session::new("s1");
        session
            .begin_search(QueryDescriptor::simple("a", ResultKind::Text))
            .unwrap();

        let err = session
            .finish_search(Err(SearchError::Gateway("HTTP error: 503".to_string())))
            .unwrap_err();
        assert!(matches!(err, SearchError::Gateway(_)));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.last_error(), Some("search failed: HTTP error: 503"));
    }

    #[test]
    fn test_failed_search_keeps_previous_table() {
        let mut session = ready_session(&["a"]);
        session
            .begin_search(QueryDescriptor::simple("other", ResultKind::Text))
            .unwrap();
        let _ = session.finish_search(Err(SearchError::Gateway("down".to_string())));

        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.table().unwrap().len(), 1);
        assert_eq!(session.query().unwrap().keyword, "tokyo");
    }

    #[test]
    fn test_new_search_discards_filter() {
        let mut session = ready_session(&["a", "b"]);
        session.apply_filter(FilterSpec::parse("a", true)).unwrap();

        session
            .begin_search(QueryDescriptor::simple("next", ResultKind::Text))
            .unwrap();
        session.finish_search(Ok(normalized(&["x", "y", "z"]))).unwrap();

        assert!(session.filter().is_none());
        assert_eq!(session.current_table().unwrap().len(), 3);
    }

    #[test]
    fn test_filter_and_clear() {
        let mut session = ready_session(&["apple", "banana"]);

        let view = session.apply_filter(FilterSpec::parse("APP", false)).unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(session.table().unwrap().len(), 2);

        let view = session.clear_filter().unwrap();
        assert_eq!(view.len(), 2);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn test_empty_filter_result_is_a_notice() {
        let mut session = ready_session(&["apple"]);
        let view = session.apply_filter(FilterSpec::parse("zzz", false)).unwrap();

        assert!(view.is_empty());
        assert!(session.last_error().is_none());
        assert_eq!(
            session.notices(),
            &[Notice::EmptyFilterResult {
                terms: vec!["zzz".to_string()]
            }]
        );
    }

    #[test]
    fn test_filter_without_results() {
        let mut session = Session::new("s1");
        let err = session.apply_filter(FilterSpec::parse("a", false)).unwrap_err();
        assert!(matches!(err, SearchError::NoResults));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_export_uses_filtered_table() {
        let mut session = ready_session(&["apple", "banana", "cherry"]);
        session.apply_filter(FilterSpec::parse("an", true)).unwrap();

        let file = session.export(ExportFormat::Csv).unwrap();
        assert_eq!(file.file_name, "tokyo_text_results.csv");

        let table = export::read_csv(ResultKind::Text, &file.bytes).unwrap();
        let titles: Vec<_> = table.records().iter().map(|r| r.title()).collect();
        assert_eq!(titles, vec!["banana"]);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn test_empty_search_notice() {
        let session = ready_session(&[]);
        assert_eq!(session.notices(), &[Notice::NoResults]);
    }

    #[test]
    fn test_transition_table() {
        assert!(SessionState::Idle.can_transition_to(SessionState::Searching));
        assert!(!SessionState::Idle.can_transition_to(SessionState::Filtering));
        assert!(!SessionState::Searching.can_transition_to(SessionState::Filtering));
        assert!(SessionState::Exporting.can_transition_to(SessionState::Ready));
    }
}
