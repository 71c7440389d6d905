//! Result filtering
//!
//! A row is kept when every filter term occurs as a substring of at least
//! one of its cells. Terms are ANDed, cells are ORed. Matching is plain
//! substring containment, optionally case-insensitive.

use crate::results::{ResultRecord, ResultTable};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Filter terms and matching mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    terms: Vec<String>,
    pub case_sensitive: bool,
}

impl FilterSpec {
    /// Create a filter from explicit terms; empty terms are dropped
    pub fn new<I, S>(terms: I, case_sensitive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
            case_sensitive,
        }
    }

    /// Parse the text typed into the filter box
    ///
    /// Terms are separated by any Unicode whitespace, which includes the
    /// full-width space entered by Japanese input methods.
    pub fn parse(text: &str, case_sensitive: bool) -> Self {
        Self::new(text.split_whitespace(), case_sensitive)
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// A filter without terms keeps every row
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms as typed, joined by single spaces
    pub fn text(&self) -> String {
        self.terms.join(" ")
    }

    fn matcher(&self) -> Matcher {
        Matcher {
            terms: self.terms.iter().map(|t| self.fold(t)).collect(),
            case_sensitive: self.case_sensitive,
        }
    }

    fn fold(&self, text: &str) -> String {
        if self.case_sensitive {
            text.to_string()
        } else {
            text.to_lowercase()
        }
    }
}

/// Terms prepared once per filter run
struct Matcher {
    terms: Vec<String>,
    case_sensitive: bool,
}

impl Matcher {
    fn matches(&self, record: &ResultRecord) -> bool {
        let cells: Vec<String> = record
            .cells()
            .iter()
            .map(|cell| {
                let text = cell.as_filter_text();
                if self.case_sensitive {
                    text.to_string()
                } else {
                    text.to_lowercase()
                }
            })
            .collect();

        self.terms
            .iter()
            .all(|term| cells.iter().any(|cell| cell.contains(term.as_str())))
    }
}

/// Apply `spec` to `table`, keeping the original row order
pub fn apply(table: &ResultTable, spec: &FilterSpec) -> ResultTable {
    if spec.is_empty() {
        return table.clone();
    }

    let matcher = spec.matcher();
    let filtered = table.retain_view(|record| matcher.matches(record));

    debug!(
        "Filter {:?} kept {} of {} rows",
        spec.terms(),
        filtered.len(),
        table.len()
    );

    filtered
}
