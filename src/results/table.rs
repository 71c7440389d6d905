//! Result table produced by one search

use super::types::{columns, Cell, ResultRecord};
use crate::error::{Result, SearchError};
use crate::query::ResultKind;
use serde::{Deserialize, Serialize};

/// Ordered results of a single search, all of the same type
///
/// The table cannot be modified once built; filtering produces a new table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTable {
    kind: ResultKind,
    records: Vec<ResultRecord>,
}

impl ResultTable {
    /// Create an empty table
    pub fn new(kind: ResultKind) -> Self {
        Self {
            kind,
            records: Vec::new(),
        }
    }

    /// Build a table, checking that every record matches `kind`
    pub fn from_records(kind: ResultKind, records: Vec<ResultRecord>) -> Result<Self> {
        if let Some((index, record)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.kind() != kind)
        {
            return Err(SearchError::MalformedRecord {
                index,
                reason: format!("expected a {} record, found {}", kind, record.kind()),
            });
        }

        Ok(Self { kind, records })
    }

    /// Records already known to match the table's kind
    pub(crate) fn push(&mut self, record: ResultRecord) {
        debug_assert_eq!(record.kind(), self.kind);
        self.records.push(record);
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Column display names in declared order
    pub fn columns(&self) -> &'static [&'static str] {
        columns(self.kind)
    }

    /// Cells of every row, in table order
    pub fn rows(&self) -> impl Iterator<Item = Vec<Cell<'_>>> + '_ {
        self.records.iter().map(ResultRecord::cells)
    }

    /// New table keeping only the records accepted by `keep`, order preserved
    pub fn retain_view(&self, mut keep: impl FnMut(&ResultRecord) -> bool) -> Self {
        Self {
            kind: self.kind,
            records: self.records.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{ImageRecord, Link, TextRecord};

    fn text(title: &str) -> ResultRecord {
        ResultRecord::Text(TextRecord {
            title: title.to_string(),
            body: String::new(),
            link: Link::empty(),
        })
    }

    #[test]
    fn test_from_records_rejects_mixed_kinds() {
        let image = ResultRecord::Image(ImageRecord {
            title: "img".to_string(),
            image_link: Link::empty(),
            source_link: Link::empty(),
        });

        let err = ResultTable::from_records(ResultKind::Text, vec![text("a"), image]).unwrap_err();
        assert!(matches!(err, SearchError::MalformedRecord { index: 1, .. }));
    }

    #[test]
    fn test_retain_view_keeps_order() {
        let table =
            ResultTable::from_records(ResultKind::Text, vec![text("a"), text("b"), text("c")])
                .unwrap();
        let view = table.retain_view(|r| r.title() != "b");

        let titles: Vec<_> = view.records().iter().map(|r| r.title()).collect();
        assert_eq!(titles, vec!["a", "c"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_columns_follow_kind() {
        let table = ResultTable::new(ResultKind::Image);
        assert_eq!(table.columns(), &["Title", "Image URL", "Source URL"]);
    }
}
