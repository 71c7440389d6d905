//! Search orchestration module
//!
//! The operations offered to the presentation layer: build a query, run it,
//! filter the stored results and export them.

mod executor;

pub use crate::query::build_query;
pub use executor::Search;

use crate::error::Result;
use crate::export::{ExportFormat, ExportedFile};
use crate::filter::FilterSpec;
use crate::results::ResultTable;
use crate::session::Session;

/// Filter the session's stored table
pub fn apply_filter(session: &mut Session, spec: FilterSpec) -> Result<&ResultTable> {
    session.apply_filter(spec)
}

/// Export the session's current table
pub fn export_results(session: &mut Session, format: ExportFormat) -> Result<ExportedFile> {
    session.export(format)
}
