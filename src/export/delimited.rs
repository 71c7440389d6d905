//! CSV export and re-import

use crate::error::{Result, SearchError};
use crate::query::ResultKind;
use crate::results::{columns, ResultRecord, ResultTable};

/// Byte order mark prepended to CSV exports
pub const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Write `table` as BOM-prefixed UTF-8 CSV
pub fn write_csv(table: &ResultTable) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(UTF8_BOM.to_vec());

    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|cell| cell.as_export_text()))?;
    }

    writer
        .into_inner()
        .map_err(|e| SearchError::Export(e.to_string()))
}

/// Read a CSV produced by [`write_csv`] back into a table
pub fn read_csv(kind: ResultKind, bytes: &[u8]) -> Result<ResultTable> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let import = |e: csv::Error| SearchError::Import(e.to_string());

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader.headers().map_err(import)?;
    if !headers.iter().eq(columns(kind).iter().copied()) {
        return Err(SearchError::Import(format!(
            "header {:?} does not match {} columns {:?}",
            headers.iter().collect::<Vec<_>>(),
            kind,
            columns(kind)
        )));
    }

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.map_err(import)?;
        let cells: Vec<String> = row.iter().map(str::to_string).collect();
        let record = ResultRecord::from_row(kind, &cells)
            .map_err(|e| SearchError::Import(format!("row {}: {}", line + 1, e)))?;
        records.push(record);
    }

    ResultTable::from_records(kind, records)
}
