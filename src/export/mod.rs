//! Export of result tables to downloadable files
//!
//! Two formats are offered: CSV (UTF-8 with a byte order mark so that
//! spreadsheet programs pick the right encoding) and a single-sheet Excel
//! workbook. Both keep the table's column order and use the column display
//! names as header row.

mod delimited;
mod spreadsheet;

pub use delimited::{read_csv, write_csv, UTF8_BOM};
pub use spreadsheet::write_xlsx;

use crate::error::{Result, SearchError};
use crate::query::ResultKind;
use crate::results::ResultTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported download formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    /// Formats offered for download, default first
    pub fn all() -> &'static [ExportFormat] {
        &[Self::Xlsx, Self::Csv]
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    /// Label shown on the download button
    pub fn label(&self) -> &'static str {
        match self {
            Self::Csv => "CSV",
            Self::Xlsx => "Excel",
        }
    }

    /// `{keyword}_{result_type}_results.{ext}` with path-unsafe characters replaced
    pub fn file_name(&self, keyword: &str, kind: ResultKind) -> String {
        let keyword: String = keyword
            .trim()
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();

        format!("{}_{}_results.{}", keyword, kind, self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            _ => Err(SearchError::invalid("export format", s)),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Serialize `table` in the requested format
pub fn export(table: &ResultTable, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => write_csv(table),
        ExportFormat::Xlsx => write_xlsx(table),
    }
}

/// A serialized table ready to be downloaded
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name() {
        assert_eq!(
            ExportFormat::Csv.file_name("東京", ResultKind::Text),
            "東京_text_results.csv"
        );
        assert_eq!(
            ExportFormat::Xlsx.file_name("a/b:c", ResultKind::Image),
            "a_b_c_image_results.xlsx"
        );
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("Excel".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
