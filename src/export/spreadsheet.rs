//! Excel workbook export

use crate::error::Result;
use crate::results::ResultTable;
use rust_xlsxwriter::Workbook;

/// Write `table` as a workbook with one sheet named after the result type
pub fn write_xlsx(table: &ResultTable) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(table.kind().as_str())?;

    for (col, name) in table.columns().iter().enumerate() {
        worksheet.write_string(0, col as u16, *name)?;
    }

    for (index, row) in table.rows().enumerate() {
        let row_num = index as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let text = cell.as_export_text();
            // Blank cells stay unwritten
            if !text.is_empty() {
                worksheet.write_string(row_num, col as u16, text)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}
