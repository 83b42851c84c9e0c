//! XLSX workbook: a `Results` sheet and a `Tone` sheet.

use rust_xlsxwriter::{Format, Workbook};

use super::{ExportError, TableLayout};
use crate::batch::ClassificationResult;
use crate::tone::ToneBucket;

pub const RESULTS_SHEET: &str = "Results";
pub const TONE_SHEET: &str = "Tone";

pub fn to_xlsx(
    results: &[ClassificationResult],
    summary: &[ToneBucket],
    layout: TableLayout,
) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(RESULTS_SHEET)?;
    for (col, name) in layout.headers().iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    for (i, r) in results.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, value) in layout.row(r).into_iter().enumerate() {
            let col = col as u16;
            // id and confidence stay numeric for sorting/filtering
            match col {
                0 => sheet.write_number(row, col, r.id as f64)?,
                4 => sheet.write_number(row, col, f64::from(r.confidence))?,
                _ => sheet.write_string(row, col, value)?,
            };
        }
    }
    sheet.set_column_width(1, 60.0)?;
    sheet.set_column_width(2, 24.0)?;

    let sheet = workbook.add_worksheet();
    sheet.set_name(TONE_SHEET)?;
    for (col, name) in ["tone", "count", "percent"].iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    for (i, b) in summary.iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, b.tone.as_str())?;
        sheet.write_number(row, 1, b.count as f64)?;
        sheet.write_number(row, 2, b.percent)?;
    }

    Ok(workbook.save_to_buffer()?)
}
