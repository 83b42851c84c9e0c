//! Spreadsheet records: first worksheet, first column, non-empty string cells.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use super::InputError;

pub fn read_spreadsheet(bytes: &[u8]) -> Result<Vec<String>, InputError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| InputError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| InputError::Spreadsheet("workbook has no worksheets".to_string()))?
        .map_err(|e| InputError::Spreadsheet(e.to_string()))?;

    let mut out: Vec<String> = range
        .rows()
        .filter_map(|row| match row.first() {
            Some(Data::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        })
        .collect();

    if out.first().is_some_and(|h| h.trim().eq_ignore_ascii_case("text")) {
        out.remove(0);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn sheet(cells: &[(u32, &str)], numbers: &[(u32, f64)]) -> Vec<u8> {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        for (row, s) in cells {
            ws.write_string(*row, 0, *s).unwrap();
        }
        for (row, n) in numbers {
            ws.write_number(*row, 0, *n).unwrap();
        }
        ws.write_string(0, 1, "ignored column").unwrap();
        wb.save_to_buffer().unwrap()
    }

    #[test]
    fn reads_first_column_strings_and_skips_header() {
        let bytes = sheet(
            &[(0, "text"), (1, "надоела эта парковка"), (3, "   "), (4, "идея")],
            &[(2, 42.0)],
        );
        let out = read_spreadsheet(&bytes).unwrap();
        assert_eq!(out, vec!["надоела эта парковка", "идея"]);
    }

    #[test]
    fn garbage_bytes_are_an_input_error() {
        assert!(matches!(
            read_spreadsheet(b"definitely not a zip"),
            Err(InputError::Spreadsheet(_))
        ));
    }
}
