use super::{Delimiter, ExportError, TableLayout};
use crate::batch::ClassificationResult;

/// UTF-8 byte-order mark so spreadsheet tools pick the right encoding.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn to_csv(
    results: &[ClassificationResult],
    layout: TableLayout,
    delimiter: Delimiter,
) -> Result<Vec<u8>, ExportError> {
    let mut buf = Vec::with_capacity(64 + results.len() * 64);
    buf.extend_from_slice(UTF8_BOM);

    let mut w = ::csv::WriterBuilder::new()
        .delimiter(delimiter.as_byte())
        .from_writer(buf);
    w.write_record(layout.headers())?;
    for r in results {
        w.write_record(layout.row(r))?;
    }
    let buf = w.into_inner().map_err(|e| e.into_error())?;
    Ok(buf)
}
