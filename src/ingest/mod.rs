// src/ingest/mod.rs
//! Upload decoding: bytes of a CSV/TXT/XLSX file → ordered text records.
//!
//! Errors here are user-facing: they abort the current batch only and are
//! reported as-is (HTTP 400 / CLI message).

pub mod decode;
pub mod delimited;
pub mod spreadsheet;

use thiserror::Error;
use tracing::info;

pub use decode::{decode_text, DecodedText};
pub use delimited::{parse_csv, parse_lines};
pub use spreadsheet::read_spreadsheet;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("could not decode the file: none of {tried} produced clean text")]
    UnsupportedEncoding { tried: String },
    #[error("the file must contain a 'text' column (found: {found})")]
    MissingTextColumn { found: String },
    #[error("unsupported file type '{0}', expected csv, txt or xlsx")]
    UnsupportedFileType(String),
    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(String),
    #[error("failed to parse delimited file: {0}")]
    Csv(#[from] csv::Error),
    #[error("no text to analyze")]
    EmptyInput,
    #[error("too many records: {count} (limit {max})")]
    TooManyRecords { count: usize, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Csv,
    Txt,
    Spreadsheet,
}

impl InputKind {
    /// Decide by file extension (case-insensitive).
    pub fn from_filename(name: &str) -> Result<Self, InputError> {
        let ext = std::path::Path::new(name)
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Ok(InputKind::Csv),
            "txt" => Ok(InputKind::Txt),
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(InputKind::Spreadsheet),
            _ => Err(InputError::UnsupportedFileType(name.to_string())),
        }
    }
}

/// Decode an uploaded file into text records, in file order.
pub fn read_upload(filename: &str, bytes: &[u8]) -> Result<Vec<String>, InputError> {
    let kind = InputKind::from_filename(filename)?;
    let records = match kind {
        InputKind::Spreadsheet => read_spreadsheet(bytes)?,
        InputKind::Txt => parse_lines(&decode_text(bytes)?.text),
        InputKind::Csv => {
            let decoded = decode_text(bytes)?;
            info!(encoding = decoded.encoding, "upload decoded");
            parse_csv(&decoded.text)?
        }
    };
    info!(file_kind = ?kind, records = records.len(), "upload parsed");
    Ok(records)
}
