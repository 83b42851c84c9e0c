// src/export/mod.rs
//! Downloadable result tables: CSV (UTF-8 with BOM) and XLSX.

pub mod csv;
pub mod excel;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::batch::ClassificationResult;
use crate::config::TriggerConfig;

pub use self::csv::to_csv;
pub use self::excel::to_xlsx;

pub const CSV_FILE_NAME: &str = "smart_triggers_result.csv";
pub const XLSX_FILE_NAME: &str = "smart_triggers_result.xlsx";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("I/O error during export: {0}")]
    Io(#[from] std::io::Error),
    #[error("Excel export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Comma,
    Semicolon,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
        }
    }
}

impl FromStr for Delimiter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "," | "comma" => Ok(Delimiter::Comma),
            ";" | "semicolon" => Ok(Delimiter::Semicolon),
            other => Err(format!("unsupported delimiter '{other}' (use ',' or ';')")),
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Delimiter::Comma => "comma",
            Delimiter::Semicolon => "semicolon",
        })
    }
}

/// Optional columns follow the configuration: `tone` with a tone map,
/// `final_label` with a confidence threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLayout {
    pub tone: bool,
    pub final_label: bool,
}

impl TableLayout {
    pub fn for_config(config: &TriggerConfig) -> Self {
        Self {
            tone: config.tone_map().is_some(),
            final_label: config.policy().has_threshold(),
        }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        let mut h = vec!["id", "text", "triggers", "label", "confidence"];
        if self.tone {
            h.push("tone");
        }
        if self.final_label {
            h.push("final_label");
        }
        h
    }

    pub fn row(&self, r: &ClassificationResult) -> Vec<String> {
        let mut row = vec![
            r.id.to_string(),
            r.text.clone(),
            r.triggers.join(", "),
            r.label.clone(),
            format!("{:.2}", r.confidence),
        ];
        if self.tone {
            row.push(r.tone.map(|t| t.as_str().to_string()).unwrap_or_default());
        }
        if self.final_label {
            row.push(r.final_label.clone());
        }
        row
    }
}
