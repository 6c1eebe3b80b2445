//! Common types shared by the ingest pipeline and the lookup server
//!
//! The dataset produced by the pipeline is a pipe-delimited text file whose
//! rows map onto the store by **position**, never by header name. That
//! contract lives in [`StoreField`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RucError;

/// Field delimiter used by the flat files, the unified dataset and the
/// quarantine file.
pub const FIELD_DELIMITER: char = '|';

/// Header line of the quarantine file.
pub const QUARANTINE_HEADER: &str = "numero_linea|contenido_linea|motivo_error";

/// Marker of a known upstream data-quality issue in malformed rows.
pub const CANCELLED_MARKER: &str = "CANCELADO";

/// The five store columns, in dataset position order.
///
/// The discriminant is the 0-based column position in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreField {
    Ruc = 0,
    RazonSocial = 1,
    Dv = 2,
    RucAnterior = 3,
    Estado = 4,
}

impl StoreField {
    /// All fields in position order.
    pub const ALL: [StoreField; 5] = [
        StoreField::Ruc,
        StoreField::RazonSocial,
        StoreField::Dv,
        StoreField::RucAnterior,
        StoreField::Estado,
    ];

    /// 0-based column position in the dataset
    pub fn position(self) -> usize {
        self as usize
    }

    /// Column name in the store table
    pub fn column(self) -> &'static str {
        match self {
            StoreField::Ruc => "ruc",
            StoreField::RazonSocial => "razon_social",
            StoreField::Dv => "dv",
            StoreField::RucAnterior => "ruc_anterior",
            StoreField::Estado => "estado",
        }
    }

    /// Header used when no flat file provides one.
    pub fn fallback_header() -> Vec<String> {
        Self::ALL.iter().map(|f| f.column().to_string()).collect()
    }
}

impl fmt::Display for StoreField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for StoreField {
    type Err = RucError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.column().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RucError::Parse(format!("Unknown store field: {}", s)))
    }
}

/// One row of a flat file or of the unified dataset: trimmed fields in order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FlatRecord(Vec<String>);

impl FlatRecord {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    /// Split a raw line on the delimiter, trimming each field.
    pub fn parse(line: &str) -> Self {
        Self(
            line.trim()
                .split(FIELD_DELIMITER)
                .map(|field| field.trim().to_string())
                .collect(),
        )
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field at `field`'s position, or `""` when the row is too short.
    pub fn get(&self, field: StoreField) -> &str {
        self.0
            .get(field.position())
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Render back to a delimited line (without trailing newline).
    pub fn to_line(&self) -> String {
        self.0.join(&FIELD_DELIMITER.to_string())
    }
}

/// Number of delimited columns in a raw line.
pub fn column_count(line: &str) -> usize {
    line.split(FIELD_DELIMITER).count()
}

/// A store row without its surrogate id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StoreRow {
    pub ruc: String,
    pub razon_social: String,
    pub dv: String,
    pub ruc_anterior: String,
    pub estado: String,
}

impl StoreRow {
    /// Map a dataset record onto the store by position.
    ///
    /// Missing trailing fields become empty strings, extra fields are ignored.
    pub fn from_record(record: &FlatRecord) -> Self {
        Self {
            ruc: record.get(StoreField::Ruc).to_string(),
            razon_social: record.get(StoreField::RazonSocial).to_string(),
            dv: record.get(StoreField::Dv).to_string(),
            ruc_anterior: record.get(StoreField::RucAnterior).to_string(),
            estado: record.get(StoreField::Estado).to_string(),
        }
    }

    pub fn get(&self, field: StoreField) -> &str {
        match field {
            StoreField::Ruc => &self.ruc,
            StoreField::RazonSocial => &self.razon_social,
            StoreField::Dv => &self.dv,
            StoreField::RucAnterior => &self.ruc_anterior,
            StoreField::Estado => &self.estado,
        }
    }
}

/// A dataset line rejected by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// 1-based line number in the dataset (header is line 1)
    pub line_number: usize,
    /// The line as it appeared in the dataset
    pub raw_line: String,
    pub reason: String,
}

impl ErrorRecord {
    /// Build the record for a column-count mismatch.
    pub fn column_mismatch(line_number: usize, raw_line: &str, found: usize, expected: usize) -> Self {
        let mut reason = format!("Tiene {} columna(s) pero se esperaban {}", found, expected);
        if raw_line.to_uppercase().contains(CANCELLED_MARKER) {
            reason.push_str(" (contiene CANCELADO)");
        }

        Self {
            line_number,
            raw_line: raw_line.to_string(),
            reason,
        }
    }

    /// Quarantine file line, with delimiters inside the raw line escaped.
    pub fn to_quarantine_line(&self) -> String {
        format!(
            "{}|{}|{}",
            self.line_number,
            self.raw_line.replace(FIELD_DELIMITER, "\\|"),
            self.reason
        )
    }
}
