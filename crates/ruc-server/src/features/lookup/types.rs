use serde::{Deserialize, Serialize};

/// Row as stored by `ruc-ingest`. Every column is nullable text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RucRow {
    pub ruc: Option<String>,
    pub razon_social: Option<String>,
    pub dv: Option<String>,
    pub estado: Option<String>,
}

/// A taxpayer as returned by the lookup API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRecord {
    /// `{ruc}-{dv}` when a check digit is present, otherwise the bare key
    pub ruc: String,
    pub razon_social: String,
    pub estado: String,
}

impl From<RucRow> for LookupRecord {
    fn from(row: RucRow) -> Self {
        let ruc = row.ruc.unwrap_or_default();
        let dv = row.dv.as_deref().map(str::trim).unwrap_or_default();

        let ruc = if dv.is_empty() {
            ruc
        } else {
            format!("{}-{}", ruc, dv)
        };

        Self {
            ruc,
            razon_social: row.razon_social.as_deref().map(str::trim).unwrap_or_default().to_string(),
            estado: row.estado.as_deref().map(str::trim).unwrap_or_default().to_string(),
        }
    }
}

pub(crate) const SELECT_COLUMNS: &str = "SELECT ruc, razon_social, dv, estado FROM ruc";
