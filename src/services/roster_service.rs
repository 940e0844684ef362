//! Domain service for bulk-loading pending students from a CSV roster.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RosterError {
    /// The upload is not parseable as CSV at all. Row-level problems never
    /// raise this; they land in the report instead.
    #[error("Error parsing CSV file: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for RosterError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Outcome of an import pass. Rows are independent: a bad row is reported
/// and skipped, everything before and after it still lands.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub added: u32,
    pub skipped: u32,
    pub errors: Vec<String>,
}

#[async_trait::async_trait]
pub trait RosterService: Send + Sync {
    /// Imports a roster CSV with headers
    /// name/email/usn/department/year/semester (any casing, surrounding
    /// whitespace ignored). Duplicates already present as a user or a
    /// pending roster entry are skipped silently; rows with missing or
    /// malformed fields are skipped with a per-row error.
    async fn import(&self, csv_bytes: &[u8]) -> Result<ImportReport, RosterError>;
}
