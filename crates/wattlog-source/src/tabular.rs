//! The seam between the sync engine and whatever serves the raw rows.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("source returned status {status} for range {range}")]
    Status { status: u16, range: String },
    #[error("source returned a malformed payload: {0}")]
    Malformed(String),
    #[error("table not available: {0}")]
    Unavailable(String),
}

/// A read-only tabular data provider keyed by an `A1`-style range.
///
/// Rows are raw text cells exactly as the source serves them; short rows are
/// allowed and missing trailing cells are the extraction layer's problem.
#[async_trait]
pub trait TabularSource: Send + Sync {
    async fn fetch_table(&self, range: &str) -> Result<Vec<Vec<String>>, SourceError>;
}
