//! In-memory tabular source for tests and dry runs.

use crate::tabular::{SourceError, TabularSource};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// A [`TabularSource`] backed by fixed rows per range.
///
/// Unknown ranges and ranges registered with [`with_failure`] report
/// [`SourceError::Unavailable`], which exercises the same swallow-and-log
/// path as a network failure.
///
/// [`with_failure`]: MemorySource::with_failure
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<String, Vec<Vec<String>>>,
    failures: HashSet<String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, range: &str, rows: Vec<Vec<String>>) -> Self {
        self.tables.insert(range.to_string(), rows);
        self
    }

    pub fn with_failure(mut self, range: &str) -> Self {
        self.failures.insert(range.to_string());
        self
    }

    /// Replace a table in place (for multi-tick test scenarios).
    pub fn set_table(&mut self, range: &str, rows: Vec<Vec<String>>) {
        self.tables.insert(range.to_string(), rows);
    }
}

#[async_trait]
impl TabularSource for MemorySource {
    async fn fetch_table(&self, range: &str) -> Result<Vec<Vec<String>>, SourceError> {
        if self.failures.contains(range) {
            return Err(SourceError::Unavailable(range.to_string()));
        }
        self.tables
            .get(range)
            .cloned()
            .ok_or_else(|| SourceError::Unavailable(range.to_string()))
    }
}
