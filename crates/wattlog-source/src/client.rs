//! HTTP client for the spreadsheet values API.

use crate::tabular::{SourceError, TabularSource};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use wattlog_config::SourceConfig;

/// Values-API response body. Ranges with no data omit `values` entirely.
#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Client for the read-only spreadsheet values endpoint.
///
/// Every request carries the configured bearer credentials and is bounded by
/// the configured timeout; there are no retries here — the scheduler retries
/// by re-triggering the whole cycle.
#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    api_token: Option<String>,
}

impl SheetsClient {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            api_token: config.api_token.clone(),
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, range
        )
    }
}

#[async_trait]
impl TabularSource for SheetsClient {
    async fn fetch_table(&self, range: &str) -> Result<Vec<Vec<String>>, SourceError> {
        let mut request = self.http.get(self.values_url(range));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                range: range.to_string(),
            });
        }

        let payload: ValuesResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        Ok(payload
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }
}

/// Cells arrive as JSON strings, numbers or booleans depending on the
/// column's sheet formatting; normalize them all to text.
fn cell_to_string(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SheetsClient {
        let config = SourceConfig {
            base_url: "https://sheets.example.com/".to_string(),
            spreadsheet_id: "SHEET123".to_string(),
            api_token: Some("tok".to_string()),
            fetch_limit: 100,
            timeout_secs: 5,
        };
        SheetsClient::new(&config).unwrap()
    }

    #[test]
    fn values_url_strips_trailing_slash() {
        assert_eq!(
            client().values_url("Log!A:I"),
            "https://sheets.example.com/v4/spreadsheets/SHEET123/values/Log!A:I"
        );
    }

    #[test]
    fn cells_normalize_to_text() {
        assert_eq!(cell_to_string(serde_json::json!("AB12")), "AB12");
        assert_eq!(cell_to_string(serde_json::json!(230.1)), "230.1");
        assert_eq!(cell_to_string(serde_json::json!(7)), "7");
        assert_eq!(cell_to_string(serde_json::Value::Null), "");
    }
}
