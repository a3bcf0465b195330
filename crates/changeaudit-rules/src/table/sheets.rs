//! Hosted spreadsheet table over the Sheets values API

use super::TableBackend;
use crate::config::RuleStoreConfig;
use async_trait::async_trait;
use changeaudit_core::{Error, Result};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Spreadsheet table where each worksheet holds rules in column A
pub struct SheetsTable {
    client: Client,
    base: Url,
    spreadsheet_id: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRangeUpdate<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: Vec<[&'a str; 1]>,
}

impl SheetsTable {
    /// Create a table talking to `base_url` (for example `https://sheets.googleapis.com/v4`)
    pub fn new(
        client: Client,
        base_url: &str,
        spreadsheet_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::config(format!("invalid rules.sheets_url '{}': {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::config(format!(
                "rules.sheets_url '{}' cannot be used as a base URL",
                base_url
            )));
        }
        Ok(Self {
            client,
            base,
            spreadsheet_id: spreadsheet_id.into(),
            token: token.into(),
        })
    }

    /// Create a table from the rule store configuration
    pub fn from_config(config: &RuleStoreConfig) -> Result<Self> {
        let spreadsheet_id = config
            .spreadsheet_id
            .clone()
            .ok_or_else(|| Error::config("sheets rule store requires rules.spreadsheet_id"))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;
        Self::new(client, &config.sheets_url, spreadsheet_id, config.token()?)
    }

    fn column_range(worksheet: &str) -> String {
        format!("{}!A:A", worksheet)
    }

    fn values_url(&self, last_segment: &str) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::internal("sheets base URL lost its path"))?
            .pop_if_empty()
            .extend(["spreadsheets", self.spreadsheet_id.as_str(), "values", last_segment]);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, action: &str) -> Result<reqwest::Response> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::store_unavailable(format!("sheets {} failed: {}", action, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::store_unavailable(format!(
            "sheets {} returned {}: {}",
            action, status, body
        )))
    }
}

#[async_trait]
impl TableBackend for SheetsTable {
    async fn read(&self, worksheet: &str) -> Result<Option<Vec<String>>> {
        let url = self.values_url(&Self::column_range(worksheet))?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::store_unavailable(format!("sheets read failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            // The API reports a missing worksheet as an unparseable range
            if body.contains("Unable to parse range") {
                debug!(worksheet, "Worksheet does not exist");
                return Ok(None);
            }
            return Err(Error::store_unavailable(format!(
                "sheets read returned {}: {}",
                status, body
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::store_unavailable(format!(
                "sheets read returned {}: {}",
                status, body
            )));
        }

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| Error::store_unavailable(format!("malformed sheets reply: {}", e)))?;

        let rows = range
            .values
            .into_iter()
            .map(|row| match row.into_iter().next() {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect();
        Ok(Some(rows))
    }

    async fn write(&self, worksheet: &str, rows: &[String]) -> Result<()> {
        let range = Self::column_range(worksheet);

        // Overwrite first so a failed update leaves the previous column intact
        let mut update_url = self.values_url(&range)?;
        update_url
            .query_pairs_mut()
            .append_pair("valueInputOption", "RAW");
        let body = ValueRangeUpdate {
            range: &range,
            major_dimension: "ROWS",
            values: rows.iter().map(|row| [row.as_str()]).collect(),
        };
        self.send(self.client.put(update_url).json(&body), "update")
            .await?;

        let tail = format!("{}!A{}:A", worksheet, rows.len() + 1);
        let clear_url = self.values_url(&format!("{}:clear", tail))?;
        self.send(self.client.post(clear_url).json(&serde_json::json!({})), "clear")
            .await?;

        debug!(worksheet, rows = rows.len(), "Replaced worksheet column");
        Ok(())
    }

    fn name(&self) -> &str {
        "sheets"
    }
}
