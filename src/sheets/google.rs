//! Google Sheets Backend
//!
//! Sheet store over the Sheets v4 REST API. One worksheet per site inside
//! the single configured spreadsheet; labels and columns are written with
//! `valueInputOption=RAW` so counts stay numeric and percentage strings
//! stay strings.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{SheetStore, a1};
use crate::config::{GoogleConfig, StoreConfig};
use crate::constants::{grid, network};
use crate::reconcile::LabelInsertion;
use crate::types::{Cell, GridSnapshot, PulseError, Result};

const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Google Sheets client with secure token handling
pub struct GoogleSheetStore {
    /// Access token stored securely - never exposed in logs or debug output
    token: SecretString,
    api_base: String,
    spreadsheet_id: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GoogleSheetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetStore")
            .field("token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .finish()
    }
}

impl GoogleSheetStore {
    pub fn new(store: &StoreConfig, google: &GoogleConfig) -> Result<Self> {
        let token = google.resolve_token().ok_or_else(|| {
            PulseError::MissingCredentials(
                "Google access token not found. Set GOOGLE_ACCESS_TOKEN or google.access_token"
                    .to_string(),
            )
        })?;

        let api_base = store
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network::DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| PulseError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            token: SecretString::from(token),
            api_base,
            spreadsheet_id: store.spreadsheet_id.clone(),
            client,
        })
    }

    /// Build an API URL below the spreadsheet, percent-encoding each segment
    /// (worksheet titles can carry spaces and non-ASCII).
    fn url(&self, segments: &[&str]) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.api_base)
            .map_err(|e| PulseError::Config(format!("invalid Sheets api_base: {}", e)))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| PulseError::Config("Sheets api_base cannot be a base".to_string()))?;
            path.push(&self.spreadsheet_id);
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn send_json(
        &self,
        request: reqwest::RequestBuilder,
        sheet: &str,
        what: &str,
    ) -> Result<Value> {
        let response = request
            .header(
                "Authorization",
                format!("Bearer {}", self.token.expose_secret()),
            )
            .send()
            .await
            .map_err(|e| PulseError::store(sheet, format!("{} failed: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PulseError::store(
                sheet,
                format!("{}: Sheets API error ({}): {}", what, status, body),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| PulseError::store(sheet, format!("{}: bad response: {}", what, e)))
    }

    async fn sheet_titles(&self) -> Result<Vec<String>> {
        let mut url = self.url(&[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");

        let value = self
            .send_json(self.client.get(url), "<spreadsheet>", "metadata get")
            .await?;

        let metadata: SpreadsheetMetadata = serde_json::from_value(value)?;
        Ok(metadata
            .sheets
            .into_iter()
            .map(|s| s.properties.title)
            .collect())
    }

    async fn get_values(&self, sheet: &str, range: &str, by_columns: bool) -> Result<Vec<Value>> {
        let mut url = self.url(&["values", range])?;
        if by_columns {
            url.query_pairs_mut()
                .append_pair("majorDimension", "COLUMNS");
        }

        let value = self
            .send_json(self.client.get(url), sheet, "values get")
            .await?;

        let range: ValueRange = serde_json::from_value(value)?;
        Ok(range.values.into_iter().next().unwrap_or_default())
    }

    async fn put_values(
        &self,
        sheet: &str,
        range: &str,
        major_dimension: &str,
        values: Vec<Vec<Value>>,
    ) -> Result<()> {
        let mut url = self.url(&["values", range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW");

        let body = json!({
            "range": range,
            "majorDimension": major_dimension,
            "values": values,
        });

        self.send_json(self.client.put(url).json(&body), sheet, "values update")
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SheetStore for GoogleSheetStore {
    async fn snapshot(&self, sheet: &str) -> Result<Option<GridSnapshot>> {
        let titles = self.sheet_titles().await?;
        if !titles.iter().any(|t| t == sheet) {
            debug!(sheet, "worksheet does not exist yet");
            return Ok(None);
        }

        // Column A from row 2, as one column-major vector.
        let label_range = format!("{}!A{}:A", a1::quote_sheet(sheet), grid::FIRST_LABEL_ROW);
        let item_labels = self
            .get_values(sheet, &label_range, true)
            .await?
            .into_iter()
            .map(value_to_string)
            .collect();

        // Header row 1; the API trims trailing empty cells.
        let header_range = format!("{}!1:1", a1::quote_sheet(sheet));
        let header = self.get_values(sheet, &header_range, false).await?;

        Ok(Some(GridSnapshot {
            item_labels,
            // A freshly hand-created sheet can have an empty row 1; the
            // caption slot still counts so the first data column is B.
            header_len: header.len().max(1),
        }))
    }

    async fn create_sheet(&self, sheet: &str) -> Result<GridSnapshot> {
        info!(sheet, "creating worksheet");

        let url = format!("{}:batchUpdate", self.url(&[])?);
        let body = json!({
            "requests": [
                { "addSheet": { "properties": { "title": sheet } } }
            ]
        });
        self.send_json(self.client.post(url).json(&body), sheet, "addSheet")
            .await?;

        // Seed the caption cell so the first period column lands at B.
        self.put_values(
            sheet,
            &a1::cell_range(sheet, 1, 1),
            "ROWS",
            vec![vec![Value::String(grid::CAPTION.to_string())]],
        )
        .await?;

        Ok(GridSnapshot {
            item_labels: Vec::new(),
            header_len: 1,
        })
    }

    async fn write_labels(&self, sheet: &str, insertions: &[LabelInsertion]) -> Result<()> {
        if insertions.is_empty() {
            return Ok(());
        }

        let url = self.url(&["values:batchUpdate"])?;
        let data: Vec<Value> = insertions
            .iter()
            .map(|ins| {
                json!({
                    "range": a1::cell_range(sheet, 1, ins.grid_row()),
                    "values": [[ins.label]],
                })
            })
            .collect();
        let body = json!({
            "valueInputOption": "RAW",
            "data": data,
        });

        debug!(sheet, count = insertions.len(), "writing new item labels");
        self.send_json(self.client.post(url).json(&body), sheet, "label write")
            .await?;
        Ok(())
    }

    async fn write_column(&self, sheet: &str, column: usize, cells: &[Cell]) -> Result<()> {
        let range = a1::column_range(sheet, column, cells.len());
        let values = vec![cells.iter().map(cell_to_value).collect::<Vec<_>>()];

        debug!(sheet, column, rows = cells.len(), "writing period column");
        self.put_values(sheet, &range, "COLUMNS", values).await
    }

    async fn health_check(&self) -> Result<bool> {
        match self.sheet_titles().await {
            Ok(titles) => {
                info!(worksheets = titles.len(), "spreadsheet is reachable");
                Ok(true)
            }
            Err(e) => {
                warn!("spreadsheet check failed: {}", e);
                Ok(false)
            }
        }
    }
}

/// RAW-mode cell payload: counts stay numbers, everything else is a string.
fn cell_to_value(cell: &Cell) -> Value {
    match cell {
        Cell::Empty => Value::String(String::new()),
        Cell::Count(n) => json!(n),
        Cell::Percent(s) | Cell::Text(s) => Value::String(s.clone()),
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

// Response types

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SpreadsheetMetadata {
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(default)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ValueRange {
    values: Vec<Vec<Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_to_value_keeps_counts_numeric() {
        assert_eq!(cell_to_value(&Cell::Count(120)), json!(120));
        assert_eq!(
            cell_to_value(&Cell::Percent("54.3%".into())),
            json!("54.3%")
        );
        assert_eq!(cell_to_value(&Cell::Empty), json!(""));
    }

    #[test]
    fn test_metadata_parsing() {
        let json = r#"{"sheets":[{"properties":{"title":"Blog"}},{"properties":{"title":"Shop"}}]}"#;
        let metadata: SpreadsheetMetadata = serde_json::from_str(json).unwrap();
        let titles: Vec<_> = metadata.sheets.iter().map(|s| &s.properties.title).collect();
        assert_eq!(titles, ["Blog", "Shop"]);
    }

    #[test]
    fn test_value_range_tolerates_missing_values() {
        let range: ValueRange = serde_json::from_str("{}").unwrap();
        assert!(range.values.is_empty());
    }
}
