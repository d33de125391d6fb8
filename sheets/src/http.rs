//! # Spreadsheet REST Client
//!
//! [`SheetsService`] over the Sheets v4 REST API.
//!
//! Credential loading is not handled here: callers supply an
//! [`AccessTokenProvider`] (or a static token in [`ServiceConfig`]).

use crate::service::SheetsService;
use crate::types::{Dimension, SheetProperties, SpreadsheetMeta, ValueInputOption, ValueRange};
use async_trait::async_trait;
use config::ServiceConfig;
use errors::{RemoteError, RemoteResult};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> RemoteResult<Option<String>>;
}

/// Fixed bearer token, or no authentication at all (local emulators).
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token)
    }
}

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> RemoteResult<Option<String>> {
        Ok(self.0.clone())
    }
}

pub struct HttpSheetsClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn AccessTokenProvider>
}

impl HttpSheetsClient {
    pub fn new(config: &ServiceConfig, tokens: Arc<dyn AccessTokenProvider>) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(transport_error)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens
        })
    }

    pub fn from_config(config: &ServiceConfig) -> RemoteResult<Self> {
        Self::new(
            config,
            Arc::new(StaticToken::new(config.access_token.clone()))
        )
    }

    fn spreadsheet_url(&self, spreadsheet_id: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}",
            self.base_url,
            urlencoding::encode(spreadsheet_id)
        )
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(spreadsheet_id),
            urlencoding::encode(range)
        )
    }

    async fn send(&self, request: RequestBuilder) -> RemoteResult<Response> {
        let request = match self.tokens.access_token().await? {
            Some(token) => request.bearer_auth(token),
            None => request
        };

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        let (status_name, message) = parse_error_body(&body);

        Err(RemoteError::Status {
            code: status.as_u16(),
            status: status_name,
            message,
            retry_after
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> RemoteResult<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::decode(e.to_string()))
    }

    async fn structural(&self, spreadsheet_id: &str, request: Value) -> RemoteResult<BatchUpdateReply> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url(spreadsheet_id));
        debug!(url = %url, "Sending structural update");
        self.send_json(
            self.client
                .post(&url)
                .json(&json!({ "requests": [request] }))
        )
        .await
    }
}

#[async_trait]
impl SheetsService for HttpSheetsClient {
    async fn get_spreadsheet(&self, spreadsheet_id: &str) -> RemoteResult<SpreadsheetMeta> {
        let url = format!(
            "{}?fields={}",
            self.spreadsheet_url(spreadsheet_id),
            urlencoding::encode("spreadsheetId,properties.title,sheets.properties")
        );
        debug!(url = %url, "Fetching spreadsheet metadata");

        let wire: WireSpreadsheet = self.send_json(self.client.get(&url)).await?;
        Ok(SpreadsheetMeta {
            spreadsheet_id: wire.spreadsheet_id,
            title: wire.properties.map(|p| p.title).unwrap_or_default(),
            sheets: wire
                .sheets
                .into_iter()
                .map(|s| s.properties.into())
                .collect()
        })
    }

    async fn get_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        major: Dimension
    ) -> RemoteResult<ValueRange> {
        let url = format!(
            "{}?majorDimension={}&valueRenderOption=FORMATTED_VALUE",
            self.values_url(spreadsheet_id, range),
            major.as_str()
        );
        debug!(url = %url, "Reading values");

        let wire: WireValueRange = self.send_json(self.client.get(&url)).await?;
        Ok(wire.into_value_range(major))
    }

    async fn batch_get_values(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
        major: Dimension
    ) -> RemoteResult<Vec<ValueRange>> {
        let mut url = format!(
            "{}/values:batchGet?majorDimension={}&valueRenderOption=FORMATTED_VALUE",
            self.spreadsheet_url(spreadsheet_id),
            major.as_str()
        );
        for range in ranges {
            url.push_str("&ranges=");
            url.push_str(&urlencoding::encode(range));
        }
        debug!(url = %url, "Batch reading values");

        let wire: WireBatchGet = self.send_json(self.client.get(&url)).await?;
        Ok(wire
            .value_ranges
            .into_iter()
            .map(|r| r.into_value_range(major))
            .collect())
    }

    async fn update_values(
        &self,
        spreadsheet_id: &str,
        data: ValueRange,
        input: ValueInputOption
    ) -> RemoteResult<()> {
        let url = format!(
            "{}?valueInputOption={}",
            self.values_url(spreadsheet_id, &data.range),
            input.as_str()
        );
        debug!(url = %url, "Updating values");

        self.send(self.client.put(&url).json(&data)).await?;
        Ok(())
    }

    async fn batch_update_values(
        &self,
        spreadsheet_id: &str,
        data: Vec<ValueRange>,
        input: ValueInputOption
    ) -> RemoteResult<()> {
        let url = format!(
            "{}/values:batchUpdate",
            self.spreadsheet_url(spreadsheet_id)
        );
        debug!(url = %url, ranges = data.len(), "Batch updating values");

        self.send(self.client.post(&url).json(&json!({
            "valueInputOption": input,
            "data": data
        })))
        .await?;
        Ok(())
    }

    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Vec<Vec<String>>,
        input: ValueInputOption
    ) -> RemoteResult<()> {
        let url = format!(
            "{}:append?valueInputOption={}&insertDataOption=INSERT_ROWS",
            self.values_url(spreadsheet_id, range),
            input.as_str()
        );
        debug!(url = %url, rows = rows.len(), "Appending values");

        self.send(self.client.post(&url).json(&json!({
            "majorDimension": Dimension::Rows,
            "values": rows
        })))
        .await?;
        Ok(())
    }

    async fn clear_values(&self, spreadsheet_id: &str, range: &str) -> RemoteResult<()> {
        let url = format!("{}:clear", self.values_url(spreadsheet_id, range));
        debug!(url = %url, "Clearing values");

        self.send(self.client.post(&url).json(&json!({}))).await?;
        Ok(())
    }

    async fn add_sheet(&self, spreadsheet_id: &str, title: &str) -> RemoteResult<SheetProperties> {
        let reply = self
            .structural(
                spreadsheet_id,
                json!({ "addSheet": { "properties": { "title": title } } })
            )
            .await?;

        reply
            .replies
            .into_iter()
            .find_map(|r| r.add_sheet)
            .map(|added| added.properties.into())
            .ok_or_else(|| RemoteError::decode("addSheet reply carried no sheet properties"))
    }

    async fn delete_dimension(
        &self,
        spreadsheet_id: &str,
        sheet_id: i64,
        dimension: Dimension,
        start: usize,
        end: usize
    ) -> RemoteResult<()> {
        self.structural(
            spreadsheet_id,
            json!({
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": dimension,
                        "startIndex": start,
                        "endIndex": end
                    }
                }
            })
        )
        .await?;
        Ok(())
    }

    async fn append_dimension(
        &self,
        spreadsheet_id: &str,
        sheet_id: i64,
        dimension: Dimension,
        length: usize
    ) -> RemoteResult<()> {
        self.structural(
            spreadsheet_id,
            json!({
                "appendDimension": {
                    "sheetId": sheet_id,
                    "dimension": dimension,
                    "length": length
                }
            })
        )
        .await?;
        Ok(())
    }
}

fn transport_error(err: reqwest::Error) -> RemoteError {
    if err.is_decode() {
        return RemoteError::decode(err.to_string());
    }
    let code = if err.is_timeout() {
        "ETIMEDOUT"
    } else if err.is_connect() {
        "ECONNREFUSED"
    } else if err.is_builder() {
        "EINVAL"
    } else if err.is_request() || err.is_body() {
        "ECONNRESET"
    } else {
        "EUNKNOWN"
    };
    RemoteError::transport(code, err.to_string())
}

/// Extracts `(status, message)` from the service's JSON error envelope,
/// falling back to the raw body.
fn parse_error_body(body: &str) -> (String, String) {
    match serde_json::from_str::<WireErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.status, envelope.error.message),
        Err(_) => (String::new(), body.trim().to_string())
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct WireErrorEnvelope {
    error: WireError
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireValueRange {
    #[serde(default)]
    range: String,
    #[serde(default)]
    major_dimension: Option<Dimension>,
    #[serde(default)]
    values: Vec<Vec<Value>>
}

impl WireValueRange {
    fn into_value_range(self, requested: Dimension) -> ValueRange {
        ValueRange {
            range: self.range,
            major_dimension: self.major_dimension.unwrap_or(requested),
            values: self
                .values
                .into_iter()
                .map(|line| line.into_iter().map(cell_text).collect())
                .collect()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBatchGet {
    #[serde(default)]
    value_ranges: Vec<WireValueRange>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSpreadsheet {
    #[serde(default)]
    spreadsheet_id: String,
    #[serde(default)]
    properties: Option<WireSpreadsheetProperties>,
    #[serde(default)]
    sheets: Vec<WireSheet>
}

#[derive(Debug, Deserialize)]
struct WireSpreadsheetProperties {
    #[serde(default)]
    title: String
}

#[derive(Debug, Deserialize)]
struct WireSheet {
    properties: WireSheetProperties
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSheetProperties {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    index: usize,
    #[serde(default)]
    grid_properties: WireGridProperties
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGridProperties {
    #[serde(default)]
    row_count: usize,
    #[serde(default)]
    column_count: usize
}

impl From<WireSheetProperties> for SheetProperties {
    fn from(wire: WireSheetProperties) -> Self {
        SheetProperties {
            sheet_id: wire.sheet_id,
            title: wire.title,
            index: wire.index,
            row_count: wire.grid_properties.row_count,
            column_count: wire.grid_properties.column_count
        }
    }
}

#[derive(Debug, Deserialize)]
struct BatchUpdateReply {
    #[serde(default)]
    replies: Vec<WireReply>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReply {
    #[serde(default)]
    add_sheet: Option<WireAddSheet>
}

#[derive(Debug, Deserialize)]
struct WireAddSheet {
    properties: WireSheetProperties
}
