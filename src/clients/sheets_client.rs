/// Google Sheets v4 REST 客户端
///
/// 只封装用到的四个调用：读标签页、读值、写值、batchUpdate
use crate::config::Config;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SheetsClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("sheets api returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// 标签页属性
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetTab {
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub index: i64,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetBody {
    #[serde(default)]
    sheets: Vec<SheetBody>,
}

#[derive(Debug, Deserialize)]
struct SheetBody {
    properties: SheetTab,
}

#[derive(Debug, Deserialize)]
struct ValueRangeBody {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Sheets 客户端
#[derive(Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    access_token: String,
}

impl SheetsClient {
    /// 创建新的 Sheets 客户端
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.sheets_request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.sheets_api_base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.sheets_spreadsheet_id.clone(),
            access_token: config.sheets_access_token.clone(),
        })
    }

    /// 列出所有标签页，按表格中的顺序
    pub async fn sheet_tabs(&self) -> Result<Vec<SheetTab>, SheetsClientError> {
        let mut url = self.spreadsheet_url(&[])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties(sheetId,title,index)");

        let body: SpreadsheetBody = self.send(self.http.get(url)).await?.json().await?;
        let mut tabs: Vec<SheetTab> = body.sheets.into_iter().map(|s| s.properties).collect();
        tabs.sort_by_key(|t| t.index);
        Ok(tabs)
    }

    /// 读取标签页的表头行
    pub async fn header_row(&self, tab: &str) -> Result<Vec<String>, SheetsClientError> {
        let range = format!("{}!1:1", quote_tab(tab));
        let url = self.spreadsheet_url(&["values", &range])?;

        let body: ValueRangeBody = self.send(self.http.get(url)).await?.json().await?;
        let headers = body
            .values
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
        Ok(headers)
    }

    /// 按行写入一块区域（RAW 模式）
    pub async fn write_values(
        &self,
        range: &str,
        rows: Vec<Vec<Value>>,
    ) -> Result<(), SheetsClientError> {
        debug!("写入区域: {}", range);
        let mut url = self.spreadsheet_url(&["values", range])?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");

        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": rows,
        });
        self.send(self.http.put(url).json(&body)).await?;
        Ok(())
    }

    /// 提交 batchUpdate 请求（格式化等）
    pub async fn batch_update(&self, requests: Vec<Value>) -> Result<(), SheetsClientError> {
        let segment = format!("{}:batchUpdate", self.spreadsheet_id);
        let url = self.url_with_segments(&["spreadsheets", &segment])?;
        let body = json!({ "requests": requests });
        self.send(self.http.post(url).json(&body)).await?;
        Ok(())
    }

    fn spreadsheet_url(&self, extra: &[&str]) -> Result<Url, SheetsClientError> {
        let mut segments = vec!["spreadsheets", self.spreadsheet_id.as_str()];
        segments.extend_from_slice(extra);
        self.url_with_segments(&segments)
    }

    fn url_with_segments(&self, segments: &[&str]) -> Result<Url, SheetsClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| SheetsClientError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| SheetsClientError::InvalidUrl(self.base_url.clone()))?
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, SheetsClientError> {
        let request = if self.access_token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.access_token)
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsClientError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

/// A1 表示法中的标签页名需要加单引号，内部单引号要成对
pub fn quote_tab(tab: &str) -> String {
    format!("'{}'", tab.replace('\'', "''"))
}
