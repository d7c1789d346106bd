/// Google Sheets API 客户端
///
/// 封装所有与表格服务相关的 HTTP 调用，只提供"读取整张表"和"写一个单元格"两种能力
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::SheetsConfig;
use crate::error::{ConfigError, SheetError};

/// 单元格坐标（都从 0 开始）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub column: usize,
}

impl CellRef {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// A1 表示法，例如 `F3`
    pub fn a1(&self) -> String {
        format!("{}{}", column_letter(self.column), self.row + 1)
    }
}

/// 列下标转列字母：0 → A，25 → Z，26 → AA
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// 带工作表名的 A1 范围，名称中的单引号需要转义
pub fn sheet_range(sheet: &str, range: &str) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), range)
}

/// 表格服务能力
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// 按顺序列出所有工作表标题
    async fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, SheetError>;

    /// 读取指定范围内的所有行
    async fn read_rows(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetError>;

    /// 写入一个单元格
    async fn write_cell(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        cell: CellRef,
        value: &str,
    ) -> Result<(), SheetError>;
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Sheets v4 REST 客户端，克隆后共享连接池
#[derive(Clone)]
pub struct GoogleSheetsClient {
    http: Client,
    base_url: Url,
    access_token: Option<String>,
}

impl GoogleSheetsClient {
    /// 创建新的表格客户端
    pub fn new(config: &SheetsConfig) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: "sheets.api_base_url".to_string(),
            value: config.api_base_url.clone(),
            expected: "absolute http(s) URL",
        };
        let base_url = Url::parse(&config.api_base_url).map_err(|_| invalid())?;
        if base_url.cannot_be_a_base() {
            return Err(invalid());
        }

        Ok(Self {
            http: Client::new(),
            base_url,
            access_token: config.access_token.clone(),
        })
    }

    /// 构建 `/v4/spreadsheets/...` 地址，路径段会被正确转义
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["v4", "spreadsheets"]).extend(segments);
        }
        url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// 发送请求并解析 JSON，非 2xx 响应转成 `BadResponse`
    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SheetError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| SheetError::request(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetError::BadResponse {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SheetError::request(endpoint, e))
    }
}

#[async_trait]
impl SheetsApi for GoogleSheetsClient {
    async fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, SheetError> {
        let mut url = self.endpoint(&[spreadsheet_id]);
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");
        let endpoint = url.to_string();

        let meta: SpreadsheetMeta = self.send_json(&endpoint, self.http.get(url)).await?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|s| s.properties.title)
            .collect())
    }

    async fn read_rows(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        range: &str,
    ) -> Result<Vec<Vec<String>>, SheetError> {
        let a1 = sheet_range(sheet, range);
        let url = self.endpoint(&[spreadsheet_id, "values", &a1]);
        let endpoint = url.to_string();
        debug!("读取表格范围: {}", a1);

        let data: ValueRange = self.send_json(&endpoint, self.http.get(url)).await?;
        Ok(data
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    async fn write_cell(
        &self,
        spreadsheet_id: &str,
        sheet: &str,
        cell: CellRef,
        value: &str,
    ) -> Result<(), SheetError> {
        let a1 = sheet_range(sheet, &cell.a1());
        let mut url = self.endpoint(&[spreadsheet_id, "values", &a1]);
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let endpoint = url.to_string();

        let body = json!({
            "range": a1,
            "majorDimension": "ROWS",
            "values": [[value]]
        });
        debug!("写入单元格 {} Payload: {}", a1, body);

        let _: Value = self
            .send_json(&endpoint, self.http.put(url).json(&body))
            .await?;
        Ok(())
    }
}

/// 格式化值以外的单元格（数字、布尔）转成字符串
fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
