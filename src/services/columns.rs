//! 表头与地址解析
//!
//! 纯函数，不做任何 I/O。

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use phf::phf_set;
use regex::Regex;

use crate::error::SheetError;

/// 订单号列可接受的表头（规范化前的小写形式）
static ORDER_HEADERS: phf::Set<&'static str> = phf_set! {
    "order",
    "order number",
    "order_number",
    "ordernumber",
    "order id",
    "order_id",
    "orderid",
    "order #",
};

fn sheet_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/d/([a-zA-Z0-9_-]+)").expect("valid sheet id regex"))
}

fn whitespace() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace regex"))
}

/// 从分享链接中提取表格 ID
///
/// ```
/// use order_location_sync::services::columns::extract_spreadsheet_id;
/// let id = extract_spreadsheet_id("https://docs.google.com/spreadsheets/d/ABC123/edit").unwrap();
/// assert_eq!(id, "ABC123");
/// ```
pub fn extract_spreadsheet_id(url: &str) -> Result<String, SheetError> {
    sheet_id_pattern()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| SheetError::InvalidSheetUrl {
            url: url.to_string(),
        })
}

/// 规范化表头：小写，空白转下划线；空表头用列号代替
pub fn normalize_header(header: &str, index: usize) -> String {
    let trimmed = header.trim();
    if trimmed.is_empty() {
        return format!("column_{}", index);
    }
    whitespace()
        .replace_all(&trimmed.to_lowercase(), "_")
        .into_owned()
}

/// 按同义词查找订单号列
pub fn find_order_column(headers: &[String]) -> Option<usize> {
    headers
        .iter()
        .position(|h| ORDER_HEADERS.contains(h.trim().to_lowercase().as_str()))
}

/// 查找第一个包含 "location" 的表头
pub fn find_location_column(headers: &[String]) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.to_lowercase().contains("location"))
}

/// 把 `M/D` 或 `MM/DD` 形式的标题解析成指定年份的日期
fn parse_sheet_date(title: &str, year: i32) -> Option<NaiveDate> {
    let (month, day) = title.trim().split_once('/')?;
    if month.is_empty() || day.is_empty() || month.len() > 2 || day.len() > 2 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

/// 在标题中找出日期最新的工作表，没有日期标题时返回 `None`
pub fn latest_date_sheet(titles: &[String], year: i32) -> Option<&str> {
    titles
        .iter()
        .filter_map(|t| parse_sheet_date(t, year).map(|d| (d, t.as_str())))
        .max_by_key(|(date, _)| *date)
        .map(|(_, title)| title)
}

/// 当前年份
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}
