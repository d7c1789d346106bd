use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 表格中的一行订单，读取后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRow {
    /// 去掉首尾空白后的订单号，非空
    pub order_number: String,
    /// 库位列的当前值
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<String>,
    /// 其余非空单元格，键为规范化后的表头
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl OrderRow {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// 是否属于业务过滤前缀
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.order_number.starts_with(prefix)
    }
}

/// 门户搜索结果第一行
///
/// 列顺序：Code, Location, Organization, Customer, Order #
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderData {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub order_number: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl OrderData {
    /// 没有结果行，属于正常情况
    pub fn absent(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// 从结果行的单元格文本构造，少于两列时返回空记录
    pub fn from_cells(cells: &[String]) -> Self {
        if cells.len() < 2 {
            return Self::default();
        }
        let cell = |i: usize| cells.get(i).map(|c| c.trim().to_string()).unwrap_or_default();
        Self {
            code: cell(0),
            location: cell(1),
            organization: cell(2),
            customer: cell(3),
            order_number: cell(4),
            error: None,
        }
    }

    /// 找到了非空库位且没有提取错误
    pub fn found_location(&self) -> Option<&str> {
        let location = self.location.trim();
        (self.error.is_none() && !location.is_empty()).then_some(location)
    }
}
