//! 表格网关 - 业务能力层
//!
//! 负责"读出全部订单"和"把库位写回订单所在行"。
//! 表格可能正被人工编辑，所以每次写入前都重新读取并重新定位行号。

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::{ColumnStrategy, SheetSelection, SheetsConfig};
use crate::error::SheetError;
use crate::infrastructure::sheets_client::{CellRef, SheetsApi};
use crate::models::OrderRow;
use crate::services::columns::{
    current_year, extract_spreadsheet_id, find_location_column, find_order_column,
    latest_date_sheet, normalize_header,
};

/// 一次读取中实际使用的列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    order: usize,
    location: Option<usize>,
}

/// 已定位的工作表
#[derive(Debug, Clone)]
struct Worksheet {
    spreadsheet_id: String,
    title: String,
}

/// 表格网关
pub struct SheetGateway<A: SheetsApi> {
    api: A,
    config: SheetsConfig,
}

impl<A: SheetsApi> SheetGateway<A> {
    pub fn new(api: A, config: &SheetsConfig) -> Self {
        Self {
            api,
            config: config.clone(),
        }
    }

    async fn resolve_worksheet(&self, sheet_url: &str) -> Result<Worksheet, SheetError> {
        let spreadsheet_id = extract_spreadsheet_id(sheet_url)?;
        let titles = self.api.sheet_titles(&spreadsheet_id).await?;
        let first = titles.first().ok_or(SheetError::NoWorksheets)?;

        let title = match self.config.selection {
            SheetSelection::First => first.clone(),
            SheetSelection::LatestDate => match latest_date_sheet(&titles, current_year()) {
                Some(latest) => latest.to_string(),
                None => {
                    warn!("⚠️ 没有日期格式的工作表，使用第一个: {}", first);
                    first.clone()
                }
            },
        };

        debug!("使用工作表: {} ({})", title, spreadsheet_id);
        Ok(Worksheet {
            spreadsheet_id,
            title,
        })
    }

    /// 根据配置的策略确定列，两种策略不会在一次调用中混用
    fn column_map(&self, headers: &[String]) -> Result<ColumnMap, SheetError> {
        match &self.config.columns {
            ColumnStrategy::Fixed {
                order_column,
                location_column,
            } => Ok(ColumnMap {
                order: *order_column,
                location: Some(*location_column),
            }),
            ColumnStrategy::Header => {
                let order = find_order_column(headers).ok_or(SheetError::OrderColumnNotFound)?;
                Ok(ColumnMap {
                    order,
                    location: find_location_column(headers),
                })
            }
        }
    }

    async fn read_grid(&self, sheet: &Worksheet) -> Result<Vec<Vec<String>>, SheetError> {
        self.api
            .read_rows(&sheet.spreadsheet_id, &sheet.title, &self.config.read_range)
            .await
    }

    /// 读取全部订单，第 0 行是表头，订单号为空的行跳过
    pub async fn read_all_orders(&self, sheet_url: &str) -> Result<Vec<OrderRow>, SheetError> {
        let sheet = self.resolve_worksheet(sheet_url).await?;
        let grid = self.read_grid(&sheet).await?;

        let Some((headers, rows)) = grid.split_first() else {
            info!("工作表 {} 为空", sheet.title);
            return Ok(Vec::new());
        };
        let columns = self.column_map(headers)?;

        let orders: Vec<OrderRow> = rows
            .iter()
            .filter_map(|row| to_order_row(headers, row, columns))
            .collect();

        info!("从工作表 {} 读取到 {} 个订单", sheet.title, orders.len());
        Ok(orders)
    }

    /// 把库位写入订单所在行，返回写入的单元格
    ///
    /// 订单号按去掉首尾空白后精确匹配（区分大小写），取第一行。
    pub async fn write_location(
        &self,
        sheet_url: &str,
        order_number: &str,
        location: &str,
    ) -> Result<CellRef, SheetError> {
        let sheet = self.resolve_worksheet(sheet_url).await?;
        let grid = self.read_grid(&sheet).await?;

        let headers = grid.first().map(Vec::as_slice).unwrap_or_default();
        let columns = self.column_map(headers)?;
        let location_column = columns.location.ok_or(SheetError::LocationColumnNotFound)?;

        let row = grid
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| cell(row, columns.order) == order_number)
            .map(|(index, _)| index)
            .ok_or_else(|| SheetError::OrderRowNotFound {
                order_number: order_number.to_string(),
            })?;

        let target = CellRef::new(row, location_column);
        self.api
            .write_cell(&sheet.spreadsheet_id, &sheet.title, target, location)
            .await?;

        info!(
            "📝 已写入 {}!{} = {} (订单 {})",
            sheet.title,
            target.a1(),
            location,
            order_number
        );
        Ok(target)
    }
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|c| c.trim()).unwrap_or_default()
}

fn to_order_row(headers: &[String], row: &[String], columns: ColumnMap) -> Option<OrderRow> {
    let order_number = cell(row, columns.order);
    if order_number.is_empty() {
        return None;
    }

    let location = columns
        .location
        .map(|i| cell(row, i))
        .filter(|l| !l.is_empty())
        .map(str::to_string);

    let mut fields = BTreeMap::new();
    for (index, value) in row.iter().enumerate() {
        if index == columns.order || Some(index) == columns.location || value.trim().is_empty() {
            continue;
        }
        let header = headers.get(index).map(String::as_str).unwrap_or_default();
        fields.insert(normalize_header(header, index), value.trim().to_string());
    }

    Some(OrderRow {
        order_number: order_number.to_string(),
        location,
        fields,
    })
}
