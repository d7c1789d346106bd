//! 订单处理流程 - 流程层
//!
//! 核心职责：定义"一个订单"的完整处理流程
//!
//! 流程顺序：
//! 1. 在门户搜索订单 → 提取第一行结果
//! 2. 找到库位 → 写回表格
//! 3. 没有库位 → 写入 "No location" 占位（尽力而为）
//! 4. 任何异常 → 写入 "Error" 占位（尽力而为）
//!
//! 单个订单的失败不会向外传播，结果总是汇总成 `OrderOutcome`。

use tracing::{error, info, warn};

use crate::browser::session::SessionFactory;
use crate::error::AppResult;
use crate::infrastructure::sheets_client::{CellRef, SheetsApi};
use crate::models::OrderResult;
use crate::services::{PortalDriver, SheetGateway};
use crate::workflow::order_ctx::OrderCtx;

/// 没有库位时写入的占位值
pub const NO_LOCATION_SENTINEL: &str = "No location";
/// 处理出错时写入的占位值
pub const ERROR_SENTINEL: &str = "Error";

pub const MSG_UPDATED: &str = "Location updated successfully";
pub const MSG_FOUND: &str = "Location found";
pub const MSG_NO_LOCATION: &str = "No location found";

/// 表格写入的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// 只搜索模式，没有写入
    Skipped,
    /// 写入成功
    Written { cell: CellRef, value: String },
    /// 写入失败，订单结果已降级
    Failed { value: String, reason: String },
}

/// 一个订单的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderOutcome {
    pub result: OrderResult,
    pub write: WriteOutcome,
}

/// 订单处理流程
///
/// - 不持有浏览器会话，由调用方传入
/// - 只借用表格网关
pub struct OrderFlow<'a, A: SheetsApi> {
    gateway: &'a SheetGateway<A>,
    sheet_url: &'a str,
    write_back: bool,
}

impl<'a, A: SheetsApi> OrderFlow<'a, A> {
    pub fn new(gateway: &'a SheetGateway<A>, sheet_url: &'a str, write_back: bool) -> Self {
        Self {
            gateway,
            sheet_url,
            write_back,
        }
    }

    pub async fn run<F: SessionFactory>(
        &self,
        driver: &mut PortalDriver<F>,
        ctx: &OrderCtx,
    ) -> OrderOutcome {
        info!("{} 开始处理", ctx);

        match self.search_and_record(driver, ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{} ❌ 处理失败: {}", ctx, e);
                let write = self.write_sentinel(ctx, ERROR_SENTINEL).await;
                OrderOutcome {
                    result: OrderResult::error(&ctx.order_number, e.to_string()),
                    write,
                }
            }
        }
    }

    async fn search_and_record<F: SessionFactory>(
        &self,
        driver: &mut PortalDriver<F>,
        ctx: &OrderCtx,
    ) -> AppResult<OrderOutcome> {
        let data = driver.search_order(&ctx.order_number).await?;

        let Some(location) = data.found_location() else {
            let message = data
                .error
                .clone()
                .unwrap_or_else(|| MSG_NO_LOCATION.to_string());
            warn!("{} ⚠️ 没有库位: {}", ctx, message);
            let write = self.write_sentinel(ctx, NO_LOCATION_SENTINEL).await;
            return Ok(OrderOutcome {
                result: OrderResult::error(&ctx.order_number, message),
                write,
            });
        };

        if !self.write_back {
            info!("{} ✓ 找到库位 {}（只搜索模式，不写回）", ctx, location);
            return Ok(OrderOutcome {
                result: OrderResult::success(&ctx.order_number, location, MSG_FOUND),
                write: WriteOutcome::Skipped,
            });
        }

        let cell = self
            .gateway
            .write_location(self.sheet_url, &ctx.order_number, location)
            .await?;
        info!("{} ✅ 库位 {} 已写入 {}", ctx, location, cell.a1());

        Ok(OrderOutcome {
            result: OrderResult::success(&ctx.order_number, location, MSG_UPDATED),
            write: WriteOutcome::Written {
                cell,
                value: location.to_string(),
            },
        })
    }

    /// 写入占位值，失败只记日志
    async fn write_sentinel(&self, ctx: &OrderCtx, sentinel: &str) -> WriteOutcome {
        if !self.write_back {
            return WriteOutcome::Skipped;
        }

        match self
            .gateway
            .write_location(self.sheet_url, &ctx.order_number, sentinel)
            .await
        {
            Ok(cell) => {
                info!("{} 已写入占位 \"{}\" 到 {}", ctx, sentinel, cell.a1());
                WriteOutcome::Written {
                    cell,
                    value: sentinel.to_string(),
                }
            }
            Err(e) => {
                warn!("{} ⚠️ 占位 \"{}\" 写入失败: {}", ctx, sentinel, e);
                WriteOutcome::Failed {
                    value: sentinel.to_string(),
                    reason: e.to_string(),
                }
            }
        }
    }
}
