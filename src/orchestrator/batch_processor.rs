//! 批量订单处理器 - 编排层
//!
//! ## 职责
//!
//! 1. **业务过滤**：只保留带指定前缀的订单，保持原有顺序
//! 2. **批量模式**：按 `BatchProfile` 截取数量、决定是否写回
//! 3. **顺序处理**：一次只处理一个订单，订单之间插入固定间隔
//! 4. **失败隔离**：单个订单的失败只影响它自己的结果
//! 5. **进度推送**：每个订单开始和结束都更新 `process-orders` 步骤

use tokio::time::sleep;
use tracing::info;

use crate::browser::session::SessionFactory;
use crate::config::{BatchProfile, Timing};
use crate::error::SessionError;
use crate::infrastructure::sheets_client::SheetsApi;
use crate::models::{OrderRow, OrderResult, OrderStatus, StepId};
use crate::orchestrator::step_machine::StepMachine;
use crate::services::{PortalDriver, SheetGateway};
use crate::utils::logging::{log_order_outcome, print_final_stats};
use crate::workflow::{OrderCtx, OrderFlow};

/// 批处理统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

/// 按前缀过滤，再按上限截取
pub fn select_orders(rows: Vec<OrderRow>, prefix: &str, cap: Option<usize>) -> Vec<OrderRow> {
    let filtered = rows.into_iter().filter(|row| row.has_prefix(prefix));
    match cap {
        Some(cap) => filtered.take(cap).collect(),
        None => filtered.collect(),
    }
}

/// 批量订单处理器
pub struct BatchProcessor<'a, A: SheetsApi> {
    gateway: &'a SheetGateway<A>,
    sheet_url: &'a str,
    profile: &'a BatchProfile,
    timing: &'a Timing,
}

impl<'a, A: SheetsApi> BatchProcessor<'a, A> {
    pub fn new(
        gateway: &'a SheetGateway<A>,
        sheet_url: &'a str,
        profile: &'a BatchProfile,
        timing: &'a Timing,
    ) -> Self {
        Self {
            gateway,
            sheet_url,
            profile,
            timing,
        }
    }

    /// 顺序处理所有订单
    ///
    /// 只有进度通道被放弃时才会返回错误，订单本身的失败都记在结果里。
    pub async fn process<F: SessionFactory>(
        &self,
        machine: &mut StepMachine,
        driver: &mut PortalDriver<F>,
        orders: &[OrderRow],
    ) -> Result<BatchStats, SessionError> {
        let total = orders.len();
        let flow = OrderFlow::new(self.gateway, self.sheet_url, self.profile.write_back);
        let mut stats = BatchStats {
            total,
            ..BatchStats::default()
        };

        for (i, order) in orders.iter().enumerate() {
            let ctx = OrderCtx::new(order.order_number.clone(), i + 1, total);

            machine.describe(
                StepId::ProcessOrders,
                format!("Processing {} ({}/{})", ctx.order_number, ctx.index, total),
            )?;
            let slot = machine.push_result(OrderResult::processing(&ctx.order_number))?;

            let outcome = flow.run(driver, &ctx).await;
            log_order_outcome(&ctx, &outcome);

            let succeeded = outcome.result.status == OrderStatus::Success;
            if succeeded {
                stats.success += 1;
            } else {
                stats.failed += 1;
            }
            machine.replace_result(slot, outcome.result)?;

            if succeeded && self.profile.write_back {
                machine.describe(
                    StepId::ProcessOrders,
                    format!("✅ Updated {} ({}/{})", ctx.order_number, ctx.index, total),
                )?;
            }

            if !ctx.is_last() && self.timing.inter_order_delay_ms > 0 {
                info!("⏳ 等待 {}ms 后处理下一个订单", self.timing.inter_order_delay_ms);
                sleep(Timing::ms(self.timing.inter_order_delay_ms)).await;
            }
        }

        machine.describe(
            StepId::ProcessOrders,
            format!("Processed {} orders successfully", total),
        )?;
        print_final_stats(&stats);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn row(order: &str) -> OrderRow {
        OrderRow {
            order_number: order.to_string(),
            location: None,
            fields: BTreeMap::new(),
        }
    }

    fn numbers(rows: &[OrderRow]) -> Vec<&str> {
        rows.iter().map(|r| r.order_number.as_str()).collect()
    }

    #[test]
    fn test_select_orders_by_prefix() {
        let rows = vec![row("BoltYYZ3-001"), row("BoltYYZ2-001"), row("BoltYYZ3-002")];
        let selected = select_orders(rows, "BoltYYZ3", None);
        assert_eq!(numbers(&selected), vec!["BoltYYZ3-001", "BoltYYZ3-002"]);
    }

    #[test]
    fn test_select_orders_applies_cap_after_filter() {
        let rows: Vec<OrderRow> = (0..8)
            .map(|i| row(&format!("BoltYYZ{}-{:03}", 2 + i % 2, i)))
            .collect();
        let selected = select_orders(rows, "BoltYYZ3", Some(2));
        assert_eq!(numbers(&selected), vec!["BoltYYZ3-001", "BoltYYZ3-003"]);
    }
}
