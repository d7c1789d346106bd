/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::{info, warn};

use crate::config::{BatchProfile, Config};
use crate::models::{OrderStatus, WorkflowKind};
use crate::orchestrator::batch_processor::BatchStats;
use crate::workflow::{OrderCtx, OrderOutcome, WriteOutcome};

/// 记录一次执行的启动信息
///
/// # 参数
/// - `kind`: 工作流种类
/// - `config`: 当前配置
pub fn log_run_start(kind: WorkflowKind, config: &Config) {
    let name = match kind {
        WorkflowKind::OrderSync => "订单库位同步",
        WorkflowKind::FacilityOnly => "仓库选择",
    };
    info!("{}", "=".repeat(60));
    info!(
        "🚀 {} 开始 - {}",
        name,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("🏭 仓库: {}  🔖 订单前缀: {}", config.facility, config.order_prefix);
    info!("{}", "=".repeat(60));
}

/// 记录订单加载信息
///
/// # 参数
/// - `read`: 表格中读到的订单数
/// - `selected`: 过滤和截取后要处理的订单数
/// - `prefix`: 业务过滤前缀
/// - `profile`: 批处理模式
pub fn log_orders_loaded(read: usize, selected: usize, prefix: &str, profile: &BatchProfile) {
    info!("✓ 表格中共有 {} 个订单，其中 {} 个待处理 ({}*)", read, selected, prefix);
    match profile.cap {
        Some(cap) => info!("📋 本次最多处理 {} 个订单", cap),
        None => info!("📋 本次处理全部订单"),
    }
    if !profile.write_back {
        info!("💡 只搜索模式：不会写回表格");
    }
}

/// 记录单个订单的最终结果
pub fn log_order_outcome(ctx: &OrderCtx, outcome: &OrderOutcome) {
    let message = outcome.result.message.as_deref().unwrap_or_default();
    match outcome.result.status {
        OrderStatus::Success => info!("{} ✅ {}", ctx, message),
        _ => warn!("{} ❌ {}", ctx, truncate_text(message, 120)),
    }
    if let WriteOutcome::Failed { value, reason } = &outcome.write {
        warn!("{} 表格未更新 (\"{}\"): {}", ctx, value, truncate_text(reason, 120));
    }
}

/// 打印最终统计信息
pub fn print_final_stats(stats: &BatchStats) {
    info!("\n{}", "=".repeat(60));
    info!("📊 订单处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.success, stats.total);
    info!("❌ 失败: {}", stats.failed);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
