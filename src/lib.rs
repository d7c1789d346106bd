//! # Order Location Sync
//!
//! 通过浏览器自动化在仓库门户中逐个搜索订单，把查到的库位写回 Google 表格，
//! 并以事件流的形式实时推送进度。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `ChromiumSession` - 唯一的 Browser / Page owner，实现 `BrowserSession`
//! - `GoogleSheetsClient` - Sheets REST 客户端，实现 `SheetsApi`
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `PortalDriver` - 登录、选仓库、进入手工物品页、搜索订单
//! - `SheetGateway` - 读出全部订单、写回单个库位
//! - `selectors` - 门户页面的定位器表
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个订单"的完整处理流程
//! - `OrderCtx` - 上下文封装（订单号 + 序号）
//! - `OrderFlow` - 搜索 → 写回 / 写占位
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/step_machine` - 步骤状态机与快照
//! - `orchestrator/workflow_runner` - 一次请求的完整执行
//! - `orchestrator/batch_processor` - 批量订单处理
//!
//! 外围：`progress`（进度通道与帧格式）、`server`（HTTP + SSE）。
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod server;
pub mod services;
pub mod utils;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出常用类型
pub use browser::{BrowserSession, ChromiumFactory, Locator, SessionFactory};
pub use config::Config;
pub use error::{AppError, AppResult, ErrorKind};
pub use infrastructure::{ChromiumSession, GoogleSheetsClient, SheetsApi};
pub use models::{AutomationRequest, OrderResult, WorkflowKind, WorkflowState};
pub use orchestrator::{RunOutcome, WorkflowRunner};
pub use progress::{encode_frame, progress_channel, FrameDecoder, ProgressSender};
pub use services::{PortalDriver, SheetGateway};
pub use workflow::{OrderCtx, OrderFlow};
