//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `step_machine` - 步骤状态机
//! - 按步骤表单向推进
//! - 每次变化推送完整快照
//!
//! ### `workflow_runner` - 工作流执行器
//! - 校验请求，依次执行各步骤
//! - 失败时推送终态快照并关闭浏览器
//! - 成功时移交浏览器会话
//!
//! ### `batch_processor` - 批量订单处理器
//! - 前缀过滤、数量上限、是否写回
//! - 顺序处理订单，单个失败不影响整批
//!
//! ## 层次关系
//!
//! ```text
//! workflow_runner (一次请求)
//!     ↓
//! batch_processor (处理 Vec<OrderRow>)
//!     ↓
//! workflow::OrderFlow (处理单个订单)
//!     ↓
//! services (能力层：PortalDriver / SheetGateway)
//!     ↓
//! infrastructure (基础设施：ChromiumSession / GoogleSheetsClient)
//! ```

pub mod batch_processor;
pub mod step_machine;
pub mod workflow_runner;

pub use batch_processor::{select_orders, BatchProcessor, BatchStats};
pub use step_machine::StepMachine;
pub use workflow_runner::{RunOutcome, WorkflowRunner};
