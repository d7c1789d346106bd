//! 步骤定义
//!
//! 步骤以数据表的形式声明（id、前驱、标题、描述），快照由表和当前步骤折叠而成，
//! 不在每个发送点重复书写整组步骤。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Config;

/// 步骤标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    Initialize,
    Navigate,
    Login,
    Facility,
    Inventory,
    ManualItems,
    ReadSheet,
    ProcessOrders,
    Complete,
}

impl StepId {
    pub fn as_str(self) -> &'static str {
        match self {
            StepId::Initialize => "initialize",
            StepId::Navigate => "navigate",
            StepId::Login => "login",
            StepId::Facility => "facility",
            StepId::Inventory => "inventory",
            StepId::ManualItems => "manual-items",
            StepId::ReadSheet => "read-sheet",
            StepId::ProcessOrders => "process-orders",
            StepId::Complete => "complete",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 步骤状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Error,
}

/// 发给调用方的步骤快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub title: String,
    pub description: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// 步骤表中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDef {
    pub id: StepId,
    pub predecessor: Option<StepId>,
    pub title: &'static str,
    pub description: String,
}

/// 工作流种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowKind {
    /// 完整流程：登录、选仓库、进入手工物品页、读表、逐个处理订单
    OrderSync,
    /// 只登录并选择仓库，然后把浏览器交给操作员
    FacilityOnly,
}

impl WorkflowKind {
    /// 本流程依次经过的步骤
    pub fn step_ids(self) -> &'static [StepId] {
        match self {
            WorkflowKind::OrderSync => &[
                StepId::Initialize,
                StepId::Navigate,
                StepId::Login,
                StepId::Facility,
                StepId::Inventory,
                StepId::ManualItems,
                StepId::ReadSheet,
                StepId::ProcessOrders,
                StepId::Complete,
            ],
            WorkflowKind::FacilityOnly => &[
                StepId::Initialize,
                StepId::Navigate,
                StepId::Login,
                StepId::Facility,
                StepId::Complete,
            ],
        }
    }

    /// 是否需要表格地址
    pub fn needs_sheet(self) -> bool {
        matches!(self, WorkflowKind::OrderSync)
    }

    /// 根据配置生成步骤表
    pub fn step_table(self, config: &Config) -> Vec<StepDef> {
        let mut predecessor = None;
        self.step_ids()
            .iter()
            .map(|&id| {
                let (title, description) = step_text(id, config);
                let def = StepDef {
                    id,
                    predecessor,
                    title,
                    description,
                };
                predecessor = Some(id);
                def
            })
            .collect()
    }
}

fn step_text(id: StepId, config: &Config) -> (&'static str, String) {
    match id {
        StepId::Initialize => (
            "Initialize Browser",
            "Starting Chrome browser and preparing automation".to_string(),
        ),
        StepId::Navigate => (
            "Navigate to Providence",
            format!("Opening {}", config.login_url),
        ),
        StepId::Login => (
            "Login to Providence",
            "Entering credentials and logging in".to_string(),
        ),
        StepId::Facility => (
            "Select Facility",
            format!("Selecting {} from facility dropdown", config.facility),
        ),
        StepId::Inventory => (
            "Navigate to Inventory Management",
            "Clicking on Inventory Management tab".to_string(),
        ),
        StepId::ManualItems => (
            "Open Manual Items",
            "Clicking on Manual Items section".to_string(),
        ),
        StepId::ReadSheet => (
            "Read Google Sheet",
            format!("Fetching {} orders from Google Sheet", config.order_prefix),
        ),
        StepId::ProcessOrders => (
            "Process Orders",
            "Searching orders and updating locations".to_string(),
        ),
        StepId::Complete => (
            "Automation Complete",
            "All steps completed successfully".to_string(),
        ),
    }
}
