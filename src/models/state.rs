use serde::{Deserialize, Serialize};

use crate::models::step::Step;

/// 单个订单的处理状态，只能从 `Processing` 前进到终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Success,
    Error,
    Processing,
}

/// 单个订单的处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResult {
    pub order_number: String,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<String>,
}

impl OrderResult {
    pub fn processing(order_number: impl Into<String>) -> Self {
        Self {
            order_number: order_number.into(),
            status: OrderStatus::Processing,
            message: None,
            location: None,
        }
    }

    pub fn success(order_number: impl Into<String>, location: impl Into<String>, message: &str) -> Self {
        Self {
            order_number: order_number.into(),
            status: OrderStatus::Success,
            message: Some(message.to_string()),
            location: Some(location.into()),
        }
    }

    pub fn error(order_number: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            order_number: order_number.into(),
            status: OrderStatus::Error,
            message: Some(message.into()),
            location: None,
        }
    }

    pub fn is_final(&self) -> bool {
        self.status != OrderStatus::Processing
    }
}

/// 工作流状态快照，也是进度通道上每一帧的内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub is_running: bool,
    pub current_step_id: String,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub results: Vec<OrderResult>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}
