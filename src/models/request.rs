use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::step::WorkflowKind;

/// 调用方的请求
///
/// 字段都是可选的：缺失在流程开始时校验，并以终态事件返回给调用方，
/// 而不是在反序列化阶段直接拒绝。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub google_sheet_url: Option<String>,
}

/// 校验后的凭据
#[derive(Clone)]
pub struct ValidatedRequest {
    pub username: String,
    pub password: String,
    pub sheet_url: Option<String>,
}

impl std::fmt::Debug for ValidatedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatedRequest")
            .field("username", &self.username)
            .field("password", &"***")
            .field("sheet_url", &self.sheet_url)
            .finish()
    }
}

impl AutomationRequest {
    pub fn new(username: &str, password: &str, google_sheet_url: Option<&str>) -> Self {
        Self {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            google_sheet_url: google_sheet_url.map(str::to_string),
        }
    }

    /// 检查必填字段，缺一个都不允许产生任何副作用
    pub fn validate(&self, kind: WorkflowKind) -> Result<ValidatedRequest, ConfigError> {
        fn present(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        let username = present(&self.username);
        let password = present(&self.password);
        let sheet_url = present(&self.google_sheet_url);

        let mut missing = Vec::new();
        if username.is_none() {
            missing.push("username");
        }
        if password.is_none() {
            missing.push("password");
        }
        if kind.needs_sheet() && sheet_url.is_none() {
            missing.push("googleSheetUrl");
        }

        match (username, password) {
            (Some(username), Some(password)) if missing.is_empty() => Ok(ValidatedRequest {
                username,
                password,
                sheet_url,
            }),
            _ => Err(ConfigError::missing(missing)),
        }
    }
}
