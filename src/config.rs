//! 程序配置
//!
//! 默认值 → TOML 配置文件（可选）→ 环境变量，后者覆盖前者。
//! 所有等待时间都在这里集中配置，业务代码里不出现魔法数字。

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 程序配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 门户登录页
    pub login_url: String,
    /// 要选择的仓库
    pub facility: String,
    /// 业务过滤前缀，只处理以此开头的订单号
    pub order_prefix: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// HTTP 服务监听地址
    pub bind_addr: String,
    pub browser: BrowserOptions,
    pub timing: Timing,
    pub sheets: SheetsConfig,
    pub batch: BatchProfile,
    pub policy: RunPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            login_url: "https://providence.gobolt.com/login".to_string(),
            facility: "YYZ5".to_string(),
            order_prefix: "BoltYYZ3".to_string(),
            verbose_logging: false,
            bind_addr: "127.0.0.1:3000".to_string(),
            browser: BrowserOptions::default(),
            timing: Timing::default(),
            sheets: SheetsConfig::default(),
            batch: BatchProfile::default(),
            policy: RunPolicy::default(),
        }
    }
}

/// 浏览器启动参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// 自定义 Chrome 路径，为空时由 chromiumoxide 自动探测
    pub chrome_executable: Option<String>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: false,
            window_width: 1920,
            window_height: 1080,
            chrome_executable: None,
        }
    }
}

/// 超时与沉降等待（毫秒）
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// 每个候选定位器的等待上限
    pub implicit_wait_ms: u64,
    /// 等待元素时的轮询间隔
    pub poll_interval_ms: u64,
    pub page_load_timeout_ms: u64,
    pub script_timeout_ms: u64,
    pub login_page_wait_ms: u64,
    pub modal_wait_ms: u64,
    pub option_list_wait_ms: u64,
    pub manual_items_verify_ms: u64,
    pub result_wait_ms: u64,
    pub post_login_settle_ms: u64,
    pub click_settle_ms: u64,
    pub option_settle_ms: u64,
    pub navigation_settle_ms: u64,
    pub input_settle_ms: u64,
    pub key_settle_ms: u64,
    pub type_settle_ms: u64,
    pub retype_settle_ms: u64,
    pub search_settle_ms: u64,
    /// 两个订单之间的间隔，避免给远端服务造成压力
    pub inter_order_delay_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            implicit_wait_ms: 10_000,
            poll_interval_ms: 250,
            page_load_timeout_ms: 30_000,
            script_timeout_ms: 30_000,
            login_page_wait_ms: 15_000,
            modal_wait_ms: 15_000,
            option_list_wait_ms: 10_000,
            manual_items_verify_ms: 10_000,
            result_wait_ms: 8_000,
            post_login_settle_ms: 1_000,
            click_settle_ms: 1_000,
            option_settle_ms: 500,
            navigation_settle_ms: 3_000,
            input_settle_ms: 300,
            key_settle_ms: 200,
            type_settle_ms: 800,
            retype_settle_ms: 500,
            search_settle_ms: 3_000,
            inter_order_delay_ms: 4_000,
        }
    }
}

impl Timing {
    /// 所有等待归零，用于测试
    pub fn immediate() -> Self {
        Self {
            implicit_wait_ms: 0,
            poll_interval_ms: 0,
            page_load_timeout_ms: 1_000,
            script_timeout_ms: 1_000,
            login_page_wait_ms: 0,
            modal_wait_ms: 0,
            option_list_wait_ms: 0,
            manual_items_verify_ms: 0,
            result_wait_ms: 0,
            post_login_settle_ms: 0,
            click_settle_ms: 0,
            option_settle_ms: 0,
            navigation_settle_ms: 0,
            input_settle_ms: 0,
            key_settle_ms: 0,
            type_settle_ms: 0,
            retype_settle_ms: 0,
            search_settle_ms: 0,
            inter_order_delay_ms: 0,
        }
    }

    pub fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }
}

/// 表格服务配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    pub api_base_url: String,
    /// OAuth access token（认证流程不在本程序内）
    pub access_token: Option<String>,
    /// 读取的固定列范围
    pub read_range: String,
    pub columns: ColumnStrategy,
    pub selection: SheetSelection,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://sheets.googleapis.com".to_string(),
            access_token: None,
            read_range: "A:Z".to_string(),
            columns: ColumnStrategy::default(),
            selection: SheetSelection::First,
        }
    }
}

/// 列选择策略。一次读写只使用其中一种，不混用
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ColumnStrategy {
    /// 固定列下标（从 0 开始）
    Fixed {
        order_column: usize,
        location_column: usize,
    },
    /// 按表头同义词匹配
    Header,
}

impl Default for ColumnStrategy {
    fn default() -> Self {
        ColumnStrategy::Fixed {
            order_column: 4,
            location_column: 5,
        }
    }
}

/// 工作表选择方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetSelection {
    /// 第一个工作表
    First,
    /// 标题形如 `MM/DD` 的最新日期工作表，找不到时退回第一个
    LatestDate,
}

/// 批处理模式
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchProfile {
    /// 最多处理多少个订单，`None` 表示全部
    pub cap: Option<usize>,
    /// 是否把库位写回表格
    pub write_back: bool,
}

impl BatchProfile {
    /// 只处理前 5 个订单并写回
    pub fn capped_write_back() -> Self {
        Self {
            cap: Some(5),
            write_back: true,
        }
    }

    /// 处理全部订单，只搜索不写回
    pub fn search_only() -> Self {
        Self {
            cap: None,
            write_back: false,
        }
    }
}

impl Default for BatchProfile {
    fn default() -> Self {
        Self::capped_write_back()
    }
}

/// 会话收尾策略
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunPolicy {
    /// 成功后关闭浏览器（默认留给操作员继续手动处理）
    pub close_on_success: bool,
    /// 进度消费者断开后放弃剩余步骤并关闭浏览器
    pub abort_on_disconnect: bool,
}

impl Config {
    /// 从环境变量加载
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// 从 TOML 文件加载，再应用环境变量覆盖
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content).map_err(|source| ConfigError::FileParse {
            path: path.display().to_string(),
            source,
        })?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 用给定的查找函数覆盖配置项
    pub fn apply_env<F>(&mut self, get: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = get("PORTAL_LOGIN_URL") {
            self.login_url = v;
        }
        if let Some(v) = get("FACILITY") {
            self.facility = v;
        }
        if let Some(v) = get("ORDER_PREFIX") {
            self.order_prefix = v;
        }
        if let Some(v) = get("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = get("CHROME_EXECUTABLE") {
            self.browser.chrome_executable = Some(v);
        }
        if let Some(v) = get("GOOGLE_SHEETS_API_BASE") {
            self.sheets.api_base_url = v;
        }
        if let Some(v) = get("GOOGLE_SHEETS_ACCESS_TOKEN") {
            self.sheets.access_token = Some(v);
        }
        if let Some(v) = get("VERBOSE_LOGGING") {
            self.verbose_logging = parse_value("VERBOSE_LOGGING", &v, "bool")?;
        }
        if let Some(v) = get("HEADLESS") {
            self.browser.headless = parse_value("HEADLESS", &v, "bool")?;
        }
        if let Some(v) = get("WRITE_BACK") {
            self.batch.write_back = parse_value("WRITE_BACK", &v, "bool")?;
        }
        if let Some(v) = get("BATCH_CAP") {
            self.batch.cap = match v.trim() {
                "" | "all" | "none" => None,
                other => Some(parse_value("BATCH_CAP", other, "usize")?),
            };
        }
        if let Some(v) = get("INTER_ORDER_DELAY_MS") {
            self.timing.inter_order_delay_ms = parse_value("INTER_ORDER_DELAY_MS", &v, "u64")?;
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(
    key: &str,
    value: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_portal_profile() {
        let config = Config::default();
        assert_eq!(config.facility, "YYZ5");
        assert_eq!(config.order_prefix, "BoltYYZ3");
        assert_eq!(
            config.sheets.columns,
            ColumnStrategy::Fixed {
                order_column: 4,
                location_column: 5
            }
        );
        assert_eq!(config.batch, BatchProfile::capped_write_back());
        assert!(!config.policy.close_on_success);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            order_prefix = "BoltYYZ2"

            [batch]
            cap = 20
            write_back = false

            [sheets.columns]
            strategy = "header"
            "#,
        )
        .unwrap();

        assert_eq!(config.order_prefix, "BoltYYZ2");
        assert_eq!(config.batch.cap, Some(20));
        assert!(!config.batch.write_back);
        assert_eq!(config.sheets.columns, ColumnStrategy::Header);
        assert_eq!(config.facility, "YYZ5");
        assert_eq!(config.timing.search_settle_ms, 3_000);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [("BATCH_CAP", "all"), ("HEADLESS", "true"), ("FACILITY", "YYZ7")]
            .into_iter()
            .collect();
        let mut config = Config::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.batch.cap, None);
        assert!(config.browser.headless);
        assert_eq!(config.facility, "YYZ7");
    }

    #[test]
    fn test_env_invalid_value() {
        let mut config = Config::default();
        let err = config
            .apply_env(|k| (k == "WRITE_BACK").then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
