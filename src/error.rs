//! 错误类型
//!
//! 每一层一个错误枚举，最终汇总到 `AppError`。
//! `Display` 文本会原样出现在进度事件的 `error` 字段中，所以保持英文。

use std::time::Duration;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误（输入缺失或非法，在任何副作用之前失败）
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// 浏览器会话错误
    #[error(transparent)]
    Session(#[from] SessionError),
    /// 浏览器能力层错误
    #[error(transparent)]
    Driver(#[from] DriverError),
    /// 元素定位失败
    #[error(transparent)]
    Locator(#[from] LocatorError),
    /// 门户操作失败
    #[error(transparent)]
    Portal(#[from] PortalError),
    /// 表格访问错误
    #[error(transparent)]
    Sheet(#[from] SheetError),
}

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Session,
    ElementNotFound,
    SheetAccess,
}

impl AppError {
    /// 归类到错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Config(_) => ErrorKind::Configuration,
            AppError::Session(_) | AppError::Driver(_) => ErrorKind::Session,
            AppError::Locator(_) | AppError::Portal(_) => ErrorKind::ElementNotFound,
            AppError::Sheet(_) => ErrorKind::SheetAccess,
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 请求缺少必填字段
    #[error("Missing required configuration ({})", .fields.join(", "))]
    MissingFields { fields: Vec<&'static str> },
    /// 环境变量解析失败
    #[error("invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
    /// 配置文件读取失败
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("failed to parse config file {path}: {source}")]
    FileParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 浏览器会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 重复初始化
    #[error("browser session already initialized")]
    AlreadyInitialized,
    /// 尚未初始化或已关闭
    #[error("Driver not initialized")]
    NotInitialized,
    /// 启动浏览器失败
    #[error("failed to launch browser: {source}")]
    LaunchFailed {
        #[source]
        source: BoxError,
    },
    /// 登录页未就绪
    #[error("login page not ready at {url}")]
    LoginPageNotReady { url: String },
    /// 进度消费者已断开，放弃剩余步骤
    #[error("progress consumer disconnected")]
    Cancelled,
    /// 导航失败
    #[error("failed to navigate to {url}: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: DriverError,
    },
}

/// 浏览器能力层错误
#[derive(Debug, Error)]
pub enum DriverError {
    /// 当前作用域中没有匹配元素
    #[error("no element matches {locator}")]
    NoSuchElement { locator: String },
    /// 操作超时
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    /// 会话已关闭
    #[error("browser session is closed")]
    Closed,
    /// 底层协议错误
    #[error("browser protocol error: {0}")]
    Protocol(#[source] BoxError),
}

/// 元素定位失败：所有候选定位器都没有命中
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("element not found in {scope} (tried: {})", .tried.join(" | "))]
    ElementNotFound { scope: String, tried: Vec<String> },
}

/// 门户操作错误
#[derive(Debug, Error)]
pub enum PortalError {
    /// 选择仓库失败
    #[error("Failed to select facility: {reason}")]
    FacilitySelectionFailed { reason: String },
    /// 页面区块未找到
    #[error("{section} not found: {source}")]
    SectionNotFound {
        section: &'static str,
        #[source]
        source: LocatorError,
    },
    /// 搜索框未找到
    #[error("Could not find search input field: {source}")]
    SearchInputNotFound {
        #[source]
        source: LocatorError,
    },
}

/// 表格访问错误
#[derive(Debug, Error)]
pub enum SheetError {
    /// 无法从 URL 中解析表格 ID
    #[error("Invalid Google Sheets URL format: {url}")]
    InvalidSheetUrl { url: String },
    /// 表格中没有工作表
    #[error("No sheets found in the spreadsheet")]
    NoWorksheets,
    /// 找不到订单号列
    #[error("Could not find order number column. Expected headers like \"Order\", \"Order Number\", or \"Order ID\"")]
    OrderColumnNotFound,
    /// 找不到库位列
    #[error("Locations column not found")]
    LocationColumnNotFound,
    /// 找不到订单所在行
    #[error("Order {order_number} not found in sheet")]
    OrderRowNotFound { order_number: String },
    /// 请求失败
    #[error("sheets request failed ({endpoint}): {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 接口返回错误
    #[error("sheets API returned {status} ({endpoint}): {body}")]
    BadResponse {
        endpoint: String,
        status: u16,
        body: String,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::Protocol(Box::new(err))
    }
}

impl From<serde_json::Error> for DriverError {
    fn from(err: serde_json::Error) -> Self {
        DriverError::Protocol(Box::new(err))
    }
}

// ========== 便捷构造函数 ==========

impl SessionError {
    /// 创建浏览器启动错误
    pub fn launch_failed(source: impl Into<BoxError>) -> Self {
        SessionError::LaunchFailed {
            source: source.into(),
        }
    }
}

impl SheetError {
    /// 创建请求失败错误
    pub fn request(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        SheetError::Request {
            endpoint: endpoint.into(),
            source,
        }
    }
}

impl ConfigError {
    /// 创建字段缺失错误
    pub fn missing(fields: Vec<&'static str>) -> Self {
        ConfigError::MissingFields { fields }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
