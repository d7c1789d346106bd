//! 元素定位器与解析
//!
//! 门户页面的结构不受我们控制，所以每个界面元素都准备一组候选定位器，
//! 按"最具体、最稳定"到"最通用"的顺序排列。解析时严格按顺序逐个尝试，
//! 单个候选失败只记日志，继续下一个；全部失败才报 `ElementNotFound`。

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::browser::session::{BrowserSession, Scope};
use crate::config::Timing;
use crate::error::{DriverError, LocatorError};

/// 最小轮询间隔
const MIN_POLL: Duration = Duration::from_millis(10);

/// 描述如何找到一个界面元素
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS 选择器
    Css(Cow<'static, str>),
    /// XPath 表达式
    XPath(Cow<'static, str>),
    /// 按元素文本包含匹配
    Text(Cow<'static, str>),
}

impl Locator {
    pub const fn css(selector: &'static str) -> Self {
        Locator::Css(Cow::Borrowed(selector))
    }

    pub const fn xpath(expr: &'static str) -> Self {
        Locator::XPath(Cow::Borrowed(expr))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Locator::Text(Cow::Owned(text.into()))
    }

    pub fn xpath_owned(expr: impl Into<String>) -> Self {
        Locator::XPath(Cow::Owned(expr.into()))
    }

    /// 转成 XPath。CSS 定位器返回 `None`
    ///
    /// `scoped` 为真时把绝对路径 `//` 改成相对当前节点的 `.//`
    pub fn to_xpath(&self, scoped: bool) -> Option<String> {
        let expr = match self {
            Locator::Css(_) => return None,
            Locator::XPath(expr) => expr.to_string(),
            Locator::Text(text) => format!("//*[contains(text(), {})]", xpath_literal(text)),
        };
        if scoped && expr.starts_with("//") {
            Some(format!(".{}", expr))
        } else {
            Some(expr)
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css:{}", s),
            Locator::XPath(s) => write!(f, "xpath:{}", s),
            Locator::Text(s) => write!(f, "text:{}", s),
        }
    }
}

/// 把任意字符串转成合法的 XPath 字面量
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{}'", text)
    } else if !text.contains('"') {
        format!("\"{}\"", text)
    } else {
        let parts: Vec<String> = text.split('\'').map(|p| format!("'{}'", p)).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// 等待预算
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    pub timeout: Duration,
    pub poll: Duration,
}

impl Wait {
    pub fn new(timeout: Duration, poll: Duration) -> Self {
        Self { timeout, poll }
    }

    /// 使用配置里的轮询间隔
    pub fn from_ms(timeout_ms: u64, timing: &Timing) -> Self {
        Self::new(Timing::ms(timeout_ms), Timing::ms(timing.poll_interval_ms))
    }

    /// 只尝试一次
    pub fn once() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }
}

/// 解析结果：命中的元素和命中的候选下标
#[derive(Debug)]
pub struct Resolution<E> {
    pub element: E,
    pub index: usize,
}

/// 在预算内等待单个定位器出现
pub async fn wait_for<S>(
    session: &S,
    scope: Scope<'_, S::Element>,
    locator: &Locator,
    wait: Wait,
) -> Result<S::Element, DriverError>
where
    S: BrowserSession + ?Sized,
{
    let deadline = Instant::now() + wait.timeout;
    loop {
        match session.find(scope, locator).await {
            Ok(element) => return Ok(element),
            Err(e) => {
                if Instant::now() >= deadline {
                    return Err(e);
                }
                debug!("等待 {} ({}): {}", locator, scope, e);
            }
        }
        sleep(wait.poll.max(MIN_POLL)).await;
    }
}

/// 按优先级解析一组候选定位器，返回第一个命中的元素
///
/// 每个候选都有独立的等待预算，命中后不再尝试后面的候选。
pub async fn resolve<S>(
    session: &S,
    scope: Scope<'_, S::Element>,
    candidates: &[Locator],
    wait: Wait,
) -> Result<Resolution<S::Element>, LocatorError>
where
    S: BrowserSession + ?Sized,
{
    for (index, locator) in candidates.iter().enumerate() {
        match wait_for(session, scope, locator, wait).await {
            Ok(element) => {
                debug!("✓ 在 {} 中通过 {} 找到元素", scope, locator);
                return Ok(Resolution { element, index });
            }
            Err(e) => {
                debug!("候选 {} 未命中: {}", locator, e);
            }
        }
    }

    Err(LocatorError::ElementNotFound {
        scope: scope.to_string(),
        tried: candidates.iter().map(|l| l.to_string()).collect(),
    })
}
