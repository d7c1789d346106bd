//! 浏览器能力接口
//!
//! 只描述"能做什么"：导航、查找元素、点击、输入、读取文本、执行脚本、退出。
//! 会话协议细节留给具体实现（`ChromiumSession`），测试里可以换成假实现。

use std::fmt;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::browser::locator::Locator;
use crate::config::{BrowserOptions, Timing};
use crate::error::{DriverError, SessionError};

/// 查找作用域：整个页面，或者某个元素内部
pub enum Scope<'a, E> {
    Page,
    Within { element: &'a E, label: &'static str },
}

impl<'a, E> Scope<'a, E> {
    pub fn within(element: &'a E, label: &'static str) -> Self {
        Scope::Within { element, label }
    }
}

impl<E> Clone for Scope<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Scope<'_, E> {}

impl<E> fmt::Display for Scope<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Page => write!(f, "page"),
            Scope::Within { label, .. } => write!(f, "{}", label),
        }
    }
}

/// 一个独占的浏览器会话
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// 元素句柄
    type Element: Send + Sync;

    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// 立即查找一次，不等待
    async fn find(
        &self,
        scope: Scope<'_, Self::Element>,
        locator: &Locator,
    ) -> Result<Self::Element, DriverError>;

    async fn find_all(
        &self,
        scope: Scope<'_, Self::Element>,
        locator: &Locator,
    ) -> Result<Vec<Self::Element>, DriverError>;

    async fn click(&self, element: &Self::Element) -> Result<(), DriverError>;

    async fn clear(&self, element: &Self::Element) -> Result<(), DriverError>;

    /// 全选后删除，作为 `clear` 的兜底
    async fn select_all_and_delete(&self, element: &Self::Element) -> Result<(), DriverError>;

    async fn type_text(&self, element: &Self::Element, text: &str) -> Result<(), DriverError>;

    /// 按键名遵循 CDP 的 key definition，例如 `Enter`、`Delete`
    async fn press_key(&self, element: &Self::Element, key: &str) -> Result<(), DriverError>;

    /// 读取输入框的 `value` 属性
    async fn value(&self, element: &Self::Element) -> Result<Option<String>, DriverError>;

    async fn text(&self, element: &Self::Element) -> Result<String, DriverError>;

    async fn scroll_into_view(&self, element: &Self::Element) -> Result<(), DriverError>;

    async fn run_script(&self, script: &str) -> Result<JsonValue, DriverError>;

    /// 结束会话并释放浏览器
    async fn quit(&self) -> Result<(), DriverError>;
}

/// 按能力配置创建会话
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: BrowserSession;

    async fn create(
        &self,
        options: &BrowserOptions,
        timing: &Timing,
    ) -> Result<Self::Session, SessionError>;
}
