//! Chromium 会话 - 基础设施层
//!
//! 持有唯一的 Browser / Page 资源，只暴露 `BrowserSession` 能力

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::element::Element;
use chromiumoxide::{Browser, Page};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::browser::locator::Locator;
use crate::browser::session::{BrowserSession, Scope};
use crate::config::Timing;
use crate::error::DriverError;

/// 作用域内 XPath 命中节点的临时标记属性
const PROBE_ATTR: &str = "data-locator-probe";

/// Chromium 会话
///
/// 职责：
/// - 独占一个 Browser 进程和它的 Page
/// - 把定位器翻译成 CDP 查询
/// - 不认识订单、表格和流程
pub struct ChromiumSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: JoinHandle<()>,
    page_load_timeout: Duration,
    script_timeout: Duration,
    probe_seq: AtomicU64,
}

impl ChromiumSession {
    pub fn new(browser: Browser, page: Page, handler_task: JoinHandle<()>, timing: &Timing) -> Self {
        Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler_task,
            page_load_timeout: Timing::ms(timing.page_load_timeout_ms),
            script_timeout: Timing::ms(timing.script_timeout_ms),
            probe_seq: AtomicU64::new(0),
        }
    }

    /// 获取 page 的引用
    pub fn page(&self) -> &Page {
        &self.page
    }

    fn not_found(locator: &Locator, cause: impl std::fmt::Display) -> DriverError {
        debug!("{} 查找失败: {}", locator, cause);
        DriverError::NoSuchElement {
            locator: locator.to_string(),
        }
    }

    /// 在元素内部求值 XPath，把命中节点打上标记后再用 CSS 取回
    ///
    /// CDP 只支持在元素内部用 CSS 查找，XPath 需要借助页面脚本完成。
    async fn probe_xpath(
        &self,
        scope: &Element,
        locator: &Locator,
        xpath: &str,
    ) -> Result<Vec<Element>, DriverError> {
        let tag = self.probe_seq.fetch_add(1, Ordering::Relaxed).to_string();
        let function = format!(
            r#"function() {{
                const doc = this.ownerDocument || document;
                const snap = doc.evaluate({xpath}, this, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                let hits = 0;
                for (let i = 0; i < snap.snapshotLength; i++) {{
                    const node = snap.snapshotItem(i);
                    if (node.nodeType === 1) {{
                        node.setAttribute("{attr}", {tag});
                        hits++;
                    }}
                }}
                return hits;
            }}"#,
            xpath = serde_json::to_string(xpath)?,
            attr = PROBE_ATTR,
            tag = serde_json::to_string(&tag)?,
        );

        let returns = scope.call_js_fn(function, false).await?;
        let hits = returns
            .result
            .value
            .as_ref()
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        if hits == 0 {
            return Err(Self::not_found(locator, "xpath 无命中"));
        }

        let selector = format!("[{}=\"{}\"]", PROBE_ATTR, tag);
        self.page
            .find_elements(selector)
            .await
            .map_err(|e| Self::not_found(locator, e))
    }

    async fn query(
        &self,
        scope: Scope<'_, Arc<Element>>,
        locator: &Locator,
    ) -> Result<Vec<Element>, DriverError> {
        match (scope, locator) {
            (Scope::Page, Locator::Css(css)) => self
                .page
                .find_elements(css.to_string())
                .await
                .map_err(|e| Self::not_found(locator, e)),
            (Scope::Within { element, .. }, Locator::Css(css)) => element
                .find_elements(css.to_string())
                .await
                .map_err(|e| Self::not_found(locator, e)),
            (Scope::Page, _) => {
                let xpath = locator.to_xpath(false).unwrap_or_default();
                self.page
                    .find_xpaths(xpath)
                    .await
                    .map_err(|e| Self::not_found(locator, e))
            }
            (Scope::Within { element, .. }, _) => {
                let xpath = locator.to_xpath(true).unwrap_or_default();
                self.probe_xpath(element, locator, &xpath).await
            }
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    type Element = Arc<Element>;

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        debug!("导航到: {}", url);
        match timeout(self.page_load_timeout, self.page.goto(url)).await {
            Ok(result) => {
                result?;
                Ok(())
            }
            Err(_) => Err(DriverError::Timeout {
                operation: "page load",
                after: self.page_load_timeout,
            }),
        }
    }

    async fn find(
        &self,
        scope: Scope<'_, Arc<Element>>,
        locator: &Locator,
    ) -> Result<Arc<Element>, DriverError> {
        self.query(scope, locator)
            .await?
            .into_iter()
            .next()
            .map(Arc::new)
            .ok_or_else(|| DriverError::NoSuchElement {
                locator: locator.to_string(),
            })
    }

    async fn find_all(
        &self,
        scope: Scope<'_, Arc<Element>>,
        locator: &Locator,
    ) -> Result<Vec<Arc<Element>>, DriverError> {
        match self.query(scope, locator).await {
            Ok(elements) => Ok(elements.into_iter().map(Arc::new).collect()),
            Err(DriverError::NoSuchElement { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn click(&self, element: &Arc<Element>) -> Result<(), DriverError> {
        element.click().await?;
        Ok(())
    }

    async fn clear(&self, element: &Arc<Element>) -> Result<(), DriverError> {
        element
            .call_js_fn(
                "function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }",
                false,
            )
            .await?;
        Ok(())
    }

    async fn select_all_and_delete(&self, element: &Arc<Element>) -> Result<(), DriverError> {
        element.focus().await?;
        element
            .call_js_fn("function() { if (this.select) { this.select(); } }", false)
            .await?;
        element.press_key("Delete").await?;
        Ok(())
    }

    async fn type_text(&self, element: &Arc<Element>, text: &str) -> Result<(), DriverError> {
        element.focus().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn press_key(&self, element: &Arc<Element>, key: &str) -> Result<(), DriverError> {
        element.press_key(key).await?;
        Ok(())
    }

    async fn value(&self, element: &Arc<Element>) -> Result<Option<String>, DriverError> {
        let value = element.property("value").await?;
        Ok(value.and_then(|v| v.as_str().map(str::to_string)))
    }

    async fn text(&self, element: &Arc<Element>) -> Result<String, DriverError> {
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn scroll_into_view(&self, element: &Arc<Element>) -> Result<(), DriverError> {
        element.scroll_into_view().await?;
        Ok(())
    }

    async fn run_script(&self, script: &str) -> Result<JsonValue, DriverError> {
        match timeout(self.script_timeout, self.page.evaluate(script)).await {
            Ok(result) => Ok(result?.into_value()?),
            Err(_) => Err(DriverError::Timeout {
                operation: "script",
                after: self.script_timeout,
            }),
        }
    }

    async fn quit(&self) -> Result<(), DriverError> {
        let Some(mut browser) = self.browser.lock().await.take() else {
            return Ok(());
        };

        let closed = browser.close().await;
        if let Err(e) = browser.wait().await {
            warn!("等待浏览器进程退出失败: {}", e);
        }
        self.handler_task.abort();
        closed?;
        Ok(())
    }
}
