use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::browser::session::SessionFactory;
use crate::config::{BrowserOptions, Timing};
use crate::error::SessionError;
use crate::infrastructure::ChromiumSession;

/// 关闭后台节流、同步、扩展等与自动化无关的功能
const QUIET_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--start-maximized",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-renderer-backgrounding",
    "--disable-features=TranslateUI",
    "--disable-ipc-flooding-protection",
    "--disable-background-networking",
    "--disable-sync",
    "--disable-default-apps",
    "--disable-extensions",
    "--disable-component-extensions-with-background-pages",
    "--disable-background-mode",
    "--disable-client-side-phishing-detection",
    "--disable-hang-monitor",
    "--disable-prompt-on-repost",
    "--disable-domain-reliability",
    "--log-level=3",
    "--silent",
];

/// 启动浏览器并打开一个空白页
pub async fn launch_browser(
    options: &BrowserOptions,
    timing: &Timing,
) -> Result<(Browser, Page, JoinHandle<()>), SessionError> {
    info!("🚀 启动浏览器...");
    debug!(
        "窗口: {}x{}, 无头: {}",
        options.window_width, options.window_height, options.headless
    );

    let mut builder = BrowserConfig::builder()
        .window_size(options.window_width, options.window_height)
        .request_timeout(Timing::ms(timing.script_timeout_ms))
        .args(QUIET_ARGS.iter().copied());

    if !options.headless {
        builder = builder.with_head();
    }
    if let Some(path) = &options.chrome_executable {
        builder = builder.chrome_executable(Path::new(path));
    }

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        SessionError::launch_failed(e)
    })?;

    let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        SessionError::launch_failed(e)
    })?;
    debug!("浏览器启动成功");

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 添加短暂延迟以等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        SessionError::launch_failed(e)
    })?;

    info!("✅ 浏览器已就绪");
    Ok((browser, page, handler_task))
}

/// 用 chromiumoxide 启动真实浏览器的会话工厂
#[derive(Debug, Clone, Default)]
pub struct ChromiumFactory;

#[async_trait]
impl SessionFactory for ChromiumFactory {
    type Session = ChromiumSession;

    async fn create(
        &self,
        options: &BrowserOptions,
        timing: &Timing,
    ) -> Result<ChromiumSession, SessionError> {
        let (browser, page, handler_task) = launch_browser(options, timing).await?;
        Ok(ChromiumSession::new(browser, page, handler_task, timing))
    }
}
