//! HTTP 接口
//!
//! - `POST /api/providence-automation`：完整的订单库位同步
//! - `POST /api/facility-selection`：只登录并选择仓库
//! - `GET /health`
//!
//! 两个工作流接口都以 `text/event-stream` 返回，每帧一份完整快照。
//! 成功后移交出来的浏览器会话保存在服务端，直到服务关闭。

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::Stream;
use serde_json::{json, Value as JsonValue};
use tokio::sync::Mutex;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};

use crate::browser::session::SessionFactory;
use crate::config::Config;
use crate::infrastructure::sheets_client::SheetsApi;
use crate::models::{AutomationRequest, WorkflowKind};
use crate::orchestrator::WorkflowRunner;
use crate::progress::progress_channel;
use crate::services::PortalDriver;

/// 服务端共享状态
pub struct AppState<F: SessionFactory, A: SheetsApi> {
    config: Config,
    factory: F,
    sheets: A,
    handed_over: Mutex<Vec<PortalDriver<F>>>,
}

impl<F, A> AppState<F, A>
where
    F: SessionFactory + Clone + 'static,
    A: SheetsApi + Clone + 'static,
{
    pub fn new(config: Config, factory: F, sheets: A) -> Arc<Self> {
        Arc::new(Self {
            config,
            factory,
            sheets,
            handed_over: Mutex::new(Vec::new()),
        })
    }

    /// 当前保持打开的浏览器会话数
    pub async fn handed_over(&self) -> usize {
        self.handed_over.lock().await.len()
    }

    /// 关闭所有移交出来的会话
    pub async fn close_all(&self) {
        let drivers: Vec<_> = self.handed_over.lock().await.drain(..).collect();
        for mut driver in drivers {
            if let Err(e) = driver.close().await {
                warn!("⚠️ 关闭浏览器失败: {}", e);
            }
        }
    }

    /// 启动一次工作流，返回进度事件流
    fn start(
        self: Arc<Self>,
        kind: WorkflowKind,
        request: AutomationRequest,
    ) -> impl Stream<Item = Result<Event, axum::Error>> {
        let (tx, rx) = progress_channel();
        // 移交完成前保持事件流不结束
        let hold = tx.clone();
        let runner = WorkflowRunner::new(
            &self.config,
            kind,
            self.factory.clone(),
            self.sheets.clone(),
            tx,
        );

        tokio::spawn(async move {
            let outcome = runner.run(&request).await;
            if let Some(driver) = outcome.driver {
                let mut drivers = self.handed_over.lock().await;
                drivers.push(driver);
                info!("浏览器会话已移交，当前保持打开 {} 个", drivers.len());
            }
            drop(hold);
        });

        UnboundedReceiverStream::new(rx).map(|state| Event::default().json_data(state))
    }
}

/// 构建路由
pub fn router<F, A>(state: Arc<AppState<F, A>>) -> Router
where
    F: SessionFactory + Clone + 'static,
    A: SheetsApi + Clone + 'static,
{
    Router::new()
        .route("/health", get(health::<F, A>))
        .route("/api/providence-automation", post(order_sync::<F, A>))
        .route("/api/facility-selection", post(facility_selection::<F, A>))
        .with_state(state)
}

async fn health<F, A>(State(state): State<Arc<AppState<F, A>>>) -> Json<JsonValue>
where
    F: SessionFactory + Clone + 'static,
    A: SheetsApi + Clone + 'static,
{
    Json(json!({
        "status": "ok",
        "handedOver": state.handed_over().await,
    }))
}

async fn order_sync<F, A>(
    State(state): State<Arc<AppState<F, A>>>,
    Json(request): Json<AutomationRequest>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>>
where
    F: SessionFactory + Clone + 'static,
    A: SheetsApi + Clone + 'static,
{
    info!("📨 收到订单同步请求");
    Sse::new(state.start(WorkflowKind::OrderSync, request)).keep_alive(KeepAlive::new())
}

async fn facility_selection<F, A>(
    State(state): State<Arc<AppState<F, A>>>,
    Json(request): Json<AutomationRequest>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>>
where
    F: SessionFactory + Clone + 'static,
    A: SheetsApi + Clone + 'static,
{
    info!("📨 收到仓库选择请求");
    Sse::new(state.start(WorkflowKind::FacilityOnly, request)).keep_alive(KeepAlive::new())
}

/// 监听并服务，直到收到 Ctrl+C
pub async fn serve<F, A>(state: Arc<AppState<F, A>>) -> std::io::Result<()>
where
    F: SessionFactory + Clone + 'static,
    A: SheetsApi + Clone + 'static,
{
    let listener = tokio::net::TcpListener::bind(&state.config.bind_addr).await?;
    info!("🌐 服务已启动: http://{}", listener.local_addr()?);

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("正在关闭移交出来的浏览器...");
    state.close_all().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("⚠️ 无法监听 Ctrl+C: {}", e);
        std::future::pending::<Infallible>().await;
    }
}
