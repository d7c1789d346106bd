//! 工作流执行器 - 编排层
//!
//! 一次请求对应一次执行：校验请求 → 依次推进步骤 → 推送终态快照。
//!
//! 会话收尾策略：
//! - 任何步骤失败都关闭浏览器（批处理开始前只会因为会话、页面或读表失败）
//! - 成功时默认不关闭，把 `PortalDriver` 交给调用方留给操作员继续使用

use tracing::{error, info, warn};

use crate::browser::session::SessionFactory;
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::sheets_client::SheetsApi;
use crate::models::{AutomationRequest, StepId, ValidatedRequest, WorkflowKind, WorkflowState};
use crate::orchestrator::batch_processor::{select_orders, BatchProcessor};
use crate::orchestrator::step_machine::StepMachine;
use crate::progress::ProgressSender;
use crate::services::{PortalDriver, SheetGateway};
use crate::utils::logging::{log_orders_loaded, log_run_start};

/// 一次执行的结果
pub struct RunOutcome<F: SessionFactory> {
    /// 最后推送的快照
    pub final_state: WorkflowState,
    /// 成功后移交出来的浏览器会话
    pub driver: Option<PortalDriver<F>>,
}

impl<F: SessionFactory> RunOutcome<F> {
    pub fn succeeded(&self) -> bool {
        self.final_state.error.is_none()
    }
}

/// 工作流执行器
pub struct WorkflowRunner<F: SessionFactory, A: SheetsApi> {
    config: Config,
    kind: WorkflowKind,
    factory: F,
    gateway: SheetGateway<A>,
    machine: StepMachine,
}

impl<F: SessionFactory, A: SheetsApi> WorkflowRunner<F, A> {
    pub fn new(
        config: &Config,
        kind: WorkflowKind,
        factory: F,
        sheets: A,
        progress: ProgressSender,
    ) -> Self {
        Self {
            config: config.clone(),
            kind,
            factory,
            gateway: SheetGateway::new(sheets, &config.sheets),
            machine: StepMachine::new(kind, config, progress),
        }
    }

    pub async fn run(self, request: &AutomationRequest) -> RunOutcome<F> {
        let Self {
            config,
            kind,
            factory,
            gateway,
            mut machine,
        } = self;
        log_run_start(kind, &config);

        // 配置错误：不创建任何会话
        let validated = match request.validate(kind) {
            Ok(validated) => validated,
            Err(e) => {
                warn!("⚠️ 请求校验失败: {}", e);
                return RunOutcome {
                    final_state: machine.fail(e.to_string()),
                    driver: None,
                };
            }
        };

        let mut driver = PortalDriver::new(factory, &config);
        let mut steps = Steps {
            config: &config,
            kind,
            gateway: &gateway,
            machine: &mut machine,
            driver: &mut driver,
        };

        match steps.drive(&validated).await {
            Ok(()) => {
                let final_state = machine.snapshot();
                info!("🎉 自动化流程完成");
                if config.policy.close_on_success {
                    close_quietly(&mut driver).await;
                    return RunOutcome {
                        final_state,
                        driver: None,
                    };
                }
                info!("浏览器保持打开，交由操作员继续处理");
                RunOutcome {
                    final_state,
                    driver: Some(driver),
                }
            }
            Err(e) => {
                error!(
                    "❌ 步骤 {} 失败 [{:?}]: {}",
                    machine.current_step().map(|s| s.as_str()).unwrap_or("-"),
                    e.kind(),
                    e
                );
                let final_state = machine.fail(e.to_string());
                close_quietly(&mut driver).await;
                RunOutcome {
                    final_state,
                    driver: None,
                }
            }
        }
    }
}

async fn close_quietly<F: SessionFactory>(driver: &mut PortalDriver<F>) {
    if !driver.is_open() {
        return;
    }
    if let Err(e) = driver.close().await {
        warn!("⚠️ 关闭浏览器失败: {}", e);
    }
}

/// 一次执行期间借用的全部资源
struct Steps<'a, F: SessionFactory, A: SheetsApi> {
    config: &'a Config,
    kind: WorkflowKind,
    gateway: &'a SheetGateway<A>,
    machine: &'a mut StepMachine,
    driver: &'a mut PortalDriver<F>,
}

impl<F: SessionFactory, A: SheetsApi> Steps<'_, F, A> {
    async fn drive(&mut self, request: &ValidatedRequest) -> AppResult<()> {
        self.machine.start(StepId::Initialize)?;
        self.driver.initialize().await?;
        self.machine.complete()?;

        self.machine.start(StepId::Navigate)?;
        self.driver.navigate_to_login().await?;
        self.machine.complete()?;

        self.machine.start(StepId::Login)?;
        self.driver
            .login(&request.username, &request.password)
            .await?;
        self.machine.complete()?;

        self.machine.start(StepId::Facility)?;
        self.driver.select_facility().await?;
        self.machine.complete()?;

        if self.kind == WorkflowKind::OrderSync {
            self.sync_orders(request).await?;
        }

        self.machine.start(StepId::Complete)?;
        self.machine.finish()?;
        Ok(())
    }

    async fn sync_orders(&mut self, request: &ValidatedRequest) -> AppResult<()> {
        let sheet_url = request.sheet_url.as_deref().unwrap_or_default();

        self.machine.start(StepId::Inventory)?;
        self.driver.navigate_to_inventory_management().await?;
        self.machine.complete()?;

        self.machine.start(StepId::ManualItems)?;
        self.driver.navigate_to_manual_items().await?;
        self.machine.complete()?;

        self.machine.start(StepId::ReadSheet)?;
        let rows = self.gateway.read_all_orders(sheet_url).await?;
        let read = rows.len();
        let profile = &self.config.batch;
        let orders = select_orders(rows, &self.config.order_prefix, profile.cap);
        log_orders_loaded(read, orders.len(), &self.config.order_prefix, profile);
        self.machine.describe(
            StepId::ReadSheet,
            format!("Found {} {} orders", orders.len(), self.config.order_prefix),
        )?;
        self.machine.complete()?;

        self.machine.start(StepId::ProcessOrders)?;
        BatchProcessor::new(self.gateway, sheet_url, profile, &self.config.timing)
            .process(self.machine, self.driver, &orders)
            .await?;
        self.machine.complete()?;
        Ok(())
    }
}
