//! 门户驱动 - 业务能力层
//!
//! 持有一个浏览器会话，按固定顺序提供高层操作：
//! 打开登录页 → 登录 → 选择仓库 → 库存管理 → 手工物品 → 搜索订单。
//!
//! 门户自身的加载信号不可观测，所以每次导航都是"点击 + 固定沉降等待"，
//! 等待时长全部来自 `Timing` 配置。

use std::fmt;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::browser::locator::{resolve, wait_for, Locator, Wait};
use crate::browser::session::{BrowserSession, Scope, SessionFactory};
use crate::config::{Config, Timing};
use crate::error::{AppResult, DriverError, LocatorError, PortalError, SessionError};
use crate::models::OrderData;
use crate::services::selectors;

const NO_RESULTS: &str = "No results found";
const EXTRACTION_FAILED: &str = "No results found or error extracting data";

/// 读出结果行每个单元格的文本
async fn read_cells<S: BrowserSession>(session: &S, row: &S::Element) -> Result<Vec<String>, DriverError> {
    let cells = session
        .find_all(Scope::within(row, "result row"), &selectors::RESULT_CELL)
        .await?;
    let mut texts = Vec::with_capacity(cells.len());
    for cell in &cells {
        texts.push(session.text(cell).await?);
    }
    Ok(texts)
}

/// 驱动所处的阶段，按声明顺序推进
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PortalState {
    Uninitialized,
    SessionReady,
    OnLoginPage,
    Authenticated,
    FacilitySelected,
    InventoryOpen,
    ManualItemsOpen,
    SearchReady,
}

impl fmt::Display for PortalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 门户驱动
///
/// 职责：
/// - 独占一个会话，不与其他流程共享
/// - 每个界面操作都经过定位器解析
/// - 不认识表格和批处理
pub struct PortalDriver<F: SessionFactory> {
    factory: F,
    session: Option<F::Session>,
    state: PortalState,
    config: Config,
}

impl<F: SessionFactory> PortalDriver<F> {
    pub fn new(factory: F, config: &Config) -> Self {
        Self {
            factory,
            session: None,
            state: PortalState::Uninitialized,
            config: config.clone(),
        }
    }

    pub fn state(&self) -> PortalState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// 当前会话的引用
    pub fn session(&self) -> Result<&F::Session, SessionError> {
        self.session.as_ref().ok_or(SessionError::NotInitialized)
    }

    fn timing(&self) -> &Timing {
        &self.config.timing
    }

    fn wait(&self, timeout_ms: u64) -> Wait {
        Wait::from_ms(timeout_ms, self.timing())
    }

    /// 定位器的默认等待预算
    fn implicit(&self) -> Wait {
        self.wait(self.timing().implicit_wait_ms)
    }

    fn advance(&mut self, next: PortalState) {
        if next < self.state {
            warn!("门户状态回退: {} → {}", self.state, next);
        }
        debug!("门户状态: {} → {}", self.state, next);
        self.state = next;
    }

    async fn settle(&self, ms: u64) {
        if ms > 0 {
            sleep(Timing::ms(ms)).await;
        }
    }

    /// 滚动到可见位置后点击
    async fn scroll_and_click(&self, element: &<F::Session as BrowserSession>::Element) -> Result<(), DriverError> {
        let session = self.session().map_err(|_| DriverError::Closed)?;
        if let Err(e) = session.scroll_into_view(element).await {
            debug!("滚动到元素失败，直接点击: {}", e);
        }
        self.settle(self.timing().click_settle_ms).await;
        session.click(element).await
    }

    /// 启动浏览器会话
    pub async fn initialize(&mut self) -> AppResult<()> {
        if self.session.is_some() {
            return Err(SessionError::AlreadyInitialized.into());
        }

        let session = self
            .factory
            .create(&self.config.browser, &self.config.timing)
            .await?;
        self.session = Some(session);
        self.advance(PortalState::SessionReady);
        Ok(())
    }

    /// 打开登录页并等待账号输入框
    pub async fn navigate_to_login(&mut self) -> AppResult<()> {
        let url = self.config.login_url.clone();
        info!("正在打开门户登录页: {}", url);

        let session = self.session()?;
        session
            .navigate(&url)
            .await
            .map_err(|source| SessionError::NavigationFailed {
                url: url.clone(),
                source,
            })?;

        let wait = self.wait(self.timing().login_page_wait_ms);
        wait_for(session, Scope::Page, &selectors::LOGIN_EMAIL, wait)
            .await
            .map_err(|_| SessionError::LoginPageNotReady { url })?;

        self.advance(PortalState::OnLoginPage);
        Ok(())
    }

    /// 填写账号密码并提交，不校验登录是否成功
    pub async fn login(&mut self, username: &str, password: &str) -> AppResult<()> {
        info!("正在使用提供的账号登录...");
        let session = self.session()?;

        let wait = self.wait(self.timing().login_page_wait_ms);
        let email = wait_for(session, Scope::Page, &selectors::LOGIN_EMAIL, wait).await?;
        let pass = session.find(Scope::Page, &selectors::LOGIN_PASSWORD).await?;

        session.clear(&email).await?;
        session.type_text(&email, username).await?;
        session.clear(&pass).await?;
        session.type_text(&pass, password).await?;

        let submit = session.find(Scope::Page, &selectors::LOGIN_SUBMIT).await?;
        session.click(&submit).await?;

        info!("✓ 已提交登录表单");
        self.advance(PortalState::Authenticated);
        Ok(())
    }

    /// 在登录后的弹窗里选择目标仓库
    pub async fn select_facility(&mut self) -> AppResult<()> {
        let facility = self.config.facility.clone();
        info!("正在选择仓库 {}...", facility);

        self.try_select_facility(&facility)
            .await
            .map_err(|reason| PortalError::FacilitySelectionFailed { reason })?;

        info!("✓ 已选择仓库 {}", facility);
        self.advance(PortalState::FacilitySelected);
        Ok(())
    }

    async fn try_select_facility(&self, facility: &str) -> Result<(), String> {
        let session = self.session().map_err(|e| e.to_string())?;
        let timing = self.timing();

        self.settle(timing.post_login_settle_ms).await;

        wait_for(
            session,
            Scope::Page,
            &selectors::MODAL_ROOT,
            self.wait(timing.modal_wait_ms),
        )
        .await
        .map_err(|_| "Facility selection modal did not appear".to_string())?;

        let modal = resolve(session, Scope::Page, selectors::MODAL, self.implicit())
            .await
            .map_err(|_| "Facility selection modal not found".to_string())?
            .element;

        let dropdown = resolve(
            session,
            Scope::within(&modal, "facility modal"),
            selectors::FACILITY_DROPDOWN,
            self.implicit(),
        )
        .await
        .map_err(|_| "Facility dropdown not found in modal".to_string())?
        .element;

        debug!("点击仓库下拉框");
        self.scroll_and_click(&dropdown)
            .await
            .map_err(|e| format!("Could not open facility dropdown: {}", e))?;
        self.settle(timing.click_settle_ms).await;

        wait_for(
            session,
            Scope::Page,
            &selectors::OPTION_LIST,
            self.wait(timing.option_list_wait_ms),
        )
        .await
        .map_err(|_| "Facility option list did not appear".to_string())?;

        let option = resolve(
            session,
            Scope::Page,
            &selectors::facility_option(facility),
            self.implicit(),
        )
        .await
        .map_err(|_| format!("{} facility option not found in the dropdown", facility))?
        .element;

        if let Err(e) = session.scroll_into_view(&option).await {
            debug!("滚动到选项失败: {}", e);
        }
        self.settle(timing.option_settle_ms).await;
        session
            .click(&option)
            .await
            .map_err(|e| format!("Could not click {} option: {}", facility, e))?;
        self.settle(timing.click_settle_ms).await;
        Ok(())
    }

    /// 解析并点击一个导航入口，然后等待页面沉降
    async fn open_section(
        &self,
        section: &'static str,
        candidates: &[Locator],
        settle_before_ms: u64,
    ) -> AppResult<()> {
        info!("正在打开 {}...", section);
        let session = self.session()?;
        self.settle(settle_before_ms).await;

        let target = resolve(session, Scope::Page, candidates, self.implicit())
            .await
            .map_err(|source: LocatorError| PortalError::SectionNotFound { section, source })?;
        debug!("{} 命中第 {} 个定位器", section, target.index + 1);

        self.scroll_and_click(&target.element).await?;
        self.settle(self.timing().navigation_settle_ms).await;
        info!("✓ {} 已打开", section);
        Ok(())
    }

    pub async fn navigate_to_inventory_management(&mut self) -> AppResult<()> {
        let settle = self.timing().navigation_settle_ms;
        self.open_section("Inventory Management tab", selectors::INVENTORY_TAB, settle)
            .await?;
        self.advance(PortalState::InventoryOpen);
        Ok(())
    }

    /// 打开手工物品页；搜索框校验只是软检查，超时只记日志
    pub async fn navigate_to_manual_items(&mut self) -> AppResult<()> {
        self.open_section("Manual Items section", selectors::MANUAL_ITEMS, 0)
            .await?;

        let session = self.session()?;
        let wait = self.wait(self.timing().manual_items_verify_ms);
        match wait_for(session, Scope::Page, &selectors::MANUAL_ITEMS_READY, wait).await {
            Ok(_) => info!("✓ 手工物品页加载完成"),
            Err(e) => warn!("⚠️ 未确认到搜索框，继续执行: {}", e),
        }

        self.advance(PortalState::ManualItemsOpen);
        Ok(())
    }

    /// 搜索一个订单并提取第一行结果
    ///
    /// 没有结果行不算失败，返回带 `error` 的 `OrderData`。
    pub async fn search_order(&mut self, order_number: &str) -> AppResult<OrderData> {
        info!("🔍 搜索订单: {}", order_number);
        let session = self.session()?;
        let timing = self.timing();

        let input = resolve(session, Scope::Page, selectors::SEARCH_INPUT, self.implicit())
            .await
            .map_err(|source| PortalError::SearchInputNotFound { source })?
            .element;

        // 清空输入框：clear → 全选删除 → 回读确认，仍有内容再清一次
        session.clear(&input).await?;
        self.settle(timing.input_settle_ms).await;
        session.select_all_and_delete(&input).await?;
        self.settle(timing.key_settle_ms).await;
        let current = session.value(&input).await?.unwrap_or_default();
        if !current.trim().is_empty() {
            debug!("输入框仍有内容 \"{}\"，再次清空", current);
            session.clear(&input).await?;
            self.settle(timing.input_settle_ms).await;
        }

        session.type_text(&input, order_number).await?;
        self.settle(timing.type_settle_ms).await;

        let entered = session.value(&input).await?.unwrap_or_default();
        if entered != order_number {
            debug!("输入值不一致 \"{}\"，重新输入", entered);
            session.clear(&input).await?;
            self.settle(timing.input_settle_ms).await;
            session.type_text(&input, order_number).await?;
            self.settle(timing.retype_settle_ms).await;
        }

        match resolve(session, Scope::Page, selectors::SEARCH_BUTTON, self.implicit()).await {
            Ok(button) => {
                session.click(&button.element).await?;
                debug!("已点击搜索按钮");
            }
            Err(_) => {
                session.press_key(&input, "Enter").await?;
                debug!("未找到搜索按钮，改用回车搜索");
            }
        }

        self.settle(timing.search_settle_ms).await;
        let data = self.extract_order_data().await?;
        self.advance(PortalState::SearchReady);
        Ok(data)
    }

    /// 提取结果表第一行
    ///
    /// 没有结果行或读取单元格出错都返回带 `error` 的记录，不向上抛出。
    async fn extract_order_data(&self) -> AppResult<OrderData> {
        let session = self.session()?;
        let wait = self.wait(self.timing().result_wait_ms);

        if wait_for(session, Scope::Page, &selectors::RESULTS_TABLE, wait)
            .await
            .is_err()
        {
            info!("没有找到该订单的结果");
            return Ok(OrderData::absent(NO_RESULTS));
        }

        let row = match resolve(session, Scope::Page, selectors::RESULT_ROW, Wait::once()).await {
            Ok(found) => found.element,
            Err(_) => {
                info!("没有找到该订单的结果");
                return Ok(OrderData::absent(NO_RESULTS));
            }
        };

        let texts = match read_cells(session, &row).await {
            Ok(texts) => texts,
            Err(e) => {
                warn!("⚠️ 读取结果行失败: {}", e);
                return Ok(OrderData::absent(EXTRACTION_FAILED));
            }
        };
        debug!("结果行共 {} 列", texts.len());

        let data = OrderData::from_cells(&texts);
        info!(
            "提取结果: Code={}, Location={}, Customer={}",
            data.code, data.location, data.customer
        );
        Ok(data)
    }

    /// 释放会话，重复调用是空操作
    pub async fn close(&mut self) -> Result<(), DriverError> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        self.state = PortalState::Uninitialized;
        info!("正在关闭浏览器...");
        session.quit().await
    }
}
