//! 测试替身：内存中的门户页面和内存表格

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::browser::locator::Locator;
use crate::browser::session::{BrowserSession, Scope, SessionFactory};
use crate::config::{BrowserOptions, Config, Timing};
use crate::error::{DriverError, SessionError, SheetError};
use crate::infrastructure::sheets_client::{CellRef, SheetsApi};
use crate::services::selectors;

pub type NodeId = usize;

/// 测试用配置：零等待、本地登录地址
pub fn test_config() -> Config {
    Config {
        login_url: "https://portal.test/login".to_string(),
        timing: Timing::immediate(),
        ..Config::default()
    }
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    locators: Vec<Locator>,
    text: String,
    value: String,
    removed: bool,
}

#[derive(Debug, Default)]
struct PortalInner {
    nodes: Vec<Node>,
    attempts: Vec<String>,
    clicks: Vec<String>,
    keys: Vec<String>,
    navigations: Vec<String>,
    results: HashMap<String, Vec<String>>,
    failing_searches: HashSet<String>,
    input_log: Vec<String>,
    clear_residue: Option<String>,
    garble_next_type: bool,
    fail_text_reads: bool,
    sessions_created: usize,
    quit_count: usize,
}

impl PortalInner {
    fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = self.nodes[node].parent;
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes[id].parent;
        }
        false
    }

    fn matches(&self, scope: Scope<'_, NodeId>, locator: &Locator) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.removed && n.locators.contains(locator))
            .filter(|(id, _)| match scope {
                Scope::Page => true,
                Scope::Within { element, .. } => self.is_descendant(*id, *element),
            })
            .map(|(id, _)| id)
            .collect()
    }

    fn add(&mut self, name: &str, parent: Option<NodeId>, locators: &[Locator], text: &str) -> NodeId {
        self.nodes.push(Node {
            name: name.to_string(),
            parent,
            locators: locators.to_vec(),
            text: text.to_string(),
            value: String::new(),
            removed: false,
        });
        self.nodes.len() - 1
    }

    fn remove(&mut self, name: &str) {
        for node in self.nodes.iter_mut().filter(|n| n.name == name) {
            node.removed = true;
        }
    }

    fn live(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name && !n.removed)
    }

    /// 模拟点击搜索：用输入框当前值重建结果表
    fn run_search(&mut self) -> Result<(), DriverError> {
        for name in ["results-table", "result-row", "result-cell"] {
            self.remove(name);
        }
        let query = self
            .live("search-input")
            .map(|n| n.value.clone())
            .unwrap_or_default();

        if self.failing_searches.contains(&query) {
            return Err(DriverError::Protocol(
                format!("portal crashed while searching {}", query).into(),
            ));
        }

        if let Some(cells) = self.results.get(&query).cloned() {
            let table = self.add("results-table", None, &[selectors::RESULTS_TABLE], "");
            let row = self.add("result-row", Some(table), &selectors::RESULT_ROW[..1], "");
            for text in cells {
                self.add("result-cell", Some(row), &[selectors::RESULT_CELL], &text);
            }
        }
        Ok(())
    }
}

/// 内存中的门户页面，克隆后共享同一份状态
#[derive(Debug, Clone, Default)]
pub struct FakePortal {
    inner: Arc<Mutex<PortalInner>>,
}

impl FakePortal {
    /// 空页面
    pub fn new() -> Self {
        Self::default()
    }

    /// 带有完整门户结构的页面，仓库为 YYZ5
    pub fn standard() -> Self {
        let portal = Self::new();
        portal.add_node("email", None, &[selectors::LOGIN_EMAIL]);
        portal.add_node("password", None, &[selectors::LOGIN_PASSWORD]);
        portal.add_node("submit", None, &[selectors::LOGIN_SUBMIT]);
        portal.add_node("modal-root", None, &[selectors::MODAL_ROOT]);
        let modal = portal.add_node("modal", None, &selectors::MODAL[..1]);
        portal.add_node("dropdown", Some(modal), &selectors::FACILITY_DROPDOWN[..1]);
        portal.add_node("option-list", None, &[selectors::OPTION_LIST]);
        portal.add_node("facility-option", None, &selectors::facility_option("YYZ5")[..1]);
        portal.add_node("inventory-tab", None, &selectors::INVENTORY_TAB[..1]);
        portal.add_node("manual-items", None, &selectors::MANUAL_ITEMS[..1]);
        portal.add_node(
            "search-input",
            None,
            &[selectors::SEARCH_INPUT[0].clone(), selectors::MANUAL_ITEMS_READY],
        );
        portal.add_node("search-button", None, &selectors::SEARCH_BUTTON[..1]);
        portal
    }

    fn lock(&self) -> MutexGuard<'_, PortalInner> {
        self.inner.lock().unwrap()
    }

    pub fn add_node(&self, name: &str, parent: Option<NodeId>, locators: &[Locator]) -> NodeId {
        self.lock().add(name, parent, locators, "")
    }

    pub fn remove_node(&self, name: &str) {
        self.lock().remove(name);
    }

    pub fn node_name(&self, id: NodeId) -> String {
        self.lock().nodes[id].name.clone()
    }

    pub fn value_of(&self, name: &str) -> String {
        self.lock().live(name).map(|n| n.value.clone()).unwrap_or_default()
    }

    /// 登记一个订单的搜索结果行
    pub fn set_result(&self, order_number: &str, cells: &[&str]) {
        self.lock().results.insert(
            order_number.to_string(),
            cells.iter().map(|c| c.to_string()).collect(),
        );
    }

    /// 搜索这个订单时门户报错
    pub fn fail_search(&self, order_number: &str) {
        self.lock().failing_searches.insert(order_number.to_string());
    }

    /// 下一次全选删除后输入框里留下这段文本
    pub fn leave_residue_once(&self, residue: &str) {
        self.lock().clear_residue = Some(residue.to_string());
    }

    /// 下一次输入丢掉最后一个字符
    pub fn garble_next_type(&self) {
        self.lock().garble_next_type = true;
    }

    /// 读取元素文本总是失败
    pub fn fail_text_reads(&self) {
        self.lock().fail_text_reads = true;
    }

    /// 对输入框的操作记录，形如 `clear:search-input`、`type:search-input=...`
    pub fn input_log(&self, name: &str) -> Vec<String> {
        let suffix = format!(":{}", name);
        self.lock()
            .input_log
            .iter()
            .filter(|entry| entry.contains(&suffix))
            .cloned()
            .collect()
    }

    pub fn attempts(&self) -> Vec<String> {
        self.lock().attempts.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.lock().clicks.clone()
    }

    pub fn keys_pressed(&self) -> Vec<String> {
        self.lock().keys.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.lock().navigations.clone()
    }

    pub fn sessions_created(&self) -> usize {
        self.lock().sessions_created
    }

    pub fn quit_count(&self) -> usize {
        self.lock().quit_count
    }
}

#[async_trait]
impl BrowserSession for FakePortal {
    type Element = NodeId;

    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.lock().navigations.push(url.to_string());
        Ok(())
    }

    async fn find(&self, scope: Scope<'_, NodeId>, locator: &Locator) -> Result<NodeId, DriverError> {
        let mut inner = self.lock();
        inner.attempts.push(locator.to_string());
        inner
            .matches(scope, locator)
            .first()
            .copied()
            .ok_or_else(|| DriverError::NoSuchElement {
                locator: locator.to_string(),
            })
    }

    async fn find_all(
        &self,
        scope: Scope<'_, NodeId>,
        locator: &Locator,
    ) -> Result<Vec<NodeId>, DriverError> {
        let mut inner = self.lock();
        inner.attempts.push(locator.to_string());
        Ok(inner.matches(scope, locator))
    }

    async fn click(&self, element: &NodeId) -> Result<(), DriverError> {
        let mut inner = self.lock();
        let name = inner.nodes[*element].name.clone();
        inner.clicks.push(name.clone());
        if name == "search-button" {
            inner.run_search()?;
        }
        Ok(())
    }

    async fn clear(&self, element: &NodeId) -> Result<(), DriverError> {
        let mut inner = self.lock();
        let entry = format!("clear:{}", inner.nodes[*element].name);
        inner.input_log.push(entry);
        inner.nodes[*element].value.clear();
        Ok(())
    }

    async fn select_all_and_delete(&self, element: &NodeId) -> Result<(), DriverError> {
        let mut inner = self.lock();
        let entry = format!("select-all-delete:{}", inner.nodes[*element].name);
        inner.input_log.push(entry);
        let residue = inner.clear_residue.take().unwrap_or_default();
        inner.nodes[*element].value = residue;
        Ok(())
    }

    async fn type_text(&self, element: &NodeId, text: &str) -> Result<(), DriverError> {
        let mut inner = self.lock();
        let entry = format!("type:{}={}", inner.nodes[*element].name, text);
        inner.input_log.push(entry);
        let mut typed = text.to_string();
        if std::mem::take(&mut inner.garble_next_type) {
            typed.pop();
        }
        inner.nodes[*element].value.push_str(&typed);
        Ok(())
    }

    async fn press_key(&self, element: &NodeId, key: &str) -> Result<(), DriverError> {
        let mut inner = self.lock();
        inner.keys.push(key.to_string());
        if key == "Enter" && inner.nodes[*element].name == "search-input" {
            inner.run_search()?;
        }
        Ok(())
    }

    async fn value(&self, element: &NodeId) -> Result<Option<String>, DriverError> {
        Ok(Some(self.lock().nodes[*element].value.clone()))
    }

    async fn text(&self, element: &NodeId) -> Result<String, DriverError> {
        let inner = self.lock();
        if inner.fail_text_reads {
            return Err(DriverError::Closed);
        }
        Ok(inner.nodes[*element].text.clone())
    }

    async fn scroll_into_view(&self, _element: &NodeId) -> Result<(), DriverError> {
        Ok(())
    }

    async fn run_script(&self, _script: &str) -> Result<JsonValue, DriverError> {
        Ok(JsonValue::Null)
    }

    async fn quit(&self) -> Result<(), DriverError> {
        self.lock().quit_count += 1;
        Ok(())
    }
}

/// 每次创建都返回同一个内存门户
#[derive(Debug, Clone)]
pub struct FakeFactory {
    portal: FakePortal,
    fail_launch: bool,
}

impl FakeFactory {
    pub fn new(portal: FakePortal) -> Self {
        Self {
            portal,
            fail_launch: false,
        }
    }

    /// 启动浏览器总是失败
    pub fn failing(portal: FakePortal) -> Self {
        Self {
            portal,
            fail_launch: true,
        }
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    type Session = FakePortal;

    async fn create(&self, _options: &BrowserOptions, _timing: &Timing) -> Result<FakePortal, SessionError> {
        if self.fail_launch {
            return Err(SessionError::launch_failed("chrome not found"));
        }
        self.portal.lock().sessions_created += 1;
        Ok(self.portal.clone())
    }
}

#[derive(Debug, Default)]
struct SheetsInner {
    sheets: Vec<(String, Vec<Vec<String>>)>,
    reads: Vec<String>,
    writes: Vec<(String, String)>,
    fail_writes: bool,
}

impl SheetsInner {
    fn grid_mut(&mut self, title: &str) -> Result<&mut Vec<Vec<String>>, SheetError> {
        self.sheets
            .iter_mut()
            .find(|(t, _)| t == title)
            .map(|(_, grid)| grid)
            .ok_or(SheetError::NoWorksheets)
    }
}

fn owned_row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

/// 内存表格，克隆后共享同一份数据
#[derive(Debug, Clone, Default)]
pub struct InMemorySheets {
    inner: Arc<Mutex<SheetsInner>>,
}

impl InMemorySheets {
    pub fn with_sheet(title: &str, rows: &[Vec<&str>]) -> Self {
        let sheets = Self::default();
        sheets.add_sheet(title, rows);
        sheets
    }

    fn lock(&self) -> MutexGuard<'_, SheetsInner> {
        self.inner.lock().unwrap()
    }

    pub fn add_sheet(&self, title: &str, rows: &[Vec<&str>]) {
        let grid = rows.iter().map(|r| owned_row(r)).collect();
        self.lock().sheets.push((title.to_string(), grid));
    }

    pub fn insert_row(&self, title: &str, index: usize, cells: &[&str]) {
        let mut inner = self.lock();
        let grid = inner.grid_mut(title).unwrap();
        grid.insert(index, owned_row(cells));
    }

    /// 所有写入失败
    pub fn fail_writes(&self) {
        self.lock().fail_writes = true;
    }

    pub fn cell(&self, title: &str, a1_row: usize, column: usize) -> String {
        let mut inner = self.lock();
        let grid = inner.grid_mut(title).unwrap();
        grid.get(a1_row)
            .and_then(|r| r.get(column))
            .cloned()
            .unwrap_or_default()
    }

    /// 读取过的工作表标题
    pub fn reads(&self) -> Vec<String> {
        self.lock().reads.clone()
    }

    /// (A1 地址, 值)
    pub fn writes(&self) -> Vec<(String, String)> {
        self.lock().writes.clone()
    }
}

#[async_trait]
impl SheetsApi for InMemorySheets {
    async fn sheet_titles(&self, _spreadsheet_id: &str) -> Result<Vec<String>, SheetError> {
        Ok(self.lock().sheets.iter().map(|(t, _)| t.clone()).collect())
    }

    async fn read_rows(
        &self,
        _spreadsheet_id: &str,
        sheet: &str,
        _range: &str,
    ) -> Result<Vec<Vec<String>>, SheetError> {
        let mut inner = self.lock();
        inner.reads.push(sheet.to_string());
        Ok(inner.grid_mut(sheet)?.clone())
    }

    async fn write_cell(
        &self,
        _spreadsheet_id: &str,
        sheet: &str,
        cell: CellRef,
        value: &str,
    ) -> Result<(), SheetError> {
        let mut inner = self.lock();
        inner.writes.push((cell.a1(), value.to_string()));
        if inner.fail_writes {
            return Err(SheetError::BadResponse {
                endpoint: format!("{}!{}", sheet, cell.a1()),
                status: 500,
                body: "backend error".to_string(),
            });
        }

        let grid = inner.grid_mut(sheet)?;
        if grid.len() <= cell.row {
            grid.resize(cell.row + 1, Vec::new());
        }
        let row = &mut grid[cell.row];
        if row.len() <= cell.column {
            row.resize(cell.column + 1, String::new());
        }
        row[cell.column] = value.to_string();
        Ok(())
    }
}
