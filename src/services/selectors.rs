//! 门户页面的定位器表
//!
//! 每组按优先级从高到低排列，页面改版时只需要改这里。

use crate::browser::locator::{xpath_literal, Locator};

pub const LOGIN_EMAIL: Locator = Locator::css("#normal_login_email");
pub const LOGIN_PASSWORD: Locator = Locator::css("#normal_login_password");
pub const LOGIN_SUBMIT: Locator = Locator::css("button[type=\"submit\"]");

/// 仓库选择弹窗出现的标志
pub const MODAL_ROOT: Locator = Locator::css(".ant-modal-root, .ant-modal");

pub const MODAL: &[Locator] = &[
    Locator::css(".ant-modal-content"),
    Locator::css(".ant-modal-body"),
    Locator::css("[role=\"dialog\"]"),
];

/// 弹窗内的仓库下拉框
pub const FACILITY_DROPDOWN: &[Locator] = &[
    Locator::css(".ant-select"),
    Locator::css(".ant-select-selector"),
    Locator::css("[role=\"combobox\"]"),
    Locator::css(".ant-select-selection-search-input"),
];

/// 下拉选项列表出现的标志
pub const OPTION_LIST: Locator = Locator::css(".ant-select-dropdown, .rc-virtual-list");

/// 目标仓库选项，最后一项是不限类名的文本兜底
pub fn facility_option(facility: &str) -> Vec<Locator> {
    let lit = xpath_literal(facility);
    vec![
        Locator::xpath_owned(format!("//div[@title={}]", lit)),
        Locator::xpath_owned(format!(
            "//div[contains(@class, 'ant-select-item') and contains(text(), {})]",
            lit
        )),
        Locator::xpath_owned(format!(
            "//div[contains(@class, 'ant-select-item-option') and contains(text(), {})]",
            lit
        )),
        Locator::xpath_owned(format!(
            "//*[contains(text(), {}) and contains(@class, 'ant-select-item')]",
            lit
        )),
        Locator::xpath_owned(format!("//div[@role='option' and contains(text(), {})]", lit)),
        Locator::text(facility),
    ]
}

pub const INVENTORY_TAB: &[Locator] = &[
    Locator::css("[role=\"tab\"][aria-controls*=\"Inventory\"]"),
    Locator::css("[data-node-key=\"Inventory Management\"]"),
    Locator::xpath("//div[@role=\"tab\" and contains(text(), \"Inventory Management\")]"),
    Locator::xpath("//div[contains(@class, \"ant-tabs-tab\") and contains(text(), \"Inventory Management\")]"),
    Locator::css("[aria-labelledby*=\"Inventory Management\"]"),
];

pub const MANUAL_ITEMS: &[Locator] = &[
    Locator::xpath("//div[contains(@class, \"sc-eldPxv\") and contains(text(), \"MANUAL ITEMS\")]"),
    Locator::xpath("//div[contains(text(), \"MANUAL ITEMS\")]"),
    Locator::css("[data-testid=\"manual-items\"]"),
    Locator::css(".manual-items-card"),
    Locator::xpath("//div[contains(@class, \"ant-col\") and .//div[contains(text(), \"MANUAL\")]]"),
    Locator::xpath("//div[contains(@class, \"card\") and contains(text(), \"MANUAL\")]"),
];

/// 手工物品页加载完成的软校验
pub const MANUAL_ITEMS_READY: Locator =
    Locator::css("input[placeholder*=\"Search\"], input[placeholder*=\"search\"]");

pub const SEARCH_INPUT: &[Locator] = &[
    Locator::css("input[placeholder*=\"Search code, order #, organization, customer\"]"),
    Locator::css("input.ant-input.ant-input-lg.css-43bhvr"),
    Locator::css("input[autocapitalize=\"off\"][type=\"search\"]"),
    Locator::css(".ant-input-search input"),
    Locator::css("input[placeholder*=\"search\"]"),
    Locator::css("input[type=\"search\"]"),
];

pub const SEARCH_BUTTON: &[Locator] = &[
    Locator::css("button.ant-btn.css-43bhvr.ant-btn-default.ant-btn-color-default.ant-btn-variant-outlined.ant-btn-lg.ant-btn-icon-only.ant-input-search-button"),
    Locator::css(".ant-input-search-button"),
    Locator::css(".ant-input-group-addon button"),
    Locator::css("button[type=\"button\"][class*=\"search-button\"]"),
    Locator::css("span.ant-input-group-addon button"),
];

/// 结果表格出现的标志
pub const RESULTS_TABLE: Locator = Locator::css("table, .ant-table-tbody, .ant-table-row");

pub const RESULT_ROW: &[Locator] = &[
    Locator::css("table tbody tr:first-child"),
    Locator::css(".ant-table-tbody tr:first-child"),
    Locator::css("tr.ant-table-row"),
];

pub const RESULT_CELL: Locator = Locator::css("td");
