//! 基础设施层：持有外部资源，只暴露能力

pub mod chromium_session;
pub mod sheets_client;

pub use chromium_session::ChromiumSession;
pub use sheets_client::{CellRef, GoogleSheetsClient, SheetsApi};
