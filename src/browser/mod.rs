//! 浏览器能力层
//!
//! - `session` - 会话与会话工厂的能力边界
//! - `locator` - 定位器与按优先级解析
//! - `launch` - 用 chromiumoxide 启动真实浏览器

pub mod launch;
pub mod locator;
pub mod session;

pub use launch::{launch_browser, ChromiumFactory};
pub use locator::{resolve, wait_for, Locator, Resolution, Wait};
pub use session::{BrowserSession, Scope, SessionFactory};
