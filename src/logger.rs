//! 日志初始化

use tracing_subscriber::{fmt, EnvFilter};

/// 安装全局日志订阅器
///
/// 默认级别 `info`，`verbose` 时为 `debug`；设置了 `RUST_LOG` 时以它为准。
/// 重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},chromiumoxide=warn", default_level)));

    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
