//! 日志初始化
//!
//! 安装 `tracing-subscriber` fmt 订阅器（`EnvFilter` 过滤），并把 `log` crate
//! 的记录桥接到 `tracing`。
//!
//! ```rust
//! grip_sdk::logging::init_logger();
//! tracing::info!("grasp controller starting");
//! ```

use tracing_log::LogTracer;
use tracing_subscriber::EnvFilter;

/// 默认过滤指令（`RUST_LOG` 存在时以其为准）
pub const DEFAULT_DIRECTIVE: &str = "grip=info";

/// 使用默认过滤指令初始化日志
///
/// # 返回
///
/// 本次调用是否成功安装了全局订阅器；已初始化过时返回 `false`（无副作用）
pub fn init_logger() -> bool {
    init_logger_with(DEFAULT_DIRECTIVE)
}

/// 使用指定的默认过滤指令初始化日志
pub fn init_logger_with(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }

    // 已有其他 logger 时保留原 logger
    let _ = LogTracer::init();
    true
}
