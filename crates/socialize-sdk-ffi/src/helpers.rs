//! Helper utilities for FFI layer

/// Get the tokio runtime handle
///
/// This ensures we have a runtime for async operations
pub fn get_runtime() -> &'static tokio::runtime::Runtime {
    use std::sync::OnceLock;
    static RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .thread_name("socialize-sdk")
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime")
    })
}

/// 安装全局日志输出，重复调用无效果
///
/// `RUST_LOG` 优先；未设置时 debug 模式输出 debug 级别，否则 info。
#[uniffi::export]
pub fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
    {
        tracing::info!("🔧 Socialize 日志已启用 (level={})", default_level);
    }
}
