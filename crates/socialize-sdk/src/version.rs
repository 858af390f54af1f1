//! SDK 版本与运行时元信息
//!
//! - **SDK Version** → Cargo.toml（唯一权威源）
//! - **Build Metadata** → build.rs 通过 vergen 生成

/// SDK semver，来自 Cargo.toml
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// git commit（由 vergen 在 build.rs 中生成）
pub const GIT_SHA: &str = or_unknown(option_env!("VERGEN_GIT_SHA"));

/// build time（由 vergen 在 build.rs 中生成）
pub const BUILD_TIME: &str = or_unknown(option_env!("VERGEN_BUILD_TIMESTAMP"));

const fn or_unknown(value: Option<&'static str>) -> &'static str {
    match value {
        Some(v) => v,
        None => "unknown",
    }
}

/// 用于日志的单行版本描述
pub fn version_line() -> String {
    format!("socialize-sdk {} ({}, built {})", SDK_VERSION, GIT_SHA, BUILD_TIME)
}
