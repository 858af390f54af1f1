//! Socialize FFI - Foreign Function Interface for Socialize SDK
//!
//! This crate provides cross-language bindings for the Socialize SDK using UniFFI.
//! It generates bindings for:
//! - Kotlin (Android)
//! - Swift (iOS)
//!
//! # Architecture
//!
//! - 所有入口都是同步调用，内部在共享的 Tokio runtime 上 `block_on`
//! - 后端认证与平台凭证缓存由宿主通过 callback interface 实现
//! - 错误统一映射为 [`SocializeFfiError`]

#![allow(clippy::new_without_default)]

mod config;
mod error;
mod events;
mod helpers;
mod sdk;

// Re-export public types
pub use config::{AuthProviderKind, DisplayDensity, PlatformInfo, SdkConfig};
pub use error::SocializeFfiError;
pub use events::{
    AuthCallback, BackendAuthRequest, BackendAuthResult, BackendAuthenticator, BackendSession,
    CleanupSummary, CredentialCacheDelegate, InitCallback, ProviderCredentialsRecord, SessionInfo,
};
pub use helpers::init_logging;
pub use sdk::SocializeSdk;

// Setup UniFFI scaffolding for proc-macro mode
uniffi::setup_scaffolding!();

/// Get SDK version string
#[uniffi::export]
pub fn sdk_version() -> String {
    socialize_sdk::version::SDK_VERSION.to_string()
}

/// Get git commit SHA（用于日志、debug、上报）
#[uniffi::export]
pub fn git_sha() -> String {
    socialize_sdk::version::GIT_SHA.to_string()
}

/// Get build timestamp
#[uniffi::export]
pub fn build_time() -> String {
    socialize_sdk::version::BUILD_TIME.to_string()
}
