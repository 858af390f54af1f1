//! Socialize SDK - 社交分享 SDK 核心
//!
//! 本 crate 提供宿主应用嵌入 Socialize 时的核心能力：
//! - 🔁 初始化生命周期：容器构建、引用计数、幂等重入、按路径重建、销毁
//! - 🔐 认证编排：Socialize 原生、Facebook、Twitter 等可插拔 Provider
//! - 🧾 Session：后端身份 + 按 Provider 缓存的凭证
//! - ⚙️ 事件系统：生命周期与认证状态变化的广播
//!
//! UI 组件、第三方 HTTP 客户端和推送传输都在宿主侧实现，通过 trait 接入。
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use socialize_sdk::{
//!     AuthProviderType, ContainerBuilder, InitPaths, PlatformContext, SocializeOptions,
//!     SocializeService,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = SocializeOptions::builder()
//!         .consumer_key("my-key")
//!         .consumer_secret("my-secret")
//!         .build();
//!
//!     let service = SocializeService::builder()
//!         .options(options)
//!         .bean_source(
//!             "socialize_beans.xml",
//!             Arc::new(|_: &PlatformContext, _builder: &mut ContainerBuilder| -> socialize_sdk::Result<()> {
//!                 // 装配用户子系统、Provider 等
//!                 Ok(())
//!             }),
//!         )
//!         .build();
//!
//!     let context = PlatformContext::new("com.example.app");
//!     service
//!         .initialize(&context, Some(InitPaths::new(["socialize_beans.xml"])))
//!         .await;
//!
//!     service
//!         .authenticate(&context, AuthProviderType::Socialize, None, &[])
//!         .await;
//!
//!     service.destroy().await;
//! }
//! ```

pub mod asserter;
pub mod auth;
pub mod config;
pub mod container;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod listener;
pub mod notifications;
pub mod platform;
pub mod service;
pub mod version;

// 重新导出核心类型，方便使用
pub use asserter::{DefaultAsserter, InitializationAsserter};
pub use auth::{
    AuthProvider, AuthProviderInfo, AuthProviderRegistry, AuthProviderType, AuthRequest,
    FacebookAuthProvider, NativeCredentialCache, NoopCredentialCache, Session,
    SocializeAuthProvider, TwitterAuthProvider, UserIdentity, UserProviderCredentials, UserSystem,
};
pub use config::{Configuration, SocializeOptions, SocializeOptionsBuilder};
pub use container::{
    BeanSource, Container, ContainerBuilder, InitPaths, ManagedService, ResourceLocator,
};
pub use error::{Result, SocializeError};
pub use events::{EventBus, SocializeEvent};
pub use lifecycle::{LifecycleHook, LifecycleManager, LifecycleState};
pub use listener::{AuthListener, InitListener};
pub use notifications::{BroadcastIntent, IntentRoute, NotificationChecker, NotificationDispatcher};
pub use platform::{DisplayDensity, DisplayDensityChecker, PlatformChecker, PlatformContext};
pub use service::{
    CleanupFailure, CleanupReport, CleanupStage, SocializeService, SocializeServiceBuilder,
};
pub use version::{BUILD_TIME, GIT_SHA, SDK_VERSION};
