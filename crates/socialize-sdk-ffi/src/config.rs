//! Configuration and platform records for FFI layer

use std::collections::HashMap;
use std::time::Duration;

use socialize_sdk::config::{
    DEFAULT_BEAN_PATH, FACEBOOK_APP_ID, NOTIFICATIONS_ENABLED, TWITTER_CONSUMER_KEY,
    TWITTER_CONSUMER_SECRET,
};
use socialize_sdk::{AuthProviderType, PlatformContext, SocializeOptions};

/// Facebook Provider 的 bean 配置
pub const FACEBOOK_BEAN_PATH: &str = "facebook_beans.xml";
/// Twitter Provider 的 bean 配置
pub const TWITTER_BEAN_PATH: &str = "twitter_beans.xml";

/// 认证 Provider 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum AuthProviderKind {
    Socialize,
    Facebook,
    Twitter,
}

impl From<AuthProviderKind> for AuthProviderType {
    fn from(kind: AuthProviderKind) -> Self {
        match kind {
            AuthProviderKind::Socialize => AuthProviderType::Socialize,
            AuthProviderKind::Facebook => AuthProviderType::Facebook,
            AuthProviderKind::Twitter => AuthProviderType::Twitter,
        }
    }
}

impl From<AuthProviderType> for AuthProviderKind {
    fn from(provider_type: AuthProviderType) -> Self {
        match provider_type {
            AuthProviderType::Socialize => AuthProviderKind::Socialize,
            AuthProviderType::Facebook => AuthProviderKind::Facebook,
            AuthProviderType::Twitter => AuthProviderKind::Twitter,
        }
    }
}

/// 屏幕密度
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum DisplayDensity {
    Low,
    Medium,
    High,
    ExtraHigh,
}

impl From<DisplayDensity> for socialize_sdk::DisplayDensity {
    fn from(density: DisplayDensity) -> Self {
        match density {
            DisplayDensity::Low => socialize_sdk::DisplayDensity::Low,
            DisplayDensity::Medium => socialize_sdk::DisplayDensity::Medium,
            DisplayDensity::High => socialize_sdk::DisplayDensity::High,
            DisplayDensity::ExtraHigh => socialize_sdk::DisplayDensity::ExtraHigh,
        }
    }
}

/// 宿主平台信息
#[derive(Debug, Clone, uniffi::Record)]
pub struct PlatformInfo {
    pub package_name: String,
    pub app_name: Option<String>,
    pub density: DisplayDensity,
    pub permissions: Vec<String>,
}

impl PlatformInfo {
    pub fn to_context(&self) -> PlatformContext {
        let mut context = PlatformContext::new(self.package_name.clone()).with_density(self.density.into());
        if let Some(app_name) = self.app_name.as_ref() {
            context = context.with_app_name(app_name.clone());
        }
        for permission in &self.permissions {
            context = context.with_permission(permission.clone());
        }
        context
    }
}

/// SDK 配置
#[derive(Debug, Clone, uniffi::Record)]
pub struct SdkConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub facebook_app_id: Option<String>,
    pub twitter_consumer_key: Option<String>,
    pub twitter_consumer_secret: Option<String>,
    pub notifications_enabled: bool,
    /// 为空时按已配置的第三方 Provider 推导
    pub default_bean_paths: Vec<String>,
    /// 销毁时等待后台任务的上限（秒），0 使用默认值
    pub teardown_timeout_secs: u64,
    pub debug_mode: bool,
    pub extra_properties: HashMap<String, String>,
}

impl SdkConfig {
    pub fn to_options(&self) -> SocializeOptions {
        let mut builder = SocializeOptions::builder()
            .consumer_key(self.consumer_key.clone())
            .consumer_secret(self.consumer_secret.clone())
            .debug_mode(self.debug_mode)
            .property(NOTIFICATIONS_ENABLED, self.notifications_enabled.to_string());

        builder = builder.default_bean_paths(self.bean_paths());
        if self.teardown_timeout_secs > 0 {
            builder = builder.teardown_timeout(Duration::from_secs(self.teardown_timeout_secs));
        }
        if let Some(app_id) = self.facebook_app_id.as_ref() {
            builder = builder.property(FACEBOOK_APP_ID, app_id.clone());
        }
        if let Some(key) = self.twitter_consumer_key.as_ref() {
            builder = builder.property(TWITTER_CONSUMER_KEY, key.clone());
        }
        if let Some(secret) = self.twitter_consumer_secret.as_ref() {
            builder = builder.property(TWITTER_CONSUMER_SECRET, secret.clone());
        }
        for (key, value) in &self.extra_properties {
            builder = builder.property(key.clone(), value.clone());
        }
        builder.build()
    }

    /// 默认初始化路径：显式给出的路径，或核心配置加上已配置的第三方 Provider
    pub fn bean_paths(&self) -> Vec<String> {
        if !self.default_bean_paths.is_empty() {
            return self.default_bean_paths.clone();
        }

        let mut paths = vec![DEFAULT_BEAN_PATH.to_string()];
        if non_empty(&self.facebook_app_id) {
            paths.push(FACEBOOK_BEAN_PATH.to_string());
        }
        if non_empty(&self.twitter_consumer_key) && non_empty(&self.twitter_consumer_secret) {
            paths.push(TWITTER_BEAN_PATH.to_string());
        }
        paths
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}
