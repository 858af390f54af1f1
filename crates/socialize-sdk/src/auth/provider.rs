//! 认证 Provider 抽象与注册表

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Configuration;
use crate::error::{Result, SocializeError};
use crate::platform::PlatformContext;

/// 认证 Provider 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProviderType {
    /// Socialize 原生认证
    Socialize,
    Facebook,
    Twitter,
}

impl AuthProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProviderType::Socialize => "socialize",
            AuthProviderType::Facebook => "facebook",
            AuthProviderType::Twitter => "twitter",
        }
    }

    /// 是否第三方 Provider
    pub fn is_third_party(&self) -> bool {
        !matches!(self, AuthProviderType::Socialize)
    }
}

impl fmt::Display for AuthProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthProviderType {
    type Err = SocializeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "socialize" => Ok(AuthProviderType::Socialize),
            "facebook" => Ok(AuthProviderType::Facebook),
            "twitter" => Ok(AuthProviderType::Twitter),
            other => Err(SocializeError::Config(format!("未知的认证 Provider: {}", other))),
        }
    }
}

/// 认证请求对象（由 Provider 根据配置和权限构造）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProviderInfo {
    pub provider_type: AuthProviderType,
    pub app_id: Option<String>,
    pub permissions: Vec<String>,
}

impl AuthProviderInfo {
    pub fn new(provider_type: AuthProviderType) -> Self {
        Self {
            provider_type,
            app_id: None,
            permissions: Vec::new(),
        }
    }

    pub fn with_app_id<S: Into<String>>(mut self, app_id: S) -> Self {
        self.app_id = Some(app_id.into());
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }
}

/// 可插拔的认证策略
#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn provider_type(&self) -> AuthProviderType;

    /// 构造认证请求对象
    fn provider_info(
        &self,
        config: &Configuration,
        permissions: &[String],
    ) -> Result<AuthProviderInfo>;

    /// 校验 Provider 所需配置，缺失时返回 `Validation`
    fn validate(&self, _config: &Configuration) -> Result<()> {
        Ok(())
    }

    /// 清除 Provider 在平台侧缓存的凭证
    async fn clear_cache(&self, context: &PlatformContext, info: &AuthProviderInfo) -> Result<()>;

    /// 宿主从暂停中恢复时调用（例如延长 access token）
    async fn refresh(&self, _context: &PlatformContext) -> Result<()> {
        Ok(())
    }
}

/// Provider 注册表
#[derive(Clone, Default)]
pub struct AuthProviderRegistry {
    providers: HashMap<AuthProviderType, Arc<dyn AuthProvider>>,
}

impl AuthProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 Provider，同类型的旧 Provider 被替换
    pub fn register(&mut self, provider: Arc<dyn AuthProvider>) {
        let provider_type = provider.provider_type();
        if self.providers.insert(provider_type, provider).is_some() {
            debug!("认证 Provider 已替换: {}", provider_type);
        } else {
            info!("✅ 认证 Provider 已注册: {}", provider_type);
        }
    }

    pub fn get(&self, provider_type: AuthProviderType) -> Option<Arc<dyn AuthProvider>> {
        self.providers.get(&provider_type).cloned()
    }

    /// 查找 Provider，未注册时返回 `UnsupportedProvider`
    pub fn require(&self, provider_type: AuthProviderType) -> Result<Arc<dyn AuthProvider>> {
        self.get(provider_type)
            .ok_or(SocializeError::UnsupportedProvider(provider_type))
    }

    pub fn contains(&self, provider_type: AuthProviderType) -> bool {
        self.providers.contains_key(&provider_type)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// 已注册的 Provider 类型（有序）
    pub fn provider_types(&self) -> Vec<AuthProviderType> {
        let mut types: Vec<_> = self.providers.keys().copied().collect();
        types.sort();
        types
    }

    pub fn providers(&self) -> impl Iterator<Item = &Arc<dyn AuthProvider>> {
        self.providers.values()
    }

    /// 校验全部已注册 Provider 的配置，遇到第一个错误即返回
    pub fn validate_all(&self, config: &Configuration) -> Result<()> {
        for provider_type in self.provider_types() {
            if let Some(provider) = self.providers.get(&provider_type) {
                provider.validate(config)?;
            }
        }
        Ok(())
    }

    /// Provider 已注册且配置完整
    pub fn is_supported(&self, provider_type: AuthProviderType, config: &Configuration) -> bool {
        self.providers
            .get(&provider_type)
            .map(|provider| provider.validate(config).is_ok())
            .unwrap_or(false)
    }
}

impl fmt::Debug for AuthProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthProviderRegistry")
            .field("providers", &self.provider_types())
            .finish()
    }
}
