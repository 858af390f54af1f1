//! 内置认证 Provider

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::provider::{AuthProvider, AuthProviderInfo, AuthProviderType};
use crate::config::{Configuration, FACEBOOK_APP_ID, TWITTER_CONSUMER_KEY, TWITTER_CONSUMER_SECRET};
use crate::error::{Result, SocializeError};
use crate::platform::PlatformContext;

/// Facebook 默认申请的权限
pub const FACEBOOK_DEFAULT_PERMISSIONS: &[&str] = &["offline_access", "publish_stream"];

/// 平台侧第三方凭证缓存（Facebook/Twitter 原生 SDK 的 token 存储）
#[async_trait]
pub trait NativeCredentialCache: Send + Sync {
    /// 清除缓存的 token
    async fn clear(&self, context: &PlatformContext, info: &AuthProviderInfo) -> Result<()>;

    /// 延长 token 有效期
    async fn extend(&self, context: &PlatformContext, provider_type: AuthProviderType) -> Result<()>;
}

/// 不做任何事的缓存实现
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCredentialCache;

#[async_trait]
impl NativeCredentialCache for NoopCredentialCache {
    async fn clear(&self, _context: &PlatformContext, _info: &AuthProviderInfo) -> Result<()> {
        Ok(())
    }

    async fn extend(&self, _context: &PlatformContext, _provider_type: AuthProviderType) -> Result<()> {
        Ok(())
    }
}

/// Socialize 原生认证，无需额外配置
#[derive(Debug, Default, Clone, Copy)]
pub struct SocializeAuthProvider;

#[async_trait]
impl AuthProvider for SocializeAuthProvider {
    fn provider_type(&self) -> AuthProviderType {
        AuthProviderType::Socialize
    }

    fn provider_info(&self, _config: &Configuration, _permissions: &[String]) -> Result<AuthProviderInfo> {
        Ok(AuthProviderInfo::new(AuthProviderType::Socialize))
    }

    async fn clear_cache(&self, _context: &PlatformContext, _info: &AuthProviderInfo) -> Result<()> {
        Ok(())
    }
}

/// Facebook 认证
pub struct FacebookAuthProvider {
    cache: Arc<dyn NativeCredentialCache>,
}

impl FacebookAuthProvider {
    pub fn new(cache: Arc<dyn NativeCredentialCache>) -> Self {
        Self { cache }
    }

    fn app_id<'a>(&self, config: &'a Configuration) -> Result<&'a str> {
        config.get_non_empty(FACEBOOK_APP_ID).ok_or_else(|| {
            SocializeError::Validation(format!(
                "Facebook authentication requires '{}' to be configured",
                FACEBOOK_APP_ID
            ))
        })
    }
}

#[async_trait]
impl AuthProvider for FacebookAuthProvider {
    fn provider_type(&self) -> AuthProviderType {
        AuthProviderType::Facebook
    }

    fn provider_info(&self, config: &Configuration, permissions: &[String]) -> Result<AuthProviderInfo> {
        let app_id = self.app_id(config)?;
        let info = AuthProviderInfo::new(AuthProviderType::Facebook).with_app_id(app_id);

        if permissions.is_empty() {
            Ok(info.with_permissions(FACEBOOK_DEFAULT_PERMISSIONS.iter().copied()))
        } else {
            Ok(info.with_permissions(permissions.iter().cloned()))
        }
    }

    fn validate(&self, config: &Configuration) -> Result<()> {
        self.app_id(config).map(|_| ())
    }

    async fn clear_cache(&self, context: &PlatformContext, info: &AuthProviderInfo) -> Result<()> {
        debug!("清除 Facebook 本地凭证: {}", context.package_name());
        self.cache.clear(context, info).await
    }

    async fn refresh(&self, context: &PlatformContext) -> Result<()> {
        info!("🔄 延长 Facebook access token");
        self.cache.extend(context, AuthProviderType::Facebook).await
    }
}

/// Twitter 认证
pub struct TwitterAuthProvider {
    cache: Arc<dyn NativeCredentialCache>,
}

impl TwitterAuthProvider {
    pub fn new(cache: Arc<dyn NativeCredentialCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl AuthProvider for TwitterAuthProvider {
    fn provider_type(&self) -> AuthProviderType {
        AuthProviderType::Twitter
    }

    fn provider_info(&self, config: &Configuration, permissions: &[String]) -> Result<AuthProviderInfo> {
        self.validate(config)?;
        Ok(AuthProviderInfo::new(AuthProviderType::Twitter)
            .with_permissions(permissions.iter().cloned()))
    }

    fn validate(&self, config: &Configuration) -> Result<()> {
        for key in [TWITTER_CONSUMER_KEY, TWITTER_CONSUMER_SECRET] {
            if config.get_non_empty(key).is_none() {
                return Err(SocializeError::Validation(format!(
                    "Twitter authentication requires '{}' to be configured",
                    key
                )));
            }
        }
        Ok(())
    }

    async fn clear_cache(&self, context: &PlatformContext, info: &AuthProviderInfo) -> Result<()> {
        debug!("清除 Twitter 本地凭证: {}", context.package_name());
        self.cache.clear(context, info).await
    }
}
