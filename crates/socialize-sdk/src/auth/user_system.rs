//! 面向后端的用户认证子系统
//!
//! 网络请求由宿主实现（HTTP 客户端不在 SDK 核心内），核心只负责编排。

use async_trait::async_trait;

use super::provider::{AuthProviderInfo, AuthProviderType};
use super::session::{Session, UserProviderCredentials};
use crate::error::Result;
use crate::platform::PlatformContext;

/// 发往后端的认证请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub provider_info: AuthProviderInfo,
}

impl AuthRequest {
    pub fn new<K: Into<String>, S: Into<String>>(
        consumer_key: K,
        consumer_secret: S,
        provider_info: AuthProviderInfo,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            provider_info,
        }
    }

    pub fn provider_type(&self) -> AuthProviderType {
        self.provider_info.provider_type
    }
}

/// 用户认证子系统
///
/// 认证期间 SDK 持有变更锁，实现中只能调用查询接口，不能再发起初始化、销毁或认证。
#[async_trait]
pub trait UserSystem: Send + Sync {
    /// 交互式认证（可能拉起第三方授权页面）
    async fn authenticate(&self, context: &PlatformContext, request: AuthRequest) -> Result<Session>;

    /// 使用已获取的第三方凭证认证，不再提示用户
    async fn authenticate_known_user(
        &self,
        context: &PlatformContext,
        request: AuthRequest,
        credentials: UserProviderCredentials,
    ) -> Result<Session>;

    /// 仅凭 consumer key/secret 直接换取 Session
    async fn authenticate_synchronous(
        &self,
        context: &PlatformContext,
        consumer_key: &str,
        consumer_secret: &str,
    ) -> Result<Session>;

    /// 持久化 Session
    async fn save_session(&self, context: &PlatformContext, session: &Session) -> Result<()>;

    /// 清除持久化的 Session；`None` 表示全部
    async fn clear_session(&self, provider_type: Option<AuthProviderType>) -> Result<()>;
}
