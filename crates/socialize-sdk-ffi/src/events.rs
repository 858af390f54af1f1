//! Records and callback interfaces exchanged with the host

use socialize_sdk::{
    AuthProviderInfo, CleanupReport, Session, UserIdentity, UserProviderCredentials,
};

use crate::config::AuthProviderKind;

/// 单个 Provider 的凭证
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ProviderCredentialsRecord {
    pub provider: AuthProviderKind,
    pub app_id: Option<String>,
    pub permissions: Vec<String>,
    pub user_id: Option<String>,
    pub access_token: Option<String>,
    pub token_secret: Option<String>,
}

impl ProviderCredentialsRecord {
    pub(crate) fn from_core(credentials: &UserProviderCredentials, fallback: AuthProviderKind) -> Self {
        let info = credentials.provider_info.as_ref();
        Self {
            provider: info.map(|i| i.provider_type.into()).unwrap_or(fallback),
            app_id: info.and_then(|i| i.app_id.clone()),
            permissions: info.map(|i| i.permissions.clone()).unwrap_or_default(),
            user_id: credentials.user_id.clone(),
            access_token: credentials.access_token.clone(),
            token_secret: credentials.token_secret.clone(),
        }
    }

    pub(crate) fn provider_info(&self) -> AuthProviderInfo {
        let mut info = AuthProviderInfo::new(self.provider.into())
            .with_permissions(self.permissions.iter().cloned());
        if let Some(app_id) = self.app_id.as_ref() {
            info = info.with_app_id(app_id.clone());
        }
        info
    }

    pub(crate) fn to_core(&self) -> UserProviderCredentials {
        UserProviderCredentials {
            provider_info: Some(self.provider_info()),
            user_id: self.user_id.clone(),
            access_token: self.access_token.clone(),
            token_secret: self.token_secret.clone(),
        }
    }
}

/// 当前 Session 快照
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct SessionInfo {
    pub consumer_key: String,
    pub user_id: Option<u64>,
    pub display_name: Option<String>,
    pub legacy_provider: Option<AuthProviderKind>,
    pub providers: Vec<ProviderCredentialsRecord>,
    /// 毫秒时间戳
    pub created_at: i64,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        let mut credentials: Vec<_> = session.all_credentials().collect();
        credentials.sort_by_key(|(provider_type, _)| **provider_type);

        Self {
            consumer_key: session.consumer_key.clone(),
            user_id: session.user.as_ref().map(|user| user.id),
            display_name: session.user.as_ref().and_then(|user| user.display_name.clone()),
            legacy_provider: session.auth_provider_type.map(Into::into),
            providers: credentials
                .into_iter()
                .map(|(provider_type, c)| ProviderCredentialsRecord::from_core(c, (*provider_type).into()))
                .collect(),
            created_at: session.created_at.timestamp_millis(),
        }
    }
}

/// 后端认证请求
#[derive(Debug, Clone, uniffi::Record)]
pub struct BackendAuthRequest {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub provider: AuthProviderKind,
    pub app_id: Option<String>,
    pub permissions: Vec<String>,
    /// 已持有的第三方凭证（免交互认证）
    pub known_credentials: Option<ProviderCredentialsRecord>,
}

/// 后端返回的身份
#[derive(Debug, Clone, uniffi::Record)]
pub struct BackendSession {
    pub user_id: Option<u64>,
    pub display_name: Option<String>,
    pub providers: Vec<ProviderCredentialsRecord>,
}

impl BackendSession {
    pub(crate) fn into_session(self, consumer_key: String, consumer_secret: String) -> Session {
        let mut session = Session::new(consumer_key, consumer_secret);
        if let Some(id) = self.user_id {
            session = session.with_user(UserIdentity {
                id,
                display_name: self.display_name,
            });
        }
        for record in &self.providers {
            session.set_credentials(record.provider.into(), record.to_core());
        }
        session
    }
}

/// 后端认证结果，`session` 与 `error` 二选一
#[derive(Debug, Clone, uniffi::Record)]
pub struct BackendAuthResult {
    pub session: Option<BackendSession>,
    pub error: Option<String>,
}

/// Session 清理结果
#[derive(Debug, Clone, uniffi::Record)]
pub struct CleanupSummary {
    pub cleared_providers: Vec<AuthProviderKind>,
    pub session_discarded: bool,
    /// 协作方清理失败的描述，不影响本地清理
    pub failures: Vec<String>,
}

impl From<CleanupReport> for CleanupSummary {
    fn from(report: CleanupReport) -> Self {
        Self {
            cleared_providers: report.cleared_providers.iter().map(|p| (*p).into()).collect(),
            session_discarded: report.session_discarded,
            failures: report
                .failures
                .iter()
                .map(|failure| match failure.provider {
                    Some(provider) => format!("{} ({:?}): {}", provider, failure.stage, failure.error),
                    None => format!("({:?}): {}", failure.stage, failure.error),
                })
                .collect(),
        }
    }
}

/// 初始化结果回调
#[uniffi::export(callback_interface)]
pub trait InitCallback: Send + Sync {
    fn on_init(&self);
    fn on_error(&self, message: String);
}

/// 认证结果回调
#[uniffi::export(callback_interface)]
pub trait AuthCallback: Send + Sync {
    fn on_success(&self, session: SessionInfo);
    /// 认证本身失败
    fn on_fail(&self, message: String);
    /// 前置条件不满足（未初始化、Provider 不支持等）
    fn on_error(&self, message: String);
    fn on_cancel(&self);
}

/// 宿主实现的后端认证（HTTP 请求在宿主侧完成）
///
/// 调用发生在阻塞线程池上，实现可以直接同步等待网络结果。
#[uniffi::export(callback_interface)]
pub trait BackendAuthenticator: Send + Sync {
    fn authenticate(&self, request: BackendAuthRequest) -> BackendAuthResult;
    /// 返回 false 表示持久化失败
    fn save_session(&self, session: SessionInfo) -> bool;
    /// `provider` 为空表示清除全部
    fn clear_session(&self, provider: Option<AuthProviderKind>) -> bool;
}

/// 平台侧第三方凭证缓存（Facebook/Twitter 原生 SDK）
#[uniffi::export(callback_interface)]
pub trait CredentialCacheDelegate: Send + Sync {
    fn clear(&self, provider: AuthProviderKind) -> bool;
    /// 延长 access token 有效期
    fn extend(&self, provider: AuthProviderKind) -> bool;
}
