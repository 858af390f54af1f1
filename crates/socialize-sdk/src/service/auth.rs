//! 认证编排与 Session 管理

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::SocializeService;
use crate::asserter::{DefaultAsserter, InitializationAsserter};
use crate::auth::{
    AuthProviderInfo, AuthProviderRegistry, AuthProviderType, AuthRequest, Session,
    UserProviderCredentials, UserSystem,
};
use crate::config::Configuration;
use crate::container::Container;
use crate::error::{Result, SocializeError};
use crate::events::SocializeEvent;
use crate::listener::{deliver_auth_error, AuthListener};
use crate::platform::PlatformContext;

/// 清理失败发生的环节
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupStage {
    /// Provider 的平台侧凭证缓存
    NativeCache,
    /// 用户子系统持久化的 Session
    PersistedSession,
}

#[derive(Debug, Clone)]
pub struct CleanupFailure {
    pub provider: Option<AuthProviderType>,
    pub stage: CleanupStage,
    pub error: SocializeError,
}

/// Session 清理结果
///
/// 本地状态的修改总是完成；协作方的清理失败记录在 `failures` 中，不会中断清理。
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    /// 已从 Session 中移除凭证的 Provider
    pub cleared_providers: Vec<AuthProviderType>,
    /// 整个 Session 已被丢弃
    pub session_discarded: bool,
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, provider: Option<AuthProviderType>, stage: CleanupStage, error: SocializeError) {
        warn!(
            "⚠️ 清理失败 (provider={:?}, stage={:?}): {}",
            provider, stage, error
        );
        self.failures.push(CleanupFailure {
            provider,
            stage,
            error,
        });
    }
}

/// 锁内解析出的一次认证所需的服务
struct AuthTarget {
    container_id: Uuid,
    config: Arc<Configuration>,
    registry: Arc<AuthProviderRegistry>,
    user_system: Arc<dyn UserSystem>,
}

impl AuthTarget {
    fn consumer_credentials(&self) -> Result<(String, String)> {
        let key = self.config.consumer_key().ok_or_else(|| {
            SocializeError::Validation("Socialize consumer key is not configured".to_string())
        })?;
        let secret = self.config.consumer_secret().ok_or_else(|| {
            SocializeError::Validation("Socialize consumer secret is not configured".to_string())
        })?;
        Ok((key.to_string(), secret.to_string()))
    }
}

impl SocializeService {
    fn asserter_of(container: Option<&Arc<Container>>) -> Arc<dyn InitializationAsserter> {
        container
            .and_then(|container| container.asserter())
            .unwrap_or_else(|| Arc::new(DefaultAsserter))
    }

    /// 检查已初始化并取出认证所需服务，状态锁在返回前释放
    async fn auth_target(&self, context: &PlatformContext) -> Result<AuthTarget> {
        let state = self.state.lock().await;
        let asserter = Self::asserter_of(state.container.as_ref());
        asserter.assert_initialized(context, state.lifecycle.is_initialized())?;

        let (Some(container), Some(config)) = (state.container.clone(), state.config.clone()) else {
            return Err(SocializeError::NotInitialized(
                "Socialize not initialized".to_string(),
            ));
        };
        let user_system = container.user_system().ok_or_else(|| {
            SocializeError::NotInitialized("No user system configured".to_string())
        })?;

        Ok(AuthTarget {
            container_id: container.id(),
            config,
            registry: container.auth_providers(),
            user_system,
        })
    }

    /// 用认证结果替换当前 Session
    ///
    /// 容器已不是发起认证时的那个时结果作废。
    async fn commit_session(
        &self,
        container_id: Uuid,
        provider_type: AuthProviderType,
        mut session: Session,
    ) -> Result<Arc<Session>> {
        let session = {
            let mut state = self.state.lock().await;
            let current = state.container.as_ref().map(|container| container.id());
            if current != Some(container_id) || !state.lifecycle.is_initialized() {
                return Err(SocializeError::NotInitialized(
                    "Socialize was destroyed during authentication".to_string(),
                ));
            }

            if let Some(previous) = state.session.as_ref() {
                session.inherit_credentials(previous);
            }
            if session.auth_provider_type.is_none() {
                session.auth_provider_type = Some(provider_type);
            }

            let session = Arc::new(session);
            state.session = Some(session.clone());
            session
        };

        info!("✅ 认证成功: provider={}", provider_type);
        self.events.publish(SocializeEvent::Authenticated {
            provider: provider_type,
            user_id: session.user.as_ref().map(|user| user.id),
            timestamp: SocializeEvent::now(),
        });
        Ok(session)
    }

    fn finish_auth(&self, result: Result<Arc<Session>>, listener: Option<Arc<dyn AuthListener>>) {
        match (result, listener) {
            (Ok(session), Some(listener)) => listener.on_auth_success(session),
            (Ok(_), None) => {}
            (Err(e), Some(listener)) => deliver_auth_error(listener.as_ref(), e),
            (Err(e), None) => error!("❌ 认证失败: {}", e),
        }
    }

    // ========== 认证 ==========

    /// 使用指定 Provider 认证，consumer key/secret 取自配置
    ///
    /// 所有失败都通过 `listener` 返回；没有 listener 时只记录日志。
    pub async fn authenticate(
        &self,
        context: &PlatformContext,
        provider_type: AuthProviderType,
        listener: Option<Arc<dyn AuthListener>>,
        permissions: &[&str],
    ) {
        let result = self
            .run_authenticate(context, provider_type, permissions)
            .await;
        self.finish_auth(result, listener);
    }

    async fn run_authenticate(
        &self,
        context: &PlatformContext,
        provider_type: AuthProviderType,
        permissions: &[&str],
    ) -> Result<Arc<Session>> {
        let _transition = self.transitions.lock().await;
        let target = self.auth_target(context).await?;
        let provider = target.registry.require(provider_type)?;
        let permissions: Vec<String> = permissions.iter().map(|p| p.to_string()).collect();
        let info = provider.provider_info(&target.config, &permissions)?;
        let (key, secret) = target.consumer_credentials()?;

        debug!("开始认证: provider={}", provider_type);
        let session = target
            .user_system
            .authenticate(context, AuthRequest::new(key, secret, info))
            .await?;
        self.commit_session(target.container_id, provider_type, session)
            .await
    }

    /// 使用显式给出的 consumer key/secret 与 Provider 请求认证
    pub async fn authenticate_with_credentials(
        &self,
        context: &PlatformContext,
        consumer_key: &str,
        consumer_secret: &str,
        provider_info: AuthProviderInfo,
        listener: Option<Arc<dyn AuthListener>>,
    ) {
        let result = async {
            let _transition = self.transitions.lock().await;
            let target = self.auth_target(context).await?;
            let provider_type = provider_info.provider_type;
            target.registry.require(provider_type)?;

            let session = target
                .user_system
                .authenticate(
                    context,
                    AuthRequest::new(consumer_key, consumer_secret, provider_info),
                )
                .await?;
            self.commit_session(target.container_id, provider_type, session)
                .await
        }
        .await;
        self.finish_auth(result, listener);
    }

    /// 使用已获取的第三方凭证认证，不再提示用户
    pub async fn authenticate_known_user(
        &self,
        context: &PlatformContext,
        credentials: UserProviderCredentials,
        listener: Option<Arc<dyn AuthListener>>,
    ) {
        let result = async {
            let _transition = self.transitions.lock().await;
            let target = self.auth_target(context).await?;
            let provider_info = credentials
                .provider_info
                .clone()
                .unwrap_or_else(|| AuthProviderInfo::new(AuthProviderType::Socialize));
            let provider_type = provider_info.provider_type;
            target.registry.require(provider_type)?;
            let (key, secret) = target.consumer_credentials()?;

            let session = target
                .user_system
                .authenticate_known_user(
                    context,
                    AuthRequest::new(key, secret, provider_info),
                    credentials,
                )
                .await?;
            self.commit_session(target.container_id, provider_type, session)
                .await
        }
        .await;
        self.finish_auth(result, listener);
    }

    /// 直接返回结果的认证，没有装配用户子系统时返回 `NotInitialized`
    pub async fn authenticate_synchronous(&self, context: &PlatformContext) -> Result<Arc<Session>> {
        let _transition = self.transitions.lock().await;
        let target = {
            let state = self.state.lock().await;
            let container = state.container.clone();
            match (container, state.config.clone()) {
                (Some(container), Some(config)) => container.user_system().map(|user_system| AuthTarget {
                    container_id: container.id(),
                    config,
                    registry: container.auth_providers(),
                    user_system,
                }),
                _ => None,
            }
        };
        let target = target.ok_or_else(|| {
            SocializeError::NotInitialized("Socialize not initialized".to_string())
        })?;

        let (key, secret) = target.consumer_credentials()?;
        let session = target
            .user_system
            .authenticate_synchronous(context, &key, &secret)
            .await?;
        self.commit_session(target.container_id, AuthProviderType::Socialize, session)
            .await
    }

    // ========== Session ==========

    /// 已初始化且存在 Session
    pub async fn is_authenticated(&self) -> bool {
        let state = self.state.lock().await;
        state.lifecycle.is_initialized() && state.session.is_some()
    }

    /// 已认证且 Session 覆盖指定 Provider
    pub async fn is_authenticated_for(&self, provider_type: AuthProviderType) -> bool {
        let state = self.state.lock().await;
        if !state.lifecycle.is_initialized() {
            return false;
        }
        state
            .session
            .as_ref()
            .map(|session| session.covers(provider_type))
            .unwrap_or(false)
    }

    pub async fn session(&self) -> Option<Arc<Session>> {
        self.state.lock().await.session.clone()
    }

    /// 替换当前 Session（例如从持久化恢复）
    pub async fn set_session(&self, session: Option<Session>) {
        self.state.lock().await.session = session.map(Arc::new);
    }

    /// 取得当前 Session，未认证时返回 `NotAuthenticated`
    pub async fn require_session(&self) -> Result<Arc<Session>> {
        let state = self.state.lock().await;
        let asserter = Self::asserter_of(state.container.as_ref());
        asserter.assert_authenticated(state.session.as_deref())?;
        state
            .session
            .clone()
            .ok_or_else(|| SocializeError::NotAuthenticated("Not authenticated".to_string()))
    }

    /// 通过用户子系统持久化当前 Session
    pub async fn save_session(&self, context: &PlatformContext) -> Result<()> {
        let (user_system, session) = {
            let state = self.state.lock().await;
            let user_system = state
                .container
                .as_ref()
                .and_then(|container| container.user_system())
                .ok_or_else(|| {
                    SocializeError::NotInitialized("Socialize not initialized".to_string())
                })?;
            let session = state
                .session
                .clone()
                .ok_or_else(|| SocializeError::NotAuthenticated("Not authenticated".to_string()))?;
            (user_system, session)
        };
        user_system.save_session(context, &session).await
    }

    /// Provider 已注册且所需配置齐全
    pub async fn is_supported(&self, provider_type: AuthProviderType) -> bool {
        let state = self.state.lock().await;
        match (state.container.as_ref(), state.config.as_ref()) {
            (Some(container), Some(config)) => {
                container.auth_providers().is_supported(provider_type, config)
            }
            _ => false,
        }
    }

    // ========== 清理 ==========

    /// 清除单个第三方 Provider 的凭证
    ///
    /// 平台缓存清理失败不影响本地凭证的移除；持久化 Session 的清理总会执行。
    pub async fn clear_third_party_session(
        &self,
        context: &PlatformContext,
        provider_type: AuthProviderType,
    ) -> CleanupReport {
        let mut report = CleanupReport::default();
        {
            let _transition = self.transitions.lock().await;
            let mut state = self.state.lock().await;
            let container = state.container.clone();

            if let Some(session) = state.session.clone() {
                let provider = container
                    .as_ref()
                    .and_then(|container| container.auth_providers().get(provider_type));
                let info = session
                    .credentials(provider_type)
                    .and_then(|credentials| credentials.provider_info.clone());

                if let (Some(provider), Some(info)) = (provider, info) {
                    if let Err(e) = provider.clear_cache(context, &info).await {
                        report.record(Some(provider_type), CleanupStage::NativeCache, e);
                    }
                }

                let mut next = (*session).clone();
                next.clear(provider_type);
                if next.auth_provider_type == Some(provider_type) {
                    next.auth_provider_type = None;
                }
                state.session = Some(Arc::new(next));
                report.cleared_providers.push(provider_type);
            }

            if let Some(user_system) = container.and_then(|container| container.user_system()) {
                if let Err(e) = user_system.clear_session(Some(provider_type)).await {
                    report.record(Some(provider_type), CleanupStage::PersistedSession, e);
                }
            }
        }

        if !report.cleared_providers.is_empty() {
            self.events.publish(SocializeEvent::ProviderSessionCleared {
                provider: provider_type,
                timestamp: SocializeEvent::now(),
            });
        }
        report
    }

    /// 清除全部 Provider 凭证并丢弃 Session
    ///
    /// 任何 Provider 的清理失败都不会阻止 Session 被丢弃。
    pub async fn clear_session_cache(&self, context: &PlatformContext) -> CleanupReport {
        let mut report = CleanupReport::default();
        {
            let _transition = self.transitions.lock().await;
            let mut state = self.state.lock().await;
            let container = state.container.clone();
            let registry = container.as_ref().map(|container| container.auth_providers());
            let user_system = container.as_ref().and_then(|container| container.user_system());

            if let Some(session) = state.session.take() {
                let mut entries: Vec<_> = session
                    .all_credentials()
                    .map(|(provider_type, credentials)| (*provider_type, credentials.provider_info.clone()))
                    .collect();
                entries.sort_by_key(|(provider_type, _)| *provider_type);

                for (provider_type, info) in entries {
                    let provider = registry
                        .as_ref()
                        .and_then(|registry| registry.get(provider_type));
                    if let (Some(provider), Some(info)) = (provider, info) {
                        if let Err(e) = provider.clear_cache(context, &info).await {
                            report.record(Some(provider_type), CleanupStage::NativeCache, e);
                        }
                    }
                    if let Some(user_system) = user_system.as_ref() {
                        if let Err(e) = user_system.clear_session(Some(provider_type)).await {
                            report.record(Some(provider_type), CleanupStage::PersistedSession, e);
                        }
                    }
                    report.cleared_providers.push(provider_type);
                }
                report.session_discarded = true;
            }

            if let Some(user_system) = user_system {
                if let Err(e) = user_system.clear_session(None).await {
                    report.record(None, CleanupStage::PersistedSession, e);
                }
            }
        }

        if report.session_discarded {
            info!("✅ Session 已清除");
            self.events.publish(SocializeEvent::SessionCleared {
                timestamp: SocializeEvent::now(),
            });
        }
        report
    }
}
