//! Main SDK interface for FFI

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use socialize_sdk::config::DEFAULT_BEAN_PATH;
use socialize_sdk::{
    AuthListener, AuthProviderInfo, AuthProviderType, AuthRequest, BroadcastIntent,
    ContainerBuilder, FacebookAuthProvider, InitListener, InitPaths, NativeCredentialCache,
    PlatformContext, Session, SocializeError, SocializeService, TwitterAuthProvider,
    UserProviderCredentials, UserSystem,
};

use crate::{
    config::{AuthProviderKind, PlatformInfo, SdkConfig, FACEBOOK_BEAN_PATH, TWITTER_BEAN_PATH},
    error::SocializeFfiError,
    events::{
        AuthCallback, BackendAuthRequest, BackendAuthenticator, CleanupSummary,
        CredentialCacheDelegate, InitCallback, ProviderCredentialsRecord, SessionInfo,
    },
    helpers::get_runtime,
};

/// 所有 FFI 入口调用时打 debug 日志，便于排查是否进入 SDK
macro_rules! sdk_ffi_log {
    ($name:expr) => {
        debug!("socialize sdk->{}()", $name);
    };
}

// ========== 宿主回调适配 ==========

/// 宿主回调可能重新进入 SDK，因此放到阻塞线程池上执行，避免嵌套 `block_on`
struct ForeignInitListener {
    callback: Arc<dyn InitCallback>,
}

impl InitListener for ForeignInitListener {
    fn on_init(&self, _context: &PlatformContext, _container: Arc<socialize_sdk::Container>) {
        let callback = self.callback.clone();
        let _detached = get_runtime().spawn_blocking(move || callback.on_init());
    }

    fn on_error(&self, error: SocializeError) {
        let callback = self.callback.clone();
        let message = SocializeFfiError::from(error).to_string();
        let _detached = get_runtime().spawn_blocking(move || callback.on_error(message));
    }
}

enum AuthOutcome {
    Success(SessionInfo),
    Fail(String),
    Error(String),
    Cancel,
}

/// 认证结果先暂存，`block_on` 返回后再交给宿主回调
#[derive(Default)]
struct PendingAuthListener {
    outcomes: parking_lot::Mutex<Vec<AuthOutcome>>,
}

impl PendingAuthListener {
    fn deliver(&self, callback: &dyn AuthCallback) {
        let outcomes = std::mem::take(&mut *self.outcomes.lock());
        for outcome in outcomes {
            match outcome {
                AuthOutcome::Success(session) => callback.on_success(session),
                AuthOutcome::Fail(message) => callback.on_fail(message),
                AuthOutcome::Error(message) => callback.on_error(message),
                AuthOutcome::Cancel => callback.on_cancel(),
            }
        }
    }
}

impl AuthListener for PendingAuthListener {
    fn on_auth_success(&self, session: Arc<Session>) {
        self.outcomes
            .lock()
            .push(AuthOutcome::Success(SessionInfo::from(session.as_ref())));
    }

    fn on_auth_fail(&self, error: SocializeError) {
        self.outcomes
            .lock()
            .push(AuthOutcome::Fail(SocializeFfiError::from(error).to_string()));
    }

    fn on_error(&self, error: SocializeError) {
        self.outcomes
            .lock()
            .push(AuthOutcome::Error(SocializeFfiError::from(error).to_string()));
    }

    fn on_cancel(&self) {
        self.outcomes.lock().push(AuthOutcome::Cancel);
    }
}

/// 后端认证交给宿主，在阻塞线程池上调用
struct BackendUserSystem {
    backend: Arc<dyn BackendAuthenticator>,
}

impl BackendUserSystem {
    fn request_of(request: &AuthRequest, known: Option<&UserProviderCredentials>) -> BackendAuthRequest {
        let provider: AuthProviderKind = request.provider_type().into();
        BackendAuthRequest {
            consumer_key: request.consumer_key.clone(),
            consumer_secret: request.consumer_secret.clone(),
            provider,
            app_id: request.provider_info.app_id.clone(),
            permissions: request.provider_info.permissions.clone(),
            known_credentials: known.map(|c| ProviderCredentialsRecord::from_core(c, provider)),
        }
    }

    async fn call(&self, request: BackendAuthRequest) -> socialize_sdk::Result<Session> {
        let backend = self.backend.clone();
        let consumer_key = request.consumer_key.clone();
        let consumer_secret = request.consumer_secret.clone();

        let result = tokio::task::spawn_blocking(move || backend.authenticate(request))
            .await
            .map_err(SocializeError::wrap)?;

        match (result.session, result.error) {
            (_, Some(error)) => Err(SocializeError::Auth(error)),
            (Some(session), None) => Ok(session.into_session(consumer_key, consumer_secret)),
            (None, None) => Err(SocializeError::Auth(
                "Empty response from authentication backend".to_string(),
            )),
        }
    }
}

#[async_trait]
impl UserSystem for BackendUserSystem {
    async fn authenticate(&self, _context: &PlatformContext, request: AuthRequest) -> socialize_sdk::Result<Session> {
        self.call(Self::request_of(&request, None)).await
    }

    async fn authenticate_known_user(
        &self,
        _context: &PlatformContext,
        request: AuthRequest,
        credentials: UserProviderCredentials,
    ) -> socialize_sdk::Result<Session> {
        self.call(Self::request_of(&request, Some(&credentials))).await
    }

    async fn authenticate_synchronous(
        &self,
        _context: &PlatformContext,
        consumer_key: &str,
        consumer_secret: &str,
    ) -> socialize_sdk::Result<Session> {
        let request = AuthRequest::new(
            consumer_key,
            consumer_secret,
            AuthProviderInfo::new(AuthProviderType::Socialize),
        );
        self.call(Self::request_of(&request, None)).await
    }

    async fn save_session(&self, _context: &PlatformContext, session: &Session) -> socialize_sdk::Result<()> {
        let backend = self.backend.clone();
        let info = SessionInfo::from(session);
        let saved = tokio::task::spawn_blocking(move || backend.save_session(info))
            .await
            .map_err(SocializeError::wrap)?;
        if saved {
            Ok(())
        } else {
            Err(SocializeError::Auth("Failed to persist session".to_string()))
        }
    }

    async fn clear_session(&self, provider_type: Option<AuthProviderType>) -> socialize_sdk::Result<()> {
        let backend = self.backend.clone();
        let provider = provider_type.map(AuthProviderKind::from);
        let cleared = tokio::task::spawn_blocking(move || backend.clear_session(provider))
            .await
            .map_err(SocializeError::wrap)?;
        if cleared {
            Ok(())
        } else {
            Err(SocializeError::Auth("Failed to clear persisted session".to_string()))
        }
    }
}

struct ForeignCredentialCache {
    delegate: Arc<dyn CredentialCacheDelegate>,
}

impl ForeignCredentialCache {
    async fn run<F>(&self, provider_type: AuthProviderType, action: &'static str, f: F) -> socialize_sdk::Result<()>
    where
        F: FnOnce(&dyn CredentialCacheDelegate, AuthProviderKind) -> bool + Send + 'static,
    {
        let delegate = self.delegate.clone();
        let ok = tokio::task::spawn_blocking(move || f(delegate.as_ref(), provider_type.into()))
            .await
            .map_err(SocializeError::wrap)?;
        if ok {
            Ok(())
        } else {
            Err(SocializeError::Auth(format!(
                "Failed to {} {} credentials",
                action, provider_type
            )))
        }
    }
}

#[async_trait]
impl NativeCredentialCache for ForeignCredentialCache {
    async fn clear(&self, _context: &PlatformContext, info: &AuthProviderInfo) -> socialize_sdk::Result<()> {
        self.run(info.provider_type, "clear", |delegate, provider| delegate.clear(provider))
            .await
    }

    async fn extend(&self, _context: &PlatformContext, provider_type: AuthProviderType) -> socialize_sdk::Result<()> {
        self.run(provider_type, "extend", |delegate, provider| delegate.extend(provider))
            .await
    }
}

// ========== SDK 句柄 ==========

/// Main SDK handle for FFI consumers
#[derive(uniffi::Object)]
pub struct SocializeSdk {
    service: Arc<SocializeService>,
    /// 当前宿主上下文，`attach_platform` 时替换
    platform: RwLock<PlatformContext>,
}

impl SocializeSdk {
    fn context(&self) -> PlatformContext {
        self.platform.read().clone()
    }

    fn paths_or_default(&self, paths: Vec<String>) -> InitPaths {
        let paths = InitPaths::new(paths);
        if paths.is_empty() {
            self.service.default_paths()
        } else {
            paths
        }
    }
}

#[uniffi::export]
impl SocializeSdk {
    /// Create the SDK handle
    ///
    /// 注册核心、Facebook、Twitter 三组 bean 配置，不会初始化。
    #[uniffi::constructor]
    pub fn new(
        config: SdkConfig,
        platform: PlatformInfo,
        backend: Box<dyn BackendAuthenticator>,
        credential_cache: Box<dyn CredentialCacheDelegate>,
    ) -> Result<Self, SocializeFfiError> {
        sdk_ffi_log!("new");
        if config.consumer_key.trim().is_empty() || config.consumer_secret.trim().is_empty() {
            return Err(SocializeFfiError::Config {
                msg: "consumer key and secret are required".to_string(),
            });
        }

        let user_system: Arc<dyn UserSystem> = Arc::new(BackendUserSystem {
            backend: Arc::from(backend),
        });
        let cache: Arc<dyn NativeCredentialCache> = Arc::new(ForeignCredentialCache {
            delegate: Arc::from(credential_cache),
        });

        let core = move |_: &PlatformContext, builder: &mut ContainerBuilder| -> socialize_sdk::Result<()> {
            builder.user_system(user_system.clone());
            Ok(())
        };
        let facebook = {
            let cache = cache.clone();
            move |_: &PlatformContext, builder: &mut ContainerBuilder| -> socialize_sdk::Result<()> {
                builder.auth_provider(Arc::new(FacebookAuthProvider::new(cache.clone())));
                Ok(())
            }
        };
        let twitter = move |_: &PlatformContext, builder: &mut ContainerBuilder| -> socialize_sdk::Result<()> {
            builder.auth_provider(Arc::new(TwitterAuthProvider::new(cache.clone())));
            Ok(())
        };

        let service = SocializeService::builder()
            .options(config.to_options())
            .bean_source(DEFAULT_BEAN_PATH, Arc::new(core))
            .bean_source(FACEBOOK_BEAN_PATH, Arc::new(facebook))
            .bean_source(TWITTER_BEAN_PATH, Arc::new(twitter))
            .build();

        info!(
            "✅ Socialize SDK 已创建: package={}, bean_paths={:?}",
            platform.package_name,
            config.bean_paths()
        );
        Ok(Self {
            service,
            platform: RwLock::new(platform.to_context()),
        })
    }

    /// 同步初始化，`paths` 为空时使用默认路径
    pub fn initialize(&self, paths: Vec<String>) -> Result<bool, SocializeFfiError> {
        sdk_ffi_log!("initialize");
        let context = self.context();
        let paths = self.paths_or_default(paths);
        get_runtime()
            .block_on(self.service.try_initialize(&context, Some(paths)))
            .map(|container| container.is_some())
            .map_err(Into::into)
    }

    /// 后台初始化，结果通过 `callback` 返回
    pub fn initialize_async(&self, paths: Vec<String>, callback: Box<dyn InitCallback>) {
        sdk_ffi_log!("initialize_async");
        let listener = Arc::new(ForeignInitListener {
            callback: Arc::from(callback),
        });
        let paths = self.paths_or_default(paths);

        let _guard = get_runtime().enter();
        let _detached = self
            .service
            .initialize_async(self.context(), Some(paths), listener);
    }

    /// 引用计数 - 1；`force` 为 true 时直接销毁
    pub fn destroy(&self, force: bool) {
        sdk_ffi_log!("destroy");
        get_runtime().block_on(self.service.destroy_with(force));
    }

    pub fn is_initialized(&self) -> bool {
        get_runtime().block_on(self.service.is_initialized())
    }

    pub fn init_count(&self) -> u32 {
        get_runtime().block_on(self.service.init_count())
    }

    /// 交互式认证，结果通过 `callback` 返回
    pub fn authenticate(
        &self,
        provider: AuthProviderKind,
        permissions: Vec<String>,
        callback: Box<dyn AuthCallback>,
    ) {
        sdk_ffi_log!("authenticate");
        let context = self.context();
        let pending = Arc::new(PendingAuthListener::default());
        let listener: Arc<dyn AuthListener> = pending.clone();
        let permissions: Vec<&str> = permissions.iter().map(String::as_str).collect();
        get_runtime().block_on(self.service.authenticate(
            &context,
            provider.into(),
            Some(listener),
            &permissions,
        ));
        pending.deliver(callback.as_ref());
    }

    /// 使用宿主已持有的第三方凭证认证
    pub fn authenticate_known_user(
        &self,
        credentials: ProviderCredentialsRecord,
        callback: Box<dyn AuthCallback>,
    ) {
        sdk_ffi_log!("authenticate_known_user");
        let context = self.context();
        let pending = Arc::new(PendingAuthListener::default());
        let listener: Arc<dyn AuthListener> = pending.clone();
        get_runtime().block_on(self.service.authenticate_known_user(
            &context,
            credentials.to_core(),
            Some(listener),
        ));
        pending.deliver(callback.as_ref());
    }

    pub fn authenticate_synchronous(&self) -> Result<SessionInfo, SocializeFfiError> {
        sdk_ffi_log!("authenticate_synchronous");
        let context = self.context();
        get_runtime()
            .block_on(self.service.authenticate_synchronous(&context))
            .map(|session| SessionInfo::from(session.as_ref()))
            .map_err(Into::into)
    }

    pub fn is_authenticated(&self) -> bool {
        get_runtime().block_on(self.service.is_authenticated())
    }

    pub fn is_authenticated_for(&self, provider: AuthProviderKind) -> bool {
        get_runtime().block_on(self.service.is_authenticated_for(provider.into()))
    }

    pub fn session(&self) -> Option<SessionInfo> {
        get_runtime()
            .block_on(self.service.session())
            .map(|session| SessionInfo::from(session.as_ref()))
    }

    pub fn save_session(&self) -> Result<(), SocializeFfiError> {
        sdk_ffi_log!("save_session");
        let context = self.context();
        get_runtime()
            .block_on(self.service.save_session(&context))
            .map_err(Into::into)
    }

    pub fn clear_third_party_session(&self, provider: AuthProviderKind) -> CleanupSummary {
        sdk_ffi_log!("clear_third_party_session");
        let context = self.context();
        let report = get_runtime().block_on(
            self.service
                .clear_third_party_session(&context, provider.into()),
        );
        if !report.is_clean() {
            warn!("⚠️ 清除 {:?} 凭证时部分协作方失败", provider);
        }
        report.into()
    }

    pub fn clear_session_cache(&self) -> CleanupSummary {
        sdk_ffi_log!("clear_session_cache");
        let context = self.context();
        get_runtime()
            .block_on(self.service.clear_session_cache(&context))
            .into()
    }

    pub fn is_supported(&self, provider: AuthProviderKind) -> bool {
        get_runtime().block_on(self.service.is_supported(provider.into()))
    }

    pub fn on_pause(&self) {
        sdk_ffi_log!("on_pause");
        let context = self.context();
        get_runtime().block_on(self.service.on_pause(&context));
    }

    pub fn on_resume(&self) {
        sdk_ffi_log!("on_resume");
        let context = self.context();
        get_runtime().block_on(self.service.on_resume(&context));
    }

    /// 返回 true 表示广播已被 Socialize 消费
    pub fn handle_broadcast(&self, action: Option<String>, extras: HashMap<String, String>) -> bool {
        sdk_ffi_log!("handle_broadcast");
        let context = self.context();
        let intent = BroadcastIntent {
            action,
            extras: extras.into_iter().collect(),
        };
        get_runtime().block_on(self.service.handle_broadcast_intent(&context, &intent))
    }

    pub fn set_property(&self, key: String, value: String) {
        get_runtime().block_on(self.service.set_property(key, value));
    }

    /// 宿主上下文变化（例如 Activity 重建）后更新
    pub fn attach_platform(&self, platform: PlatformInfo) {
        sdk_ffi_log!("attach_platform");
        *self.platform.write() = platform.to_context();
    }
}
