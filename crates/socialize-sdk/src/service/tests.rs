use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, Notify};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

use super::*;
use crate::auth::{
    AuthProviderInfo, AuthProviderType, AuthRequest, FacebookAuthProvider, NativeCredentialCache,
    TwitterAuthProvider, UserIdentity, UserProviderCredentials, UserSystem,
};
use crate::config::{
    CONSUMER_KEY, CONSUMER_SECRET, FACEBOOK_APP_ID, NOTIFICATIONS_ENABLED, TWITTER_CONSUMER_KEY,
    TWITTER_CONSUMER_SECRET,
};
use crate::lifecycle::LifecycleHook;
use crate::listener::AuthListener;
use crate::notifications::{
    NotificationChecker, NotificationDispatcher, C2DM_MESSAGE_ACTION, C2DM_REGISTRATION_ACTION,
    SOURCE_EXTRA, SOURCE_SOCIALIZE,
};
use crate::platform::DisplayDensity;

const CORE: &str = "socialize_beans.xml";
const FACEBOOK: &str = "facebook_beans.xml";
const TWITTER: &str = "twitter_beans.xml";
const BROKEN: &str = "broken_beans.xml";
const FACEBOOK_UNCONFIGURED: &str = "facebook_unconfigured.xml";

// ========== 测试替身 ==========

#[derive(Default)]
struct FakeUserSystem {
    reject: AtomicBool,
    cleared: Mutex<Vec<Option<AuthProviderType>>>,
    saved: AtomicUsize,
    /// (已进入认证, 放行)
    gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

impl FakeUserSystem {
    fn user() -> UserIdentity {
        UserIdentity {
            id: 42,
            display_name: Some("tester".to_string()),
        }
    }

    async fn wait_gate(&self) {
        let gate = self.gate.lock().clone();
        if let Some((entered, release)) = gate {
            entered.notify_one();
            release.notified().await;
        }
    }

    fn check_reject(&self) -> Result<()> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(SocializeError::Auth("invalid credentials".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl UserSystem for FakeUserSystem {
    async fn authenticate(&self, _context: &PlatformContext, request: AuthRequest) -> Result<Session> {
        self.wait_gate().await;
        self.check_reject()?;

        let provider_type = request.provider_type();
        let mut session = Session::new(request.consumer_key.clone(), request.consumer_secret.clone())
            .with_user(Self::user());
        if provider_type.is_third_party() {
            session.set_credentials(
                provider_type,
                UserProviderCredentials::new(request.provider_info.clone())
                    .with_access_token(format!("{}-token", provider_type)),
            );
        }
        Ok(session)
    }

    async fn authenticate_known_user(
        &self,
        _context: &PlatformContext,
        request: AuthRequest,
        credentials: UserProviderCredentials,
    ) -> Result<Session> {
        self.check_reject()?;
        Ok(Session::new(request.consumer_key, request.consumer_secret)
            .with_user(Self::user())
            .with_credentials(request.provider_info.provider_type, credentials))
    }

    async fn authenticate_synchronous(
        &self,
        _context: &PlatformContext,
        consumer_key: &str,
        consumer_secret: &str,
    ) -> Result<Session> {
        self.check_reject()?;
        Ok(Session::new(consumer_key, consumer_secret).with_user(Self::user()))
    }

    async fn save_session(&self, _context: &PlatformContext, _session: &Session) -> Result<()> {
        self.saved.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear_session(&self, provider_type: Option<AuthProviderType>) -> Result<()> {
        self.cleared.lock().push(provider_type);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingCache {
    fail_clear: bool,
    cleared: AtomicUsize,
    extended: AtomicUsize,
}

#[async_trait]
impl NativeCredentialCache for RecordingCache {
    async fn clear(&self, _context: &PlatformContext, _info: &AuthProviderInfo) -> Result<()> {
        self.cleared.fetch_add(1, Ordering::SeqCst);
        if self.fail_clear {
            return Err(SocializeError::Auth("keychain unavailable".to_string()));
        }
        Ok(())
    }

    async fn extend(&self, _context: &PlatformContext, _provider_type: AuthProviderType) -> Result<()> {
        self.extended.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingInitListener {
    inits: Mutex<Vec<Uuid>>,
    errors: Mutex<Vec<SocializeError>>,
}

impl InitListener for RecordingInitListener {
    fn on_init(&self, _context: &PlatformContext, container: Arc<Container>) {
        self.inits.lock().push(container.id());
    }

    fn on_error(&self, error: SocializeError) {
        self.errors.lock().push(error);
    }
}

#[derive(Default)]
struct RecordingAuthListener {
    successes: Mutex<Vec<Arc<Session>>>,
    fails: Mutex<Vec<SocializeError>>,
    errors: Mutex<Vec<SocializeError>>,
}

impl AuthListener for RecordingAuthListener {
    fn on_auth_success(&self, session: Arc<Session>) {
        self.successes.lock().push(session);
    }

    fn on_auth_fail(&self, error: SocializeError) {
        self.fails.lock().push(error);
    }

    fn on_error(&self, error: SocializeError) {
        self.errors.lock().push(error);
    }
}

#[derive(Default)]
struct RecordingHook {
    pauses: AtomicUsize,
    resumes: AtomicUsize,
}

#[async_trait]
impl LifecycleHook for RecordingHook {
    async fn on_pause(&self, _context: &PlatformContext) -> Result<()> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_resume(&self, _context: &PlatformContext) -> Result<()> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifications {
    checks: AtomicUsize,
    dispatched: Mutex<Vec<BroadcastIntent>>,
}

#[async_trait]
impl NotificationChecker for RecordingNotifications {
    async fn check_registrations(&self, _context: &PlatformContext, _config: &Configuration) -> Result<()> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotifications {
    async fn dispatch(&self, _context: &PlatformContext, intent: &BroadcastIntent) -> Result<()> {
        self.dispatched.lock().push(intent.clone());
        Ok(())
    }
}

struct Fixture {
    service: Arc<SocializeService>,
    user_system: Arc<FakeUserSystem>,
    cache: Arc<RecordingCache>,
    hook: Arc<RecordingHook>,
    notifications: Arc<RecordingNotifications>,
    context: PlatformContext,
}

fn fixture() -> Fixture {
    fixture_with(SocializeOptions::default(), false)
}

fn fixture_with(options: SocializeOptions, failing_cache: bool) -> Fixture {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let user_system = Arc::new(FakeUserSystem::default());
    let cache = Arc::new(RecordingCache {
        fail_clear: failing_cache,
        ..RecordingCache::default()
    });
    let hook = Arc::new(RecordingHook::default());
    let notifications = Arc::new(RecordingNotifications::default());

    let core = {
        let user_system = user_system.clone();
        let hook = hook.clone();
        let notifications = notifications.clone();
        move |_: &PlatformContext, builder: &mut ContainerBuilder| -> Result<()> {
            builder
                .set_property(CONSUMER_KEY, "consumer-key")
                .set_property(CONSUMER_SECRET, "consumer-secret")
                .user_system(user_system.clone())
                .lifecycle_hook(hook.clone())
                .notification_checker(notifications.clone())
                .notification_dispatcher(notifications.clone());
            Ok(())
        }
    };
    let facebook = {
        let cache = cache.clone();
        move |_: &PlatformContext, builder: &mut ContainerBuilder| -> Result<()> {
            builder
                .set_property(FACEBOOK_APP_ID, "fb-app")
                .auth_provider(Arc::new(FacebookAuthProvider::new(cache.clone())));
            Ok(())
        }
    };
    let twitter = {
        let cache = cache.clone();
        move |_: &PlatformContext, builder: &mut ContainerBuilder| -> Result<()> {
            builder
                .set_property(TWITTER_CONSUMER_KEY, "tw-key")
                .set_property(TWITTER_CONSUMER_SECRET, "tw-secret")
                .auth_provider(Arc::new(TwitterAuthProvider::new(cache.clone())));
            Ok(())
        }
    };
    let unconfigured = {
        let cache = cache.clone();
        move |_: &PlatformContext, builder: &mut ContainerBuilder| -> Result<()> {
            builder.auth_provider(Arc::new(FacebookAuthProvider::new(cache.clone())));
            Ok(())
        }
    };

    let service = SocializeService::builder()
        .options(options)
        .bean_source(CORE, Arc::new(core))
        .bean_source(FACEBOOK, Arc::new(facebook))
        .bean_source(TWITTER, Arc::new(twitter))
        .bean_source(FACEBOOK_UNCONFIGURED, Arc::new(unconfigured))
        .bean_source(
            BROKEN,
            Arc::new(|_: &PlatformContext, _: &mut ContainerBuilder| -> Result<()> {
                Err(SocializeError::Config("malformed bean definition".to_string()))
            }),
        )
        .build();

    Fixture {
        service,
        user_system,
        cache,
        hook,
        notifications,
        context: PlatformContext::new("com.example.app"),
    }
}

fn paths(items: &[&str]) -> Option<InitPaths> {
    Some(InitPaths::new(items.iter().copied()))
}

fn drain(receiver: &mut broadcast::Receiver<SocializeEvent>) -> Vec<&'static str> {
    let mut types = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        types.push(event.event_type());
    }
    types
}

// ========== 初始化 ==========

#[tokio::test]
async fn test_subset_paths_reuse_container() {
    let f = fixture();
    let mut events = f.service.subscribe_events();

    let first = f
        .service
        .initialize(&f.context, paths(&[CORE, FACEBOOK]))
        .await
        .unwrap();
    let second = f.service.initialize(&f.context, paths(&[CORE])).await.unwrap();

    assert_eq!(first.id(), second.id());
    assert_eq!(f.service.init_count().await, 2);
    assert_eq!(f.service.init_paths().await, paths(&[CORE, FACEBOOK]));
    assert_eq!(drain(&mut events), vec!["initialized", "reinitialized"]);
}

#[tokio::test]
async fn test_new_path_rebuilds_with_union() {
    let f = fixture();
    let mut events = f.service.subscribe_events();

    let first = f.service.initialize(&f.context, paths(&[CORE])).await.unwrap();
    f.service.initialize(&f.context, paths(&[CORE])).await;
    assert_eq!(f.service.init_count().await, 2);

    let second = f.service.initialize(&f.context, paths(&[FACEBOOK])).await.unwrap();

    assert_ne!(first.id(), second.id());
    assert!(first.is_destroyed());
    assert_eq!(f.service.init_count().await, 1);
    assert_eq!(f.service.init_paths().await, paths(&[CORE, FACEBOOK]));
    assert!(f.service.is_supported(AuthProviderType::Facebook).await);
    assert_eq!(
        drain(&mut events),
        vec!["initialized", "reinitialized", "destroyed", "initialized"]
    );
}

#[tokio::test]
async fn test_rebuild_discards_session() {
    let f = fixture();
    f.service.initialize(&f.context, paths(&[CORE])).await;
    f.service
        .authenticate(&f.context, AuthProviderType::Socialize, None, &[])
        .await;
    assert!(f.service.is_authenticated().await);

    f.service.initialize(&f.context, paths(&[TWITTER])).await;
    assert!(f.service.is_initialized().await);
    assert!(!f.service.is_authenticated().await);
}

#[tokio::test]
async fn test_destroy_matches_init_count() {
    let f = fixture();
    let mut container = None;
    for _ in 0..3 {
        container = f.service.initialize(&f.context, paths(&[CORE])).await;
    }
    let container = container.unwrap();
    assert_eq!(f.service.init_count().await, 3);

    f.service.destroy().await;
    assert!(f.service.is_initialized().await);
    assert_eq!(f.service.init_count().await, 2);

    f.service.destroy().await;
    assert!(f.service.is_initialized().await);
    assert_eq!(f.service.init_count().await, 1);
    assert!(!container.is_destroyed());

    f.service.destroy().await;
    assert!(!f.service.is_initialized().await);
    assert_eq!(f.service.init_count().await, 0);
    assert!(container.is_destroyed());
    assert!(f.service.container().await.is_none());

    // 未初始化时再次销毁无效果
    f.service.destroy().await;
    assert!(!f.service.is_initialized().await);
}

#[tokio::test]
async fn test_force_destroy_ignores_count_and_clears_session() {
    let f = fixture();
    f.service.initialize(&f.context, paths(&[CORE])).await;
    f.service.initialize(&f.context, paths(&[CORE])).await;
    assert_ok!(f.service.authenticate_synchronous(&f.context).await);
    assert!(f.service.is_authenticated().await);

    f.service.destroy_with(true).await;

    assert!(!f.service.is_initialized().await);
    assert!(!f.service.is_authenticated().await);
    assert!(f.service.session().await.is_none());
}

#[tokio::test]
async fn test_null_paths_changes_nothing() {
    let f = fixture();
    assert!(f.service.initialize(&f.context, None).await.is_none());
    assert!(!f.service.is_initialized().await);

    let container = f.service.initialize(&f.context, paths(&[CORE])).await.unwrap();
    let same = f.service.initialize(&f.context, None).await.unwrap();
    assert_eq!(container.id(), same.id());
    assert_eq!(f.service.init_count().await, 1);
}

#[tokio::test]
async fn test_low_density_device_rejected() {
    let f = fixture();
    let ldpi = PlatformContext::new("com.example.app").with_density(DisplayDensity::Low);

    let err = assert_err!(f.service.try_initialize(&ldpi, paths(&[CORE])).await);
    assert!(matches!(err, SocializeError::UnsupportedPlatform(_)));
    assert!(f.service.initialize(&ldpi, paths(&[CORE])).await.is_none());
    assert!(!f.service.is_initialized().await);
}

#[tokio::test]
async fn test_failed_build_leaves_uninitialized() {
    let f = fixture();

    let err = assert_err!(f.service.try_initialize(&f.context, paths(&[CORE, BROKEN])).await);
    assert!(matches!(err, SocializeError::Config(_)));

    let err = assert_err!(f.service.try_initialize(&f.context, paths(&["missing.xml"])).await);
    assert!(matches!(err, SocializeError::Config(_)));

    assert!(!f.service.is_initialized().await);
    assert!(f.service.container().await.is_none());
}

#[tokio::test]
async fn test_provider_validation_failure_leaves_uninitialized() {
    let f = fixture();

    let err = assert_err!(
        f.service
            .try_initialize(&f.context, paths(&[CORE, FACEBOOK_UNCONFIGURED]))
            .await
    );
    assert!(matches!(err, SocializeError::Validation(_)));
    assert!(!f.service.is_initialized().await);
    assert!(f.service.container().await.is_none());
    assert_eq!(f.service.init_count().await, 0);
}

#[tokio::test]
async fn test_external_config_fills_missing_keys() {
    let options = SocializeOptions::builder()
        .property(FACEBOOK_APP_ID, "from-host")
        .consumer_key("host-key")
        .build();
    let f = fixture_with(options, false);

    assert_ok!(
        f.service
            .try_initialize(&f.context, paths(&[CORE, FACEBOOK_UNCONFIGURED]))
            .await
    );
    let config = f.service.config().await;
    assert_eq!(config.get(FACEBOOK_APP_ID), Some("from-host"));
    // 容器配置优先
    assert_eq!(config.consumer_key(), Some("consumer-key"));

    f.service.set_property(TWITTER_CONSUMER_KEY, "late").await;
    f.service.set_property(CONSUMER_KEY, "ignored").await;
    let config = f.service.config().await;
    assert_eq!(config.get(TWITTER_CONSUMER_KEY), Some("late"));
    assert_eq!(config.consumer_key(), Some("consumer-key"));

    f.service.destroy().await;
    assert!(!f.service.config().await.contains(TWITTER_CONSUMER_KEY));
}

#[tokio::test]
async fn test_registered_listener_notified_on_every_init() {
    let f = fixture();
    let listener = Arc::new(RecordingInitListener::default());
    f.service.set_init_listener(Some(listener.clone()));

    let container = f.service.initialize(&f.context, paths(&[CORE])).await.unwrap();
    f.service.initialize(&f.context, paths(&[CORE])).await;
    f.service.initialize(&f.context, None).await;

    assert_eq!(*listener.inits.lock(), vec![container.id(), container.id()]);
    assert!(listener.errors.lock().is_empty());
}

#[tokio::test]
async fn test_initialize_async_reports_through_listener() {
    let f = fixture();
    let listener = Arc::new(RecordingInitListener::default());

    let handle = f
        .service
        .initialize_async(f.context.clone(), paths(&[CORE]), listener.clone());
    handle.await.unwrap();

    assert_eq!(listener.inits.lock().len(), 1);
    assert!(f.service.is_initialized().await);

    let failing = Arc::new(RecordingInitListener::default());
    let ldpi = PlatformContext::new("com.example.app").with_density(DisplayDensity::Low);
    f.service
        .initialize_async(ldpi, paths(&[CORE]), failing.clone())
        .await
        .unwrap();
    assert!(failing.inits.lock().is_empty());
    assert!(matches!(
        failing.errors.lock().first(),
        Some(SocializeError::UnsupportedPlatform(_))
    ));

    let skipped = Arc::new(RecordingInitListener::default());
    f.service
        .initialize_async(f.context.clone(), None, skipped.clone())
        .await
        .unwrap();
    assert_eq!(skipped.errors.lock().len(), 1);
    assert_eq!(f.service.init_count().await, 1);
}

#[tokio::test]
async fn test_concurrent_async_inits_share_one_container() {
    let f = fixture();
    let listener = Arc::new(RecordingInitListener::default());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            f.service
                .initialize_async(f.context.clone(), paths(&[CORE]), listener.clone())
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let inits = listener.inits.lock().clone();
    assert_eq!(inits.len(), 4);
    assert!(inits.iter().all(|id| *id == inits[0]));
    assert_eq!(f.service.init_count().await, 4);
}

#[tokio::test]
async fn test_adopted_container_then_path_init_recovers() {
    let f = fixture();
    let mut builder = Container::builder();
    builder
        .set_property(CONSUMER_KEY, "k")
        .set_property(CONSUMER_SECRET, "s")
        .user_system(f.user_system.clone());
    let adopted = Arc::new(builder.build(&f.context).await.unwrap());

    assert_ok!(
        f.service
            .initialize_from_container(&f.context, adopted.clone())
            .await
    );
    assert_eq!(f.service.init_count().await, 1);
    assert!(f.service.init_paths().await.is_none());

    let rebuilt = f.service.initialize(&f.context, paths(&[CORE])).await.unwrap();
    assert_ne!(rebuilt.id(), adopted.id());
    assert!(adopted.is_destroyed());
    assert_eq!(f.service.init_count().await, 1);
    assert_eq!(f.service.init_paths().await, paths(&[CORE]));
}

#[tokio::test]
async fn test_adopt_when_initialized_only_retains() {
    let f = fixture();
    let current = f.service.initialize(&f.context, paths(&[CORE])).await.unwrap();
    let ignored = Arc::new(Container::builder().build(&f.context).await.unwrap());

    assert_ok!(f.service.initialize_from_container(&f.context, ignored).await);
    assert_eq!(f.service.init_count().await, 2);
    assert_eq!(f.service.container().await.unwrap().id(), current.id());
}

#[tokio::test]
async fn test_is_initialized_for_tracks_latest_context() {
    let f = fixture();
    let other = PlatformContext::new("com.example.app");
    assert!(!f.service.is_initialized_for(&f.context).await);

    f.service.initialize(&f.context, paths(&[CORE])).await;
    assert!(f.service.is_initialized_for(&f.context).await);
    assert!(!f.service.is_initialized_for(&other).await);

    f.service.initialize(&other, paths(&[CORE])).await;
    assert!(f.service.is_initialized_for(&other).await);

    f.service.destroy_with(true).await;
    assert!(!f.service.is_initialized_for(&other).await);
}

#[tokio::test]
async fn test_notification_registrations_checked_on_commit() {
    let options = SocializeOptions::builder()
        .property(NOTIFICATIONS_ENABLED, "true")
        .build();
    let f = fixture_with(options, false);

    f.service.initialize(&f.context, paths(&[CORE])).await;
    f.service.initialize(&f.context, paths(&[CORE])).await;
    assert_eq!(f.notifications.checks.load(Ordering::SeqCst), 1);

    let quiet = fixture();
    quiet.service.initialize(&quiet.context, paths(&[CORE])).await;
    assert_eq!(quiet.notifications.checks.load(Ordering::SeqCst), 0);
}

// ========== 认证 ==========

#[tokio::test]
async fn test_authenticate_socialize() {
    let f = fixture();
    f.service.initialize(&f.context, paths(&[CORE])).await;
    let mut events = f.service.subscribe_events();
    let listener = Arc::new(RecordingAuthListener::default());

    f.service
        .authenticate(&f.context, AuthProviderType::Socialize, Some(listener.clone()), &[])
        .await;

    let successes = listener.successes.lock().clone();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].consumer_key, "consumer-key");
    assert_eq!(successes[0].auth_provider_type, Some(AuthProviderType::Socialize));
    assert!(f.service.is_authenticated().await);
    assert!(f.service.is_authenticated_for(AuthProviderType::Socialize).await);
    assert!(!f.service.is_authenticated_for(AuthProviderType::Facebook).await);
    assert_eq!(drain(&mut events), vec!["authenticated"]);

    assert_ok!(f.service.save_session(&f.context).await);
    assert_eq!(f.user_system.saved.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_authenticate_before_init_reports_error() {
    let f = fixture();
    let listener = Arc::new(RecordingAuthListener::default());

    f.service
        .authenticate(&f.context, AuthProviderType::Socialize, Some(listener.clone()), &[])
        .await;

    assert!(listener.successes.lock().is_empty());
    assert!(listener.fails.lock().is_empty());
    assert!(matches!(
        listener.errors.lock().first(),
        Some(SocializeError::NotInitialized(_))
    ));
    assert!(!f.service.is_authenticated().await);
    assert!(matches!(
        f.service.require_session().await,
        Err(SocializeError::NotAuthenticated(_))
    ));
}

#[tokio::test]
async fn test_unregistered_provider_reports_error() {
    let f = fixture();
    f.service.initialize(&f.context, paths(&[CORE])).await;
    let listener = Arc::new(RecordingAuthListener::default());

    f.service
        .authenticate(&f.context, AuthProviderType::Twitter, Some(listener.clone()), &[])
        .await;

    assert!(matches!(
        listener.errors.lock().first(),
        Some(SocializeError::UnsupportedProvider(AuthProviderType::Twitter))
    ));
    assert!(!f.service.is_supported(AuthProviderType::Twitter).await);
}

#[tokio::test]
async fn test_rejected_credentials_report_auth_fail() {
    let f = fixture();
    f.service.initialize(&f.context, paths(&[CORE])).await;
    f.user_system.reject.store(true, Ordering::SeqCst);
    let listener = Arc::new(RecordingAuthListener::default());

    f.service
        .authenticate(&f.context, AuthProviderType::Socialize, Some(listener.clone()), &[])
        .await;

    assert!(matches!(
        listener.fails.lock().first(),
        Some(SocializeError::Auth(_))
    ));
    assert!(listener.errors.lock().is_empty());
    assert!(!f.service.is_authenticated().await);

    let err = assert_err!(f.service.authenticate_synchronous(&f.context).await);
    assert!(matches!(err, SocializeError::Auth(_)));
}

#[tokio::test]
async fn test_authenticate_synchronous_requires_user_system() {
    let f = fixture();
    let err = assert_err!(f.service.authenticate_synchronous(&f.context).await);
    assert!(matches!(err, SocializeError::NotInitialized(_)));

    f.service.initialize(&f.context, paths(&[CORE])).await;
    let session = assert_ok!(f.service.authenticate_synchronous(&f.context).await);
    assert_eq!(session.user.as_ref().map(|user| user.id), Some(42));
    assert_eq!(f.service.require_session().await.unwrap(), session);
}

#[tokio::test]
async fn test_known_user_and_explicit_credentials() {
    let f = fixture();
    f.service
        .initialize(&f.context, paths(&[CORE, TWITTER]))
        .await;
    let listener = Arc::new(RecordingAuthListener::default());

    let credentials = UserProviderCredentials::new(AuthProviderInfo::new(AuthProviderType::Twitter))
        .with_user_id("tw-1")
        .with_access_token("tw-token");
    f.service
        .authenticate_known_user(&f.context, credentials, Some(listener.clone()))
        .await;
    assert!(f.service.is_authenticated_for(AuthProviderType::Twitter).await);

    f.service
        .authenticate_with_credentials(
            &f.context,
            "other-key",
            "other-secret",
            AuthProviderInfo::new(AuthProviderType::Facebook),
            Some(listener.clone()),
        )
        .await;
    assert!(matches!(
        listener.errors.lock().first(),
        Some(SocializeError::UnsupportedProvider(AuthProviderType::Facebook))
    ));

    f.service
        .authenticate_with_credentials(
            &f.context,
            "other-key",
            "other-secret",
            AuthProviderInfo::new(AuthProviderType::Socialize),
            Some(listener.clone()),
        )
        .await;
    let session = f.service.session().await.unwrap();
    assert_eq!(session.consumer_key, "other-key");
    // 同一用户，先前的 Twitter 凭证被保留
    assert!(session.covers(AuthProviderType::Twitter));
    assert_eq!(listener.successes.lock().len(), 2);
}

#[tokio::test]
async fn test_multi_provider_session_and_single_clear() {
    let f = fixture();
    f.service
        .initialize(&f.context, paths(&[CORE, FACEBOOK, TWITTER]))
        .await;

    f.service
        .authenticate(&f.context, AuthProviderType::Facebook, None, &[])
        .await;
    f.service
        .authenticate(&f.context, AuthProviderType::Twitter, None, &["read"])
        .await;

    assert!(f.service.is_authenticated_for(AuthProviderType::Facebook).await);
    assert!(f.service.is_authenticated_for(AuthProviderType::Twitter).await);

    let session = f.service.session().await.unwrap();
    let facebook = session.credentials(AuthProviderType::Facebook).unwrap();
    let info = facebook.provider_info.as_ref().unwrap();
    assert_eq!(info.app_id.as_deref(), Some("fb-app"));
    assert_eq!(info.permissions, vec!["offline_access", "publish_stream"]);

    let mut events = f.service.subscribe_events();
    let report = f
        .service
        .clear_third_party_session(&f.context, AuthProviderType::Facebook)
        .await;

    assert!(report.is_clean());
    assert_eq!(report.cleared_providers, vec![AuthProviderType::Facebook]);
    assert!(!f.service.is_authenticated_for(AuthProviderType::Facebook).await);
    assert!(f.service.is_authenticated_for(AuthProviderType::Twitter).await);
    assert!(f.service.is_authenticated().await);
    assert_eq!(f.cache.cleared.load(Ordering::SeqCst), 1);
    assert_eq!(
        *f.user_system.cleared.lock(),
        vec![Some(AuthProviderType::Facebook)]
    );
    assert_eq!(drain(&mut events), vec!["provider_session_cleared"]);
}

#[tokio::test]
async fn test_failing_native_cache_still_clears_credentials() {
    let f = fixture_with(SocializeOptions::default(), true);
    f.service
        .initialize(&f.context, paths(&[CORE, FACEBOOK]))
        .await;
    f.service
        .authenticate(&f.context, AuthProviderType::Facebook, None, &[])
        .await;
    assert!(f.service.is_authenticated_for(AuthProviderType::Facebook).await);

    let report = f
        .service
        .clear_third_party_session(&f.context, AuthProviderType::Facebook)
        .await;

    assert!(!report.is_clean());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, CleanupStage::NativeCache);
    assert_eq!(report.failures[0].provider, Some(AuthProviderType::Facebook));
    assert!(!f.service.is_authenticated_for(AuthProviderType::Facebook).await);
    assert_eq!(
        *f.user_system.cleared.lock(),
        vec![Some(AuthProviderType::Facebook)]
    );
}

#[tokio::test]
async fn test_clear_session_cache_discards_everything() {
    let f = fixture_with(SocializeOptions::default(), true);
    f.service
        .initialize(&f.context, paths(&[CORE, FACEBOOK, TWITTER]))
        .await;
    f.service
        .authenticate(&f.context, AuthProviderType::Facebook, None, &[])
        .await;
    f.service
        .authenticate(&f.context, AuthProviderType::Twitter, None, &[])
        .await;

    let report = f.service.clear_session_cache(&f.context).await;

    assert!(report.session_discarded);
    assert_eq!(
        report.cleared_providers,
        vec![AuthProviderType::Facebook, AuthProviderType::Twitter]
    );
    assert_eq!(report.failures.len(), 2);
    assert!(report
        .failures
        .iter()
        .all(|failure| failure.stage == CleanupStage::NativeCache));
    assert!(!f.service.is_authenticated().await);
    assert_eq!(
        *f.user_system.cleared.lock(),
        vec![
            Some(AuthProviderType::Facebook),
            Some(AuthProviderType::Twitter),
            None
        ]
    );

    // 没有 Session 时只清持久化数据
    let report = f.service.clear_session_cache(&f.context).await;
    assert!(!report.session_discarded);
    assert!(report.cleared_providers.is_empty());
}

#[tokio::test]
async fn test_destroy_waits_for_inflight_authentication() {
    let f = fixture();
    f.service.initialize(&f.context, paths(&[CORE])).await;

    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    *f.user_system.gate.lock() = Some((entered.clone(), release.clone()));

    let listener = Arc::new(RecordingAuthListener::default());
    let auth = {
        let service = f.service.clone();
        let context = f.context.clone();
        let listener = listener.clone();
        tokio::spawn(async move {
            service
                .authenticate(&context, AuthProviderType::Socialize, Some(listener), &[])
                .await;
        })
    };
    entered.notified().await;

    // 认证进行中查询不受影响
    assert!(f.service.is_initialized().await);
    assert!(f.service.session().await.is_none());

    let destroy = {
        let service = f.service.clone();
        tokio::spawn(async move { service.destroy().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!destroy.is_finished());
    assert_eq!(f.service.init_count().await, 1);

    release.notify_one();
    auth.await.unwrap();
    destroy.await.unwrap();

    assert_eq!(listener.successes.lock().len(), 1);
    assert!(listener.errors.lock().is_empty());
    assert!(!f.service.is_initialized().await);
    assert!(f.service.session().await.is_none());
}

// ========== 宿主生命周期 ==========

#[tokio::test]
async fn test_pause_and_resume() {
    let f = fixture();
    f.service
        .initialize(&f.context, paths(&[CORE, FACEBOOK]))
        .await;

    // 未暂停时恢复无效果
    f.service.on_resume(&f.context).await;
    assert_eq!(f.cache.extended.load(Ordering::SeqCst), 0);
    assert_eq!(f.hook.resumes.load(Ordering::SeqCst), 0);

    f.service.on_pause(&f.context).await;
    assert!(f.service.is_paused());
    assert_eq!(f.hook.pauses.load(Ordering::SeqCst), 1);

    f.service.on_resume(&f.context).await;
    assert!(!f.service.is_paused());
    assert_eq!(f.cache.extended.load(Ordering::SeqCst), 1);
    assert_eq!(f.hook.resumes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_broadcast_routing() {
    let f = fixture();
    let message = BroadcastIntent::new(C2DM_MESSAGE_ACTION).with_extra(SOURCE_EXTRA, SOURCE_SOCIALIZE);
    let registration = BroadcastIntent::new(C2DM_REGISTRATION_ACTION);
    let foreign = BroadcastIntent::new(C2DM_MESSAGE_ACTION).with_extra(SOURCE_EXTRA, "other");

    // 未初始化：仍按路由判断是否消费，但没有分发目标
    assert!(f.service.handle_broadcast_intent(&f.context, &message).await);

    f.service.initialize(&f.context, paths(&[CORE])).await;
    assert!(f.service.handle_broadcast_intent(&f.context, &message).await);
    assert!(!f.service.handle_broadcast_intent(&f.context, &registration).await);
    assert!(!f.service.handle_broadcast_intent(&f.context, &foreign).await);
    assert!(!f
        .service
        .handle_broadcast_intent(&f.context, &BroadcastIntent::default())
        .await);

    assert_eq!(*f.notifications.dispatched.lock(), vec![message, registration]);
}

// ========== 后台任务 ==========

#[tokio::test]
async fn test_teardown_waits_for_managed_tasks() {
    let f = fixture();
    f.service.initialize(&f.context, paths(&[CORE])).await;

    let finished = Arc::new(AtomicBool::new(false));
    {
        let finished = finished.clone();
        f.service.spawn_managed(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            finished.store(true, Ordering::SeqCst);
        });
    }
    assert_eq!(f.service.managed_task_count(), 1);

    f.service.destroy().await;
    assert!(finished.load(Ordering::SeqCst));
    assert_eq!(f.service.managed_task_count(), 0);

    // 销毁后仍可继续托管任务
    let handle = f.service.spawn_managed(async { 7 });
    assert_eq!(handle.await.unwrap(), 7);
}

#[tokio::test]
async fn test_teardown_gives_up_on_stuck_tasks() {
    let options = SocializeOptions::builder()
        .teardown_timeout(Duration::from_secs(0))
        .build();
    let f = fixture_with(options, false);
    f.service.initialize(&f.context, paths(&[CORE])).await;

    let stuck = f.service.spawn_managed(std::future::pending::<()>());
    f.service.destroy().await;

    assert!(!f.service.is_initialized().await);
    assert_eq!(f.service.managed_task_count(), 1);
    stuck.abort();
}
