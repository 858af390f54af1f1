//! Socialize 服务主接口
//!
//! [`SocializeService`] 是宿主持有的唯一上下文对象（由宿主的组合根创建一个
//! `Arc<SocializeService>` 并传递），负责：
//! - 容器的构建、复用、重建与销毁（引用计数见 [`crate::lifecycle::state`]）
//! - 认证编排与 Session 管理（见 [`auth`] 子模块）
//! - 宿主暂停/恢复、推送广播路由
//!
//! 初始化、销毁、认证与清理在 `transitions` 锁下串行执行（认证期间也持有，销毁会等待进行中的认证）；
//! 状态本身由另一把短持有的锁保护，查询不会被认证阻塞。宿主回调和事件广播都在锁释放之后进行。

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::auth::Session;
use crate::config::{Configuration, SocializeOptions};
use crate::container::{BeanSource, Container, ContainerBuilder, InitPaths, ResourceLocator};
use crate::error::{Result, SocializeError};
use crate::events::{EventBus, SocializeEvent};
use crate::lifecycle::{DestroyOutcome, InitPlan, LifecycleState};
use crate::listener::InitListener;
use crate::notifications::{BroadcastIntent, IntentRoute};
use crate::platform::{DisplayDensityChecker, PlatformChecker, PlatformContext};

mod auth;

pub use auth::{CleanupFailure, CleanupReport, CleanupStage};

#[cfg(test)]
mod tests;

/// 锁内可变状态
struct ServiceState {
    lifecycle: LifecycleState,
    container: Option<Arc<Container>>,
    /// 容器配置与外部配置合并后的快照
    config: Option<Arc<Configuration>>,
    /// 宿主在初始化前后设置的配置
    external_config: Configuration,
    session: Option<Arc<Session>>,
}

/// 一次 init 调用的结果
enum InitOutcome {
    Committed(Arc<Container>),
    Retained { container: Arc<Container>, count: u32 },
    Skipped(Option<Arc<Container>>),
}

impl InitOutcome {
    fn container(&self) -> Option<Arc<Container>> {
        match self {
            InitOutcome::Committed(container) | InitOutcome::Retained { container, .. } => {
                Some(container.clone())
            }
            InitOutcome::Skipped(container) => container.clone(),
        }
    }
}

/// Socialize 服务
pub struct SocializeService {
    options: SocializeOptions,
    locator: ResourceLocator,
    platform_checker: Arc<dyn PlatformChecker>,
    state: Mutex<ServiceState>,
    /// 串行化初始化、销毁、认证与清理；只读查询不经过它
    transitions: Mutex<()>,
    init_listener: RwLock<Option<Arc<dyn InitListener>>>,
    tasks: TaskTracker,
    events: EventBus,
    paused: AtomicBool,
}

/// Socialize 服务构建器
pub struct SocializeServiceBuilder {
    options: SocializeOptions,
    locator: ResourceLocator,
    platform_checker: Arc<dyn PlatformChecker>,
    init_listener: Option<Arc<dyn InitListener>>,
    event_capacity: usize,
}

impl SocializeServiceBuilder {
    pub fn new() -> Self {
        Self {
            options: SocializeOptions::default(),
            locator: ResourceLocator::new(),
            platform_checker: Arc::new(DisplayDensityChecker),
            init_listener: None,
            event_capacity: 64,
        }
    }

    pub fn options(mut self, options: SocializeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn locator(mut self, locator: ResourceLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn bean_source<S: Into<String>>(mut self, path: S, source: Arc<dyn BeanSource>) -> Self {
        self.locator.register(path, source);
        self
    }

    pub fn platform_checker(mut self, checker: Arc<dyn PlatformChecker>) -> Self {
        self.platform_checker = checker;
        self
    }

    pub fn init_listener(mut self, listener: Arc<dyn InitListener>) -> Self {
        self.init_listener = Some(listener);
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> Arc<SocializeService> {
        let external_config = self.options.properties.clone();
        Arc::new(SocializeService {
            options: self.options,
            locator: self.locator,
            platform_checker: self.platform_checker,
            state: Mutex::new(ServiceState {
                lifecycle: LifecycleState::Uninitialized,
                container: None,
                config: None,
                external_config,
                session: None,
            }),
            transitions: Mutex::new(()),
            init_listener: RwLock::new(self.init_listener),
            tasks: TaskTracker::new(),
            events: EventBus::new(self.event_capacity),
            paused: AtomicBool::new(false),
        })
    }
}

impl Default for SocializeServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SocializeService {
    pub fn builder() -> SocializeServiceBuilder {
        SocializeServiceBuilder::new()
    }

    pub fn options(&self) -> &SocializeOptions {
        &self.options
    }

    /// 默认 bean 配置路径
    pub fn default_paths(&self) -> InitPaths {
        InitPaths::new(self.options.default_bean_paths.iter().cloned())
    }

    /// 设置同步初始化成功后通知的监听器
    pub fn set_init_listener(&self, listener: Option<Arc<dyn InitListener>>) {
        *self.init_listener.write() = listener;
    }

    // ========== 初始化 ==========

    /// 使用默认路径初始化
    pub async fn initialize_default(&self, context: &PlatformContext) -> Option<Arc<Container>> {
        self.initialize(context, Some(self.default_paths())).await
    }

    /// 初始化，失败时记录日志并返回 `None`
    pub async fn initialize(
        &self,
        context: &PlatformContext,
        paths: Option<InitPaths>,
    ) -> Option<Arc<Container>> {
        match self.try_initialize(context, paths).await {
            Ok(container) => container,
            Err(e) => {
                error!("❌ Socialize 初始化失败: {}", e);
                None
            }
        }
    }

    /// 初始化，错误返回给调用方
    ///
    /// `paths` 为 `None` 时不改变任何状态，返回当前容器。
    pub async fn try_initialize(
        &self,
        context: &PlatformContext,
        paths: Option<InitPaths>,
    ) -> Result<Option<Arc<Container>>> {
        let outcome = self.run_initialize(context, paths).await?;
        let container = outcome.container();

        if !matches!(outcome, InitOutcome::Skipped(_)) {
            let listener = self.init_listener.read().clone();
            if let (Some(listener), Some(container)) = (listener, container.clone()) {
                listener.on_init(context, container);
            }
        }

        Ok(container)
    }

    /// 在后台任务中初始化，结果只通过 `listener` 返回
    ///
    /// 任务一旦开始就会执行到底，无法取消；多个并发调用各自独立执行，在服务锁上排队。
    pub fn initialize_async(
        self: &Arc<Self>,
        context: PlatformContext,
        paths: Option<InitPaths>,
        listener: Arc<dyn InitListener>,
    ) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            match service.run_initialize(&context, paths).await {
                Ok(InitOutcome::Skipped(_)) => listener.on_error(SocializeError::Config(
                    "Attempt to initialize Socialize with null bean config paths".to_string(),
                )),
                Ok(outcome) => match outcome.container() {
                    Some(container) => listener.on_init(&context, container),
                    None => listener.on_error(SocializeError::NotInitialized(
                        "Socialize container unavailable".to_string(),
                    )),
                },
                Err(e) => {
                    error!("❌ Socialize 异步初始化失败: {}", e);
                    listener.on_error(e);
                }
            }
        })
    }

    /// 采用外部构建的容器
    ///
    /// 已初始化时只增加引用计数，传入的容器被忽略。采用的容器没有路径记录，
    /// 之后再按路径初始化会触发整体重建。
    pub async fn initialize_from_container(
        &self,
        context: &PlatformContext,
        container: Arc<Container>,
    ) -> Result<()> {
        let outcome = {
            let _transition = self.transitions.lock().await;
            let mut state = self.state.lock().await;
            if state.lifecycle.is_initialized() {
                debug!("Socialize 已初始化，忽略外部容器 {}", container.id());
                let count = state.lifecycle.retain();
                match state.container.clone() {
                    Some(current) => {
                        current.set_context(context);
                        InitOutcome::Retained {
                            container: current,
                            count,
                        }
                    }
                    None => InitOutcome::Skipped(None),
                }
            } else {
                let paths = container.paths().cloned();
                self.commit(&mut state, context, container, paths).await?
            }
        };

        self.publish_init(&outcome);

        let listener = self.init_listener.read().clone();
        if let (Some(listener), Some(container)) = (listener, outcome.container()) {
            listener.on_init(context, container);
        }
        Ok(())
    }

    async fn run_initialize(
        &self,
        context: &PlatformContext,
        paths: Option<InitPaths>,
    ) -> Result<InitOutcome> {
        self.platform_checker.check_supported(context)?;

        let Some(requested) = paths else {
            error!("Attempt to initialize Socialize with null bean config paths");
            let state = self.state.lock().await;
            return Ok(InitOutcome::Skipped(state.container.clone()));
        };

        let outcome = {
            let _transition = self.transitions.lock().await;
            let mut state = self.state.lock().await;

            match (state.lifecycle.plan(&requested), state.container.clone()) {
                (InitPlan::Reuse, Some(container)) => {
                    let count = state.lifecycle.retain();
                    container.set_context(context);
                    debug!("Socialize 已覆盖路径 {}，引用计数: {}", requested, count);
                    InitOutcome::Retained { container, count }
                }
                (InitPlan::Reuse, None) => {
                    self.rebuild(&mut state, context, InitPlan::Recover(requested))
                        .await?
                }
                (plan, _) => self.rebuild(&mut state, context, plan).await?,
            }
        };

        self.publish_init(&outcome);
        Ok(outcome)
    }

    /// 按计划（重新）构建容器，调用方持有锁
    async fn rebuild(
        &self,
        state: &mut MutexGuard<'_, ServiceState>,
        context: &PlatformContext,
        plan: InitPlan,
    ) -> Result<InitOutcome> {
        match &plan {
            InitPlan::Rebuild { new_path, .. } => {
                info!("🔄 New path found for beans [{}]. Re-initializing Socialize", new_path);
                self.discard_container(state).await;
            }
            InitPlan::Recover(_) => {
                error!("❌ Socialize reported as initialized, but no init paths were found. This should not happen!");
                self.discard_container(state).await;
            }
            InitPlan::Build(_) | InitPlan::Reuse => {}
        }

        let paths = plan
            .build_paths()
            .cloned()
            .ok_or_else(|| SocializeError::Config("empty init plan".to_string()))?;

        for path in paths.iter() {
            debug!("Initializing Socialize with path [{}]", path);
        }

        let container = ContainerBuilder::load(context, &self.locator, &paths)?
            .build(context)
            .await?;

        self.commit(state, context, Arc::new(container), Some(paths)).await
    }

    /// 提交新容器：合并配置、校验 Provider、计数置 1、检查推送注册
    ///
    /// Provider 校验失败时新容器被销毁，状态保持未初始化。
    async fn commit(
        &self,
        state: &mut MutexGuard<'_, ServiceState>,
        context: &PlatformContext,
        container: Arc<Container>,
        paths: Option<InitPaths>,
    ) -> Result<InitOutcome> {
        let mut merged = (*container.config()).clone();
        merged.merge(&state.external_config);

        if let Err(e) = container.auth_providers().validate_all(&merged) {
            warn!("⚠️ 第三方认证配置校验失败: {}", e);
            container.destroy().await;
            return Err(e);
        }

        let merged = Arc::new(merged);
        container.set_context(context);
        state.container = Some(container.clone());
        state.config = Some(merged.clone());
        state.lifecycle.commit(paths);

        if merged.notifications_enabled() {
            if let Some(checker) = container.notification_checker() {
                if let Err(e) = checker.check_registrations(context, &merged).await {
                    warn!("⚠️ 推送注册检查失败: {}", e);
                }
            }
        }

        info!(
            "✅ Socialize 初始化完成: container={}, paths={}",
            container.id(),
            state
                .lifecycle
                .paths()
                .map(|p| p.to_string())
                .unwrap_or_else(|| "<external>".to_string())
        );
        Ok(InitOutcome::Committed(container))
    }

    /// 在锁内销毁当前容器并回到未初始化状态（重建前调用）
    async fn discard_container(&self, state: &mut MutexGuard<'_, ServiceState>) {
        state.lifecycle.reset();
        state.config = None;
        state.session = None;
        if let Some(container) = state.container.take() {
            debug!("Destroying container {}", container.id());
            container.destroy().await;
            self.events.publish(SocializeEvent::Destroyed {
                container_id: Some(container.id()),
                timestamp: SocializeEvent::now(),
            });
        }
    }

    fn publish_init(&self, outcome: &InitOutcome) {
        let event = match outcome {
            InitOutcome::Committed(container) => SocializeEvent::Initialized {
                container_id: container.id(),
                paths: container
                    .paths()
                    .map(|p| p.iter().map(str::to_string).collect())
                    .unwrap_or_default(),
                timestamp: SocializeEvent::now(),
            },
            InitOutcome::Retained { count, .. } => SocializeEvent::Reinitialized {
                init_count: *count,
                timestamp: SocializeEvent::now(),
            },
            InitOutcome::Skipped(_) => return,
        };
        self.events.publish(event);
    }

    // ========== 销毁 ==========

    /// 引用计数 - 1，归零时整体销毁
    pub async fn destroy(&self) {
        self.destroy_with(false).await
    }

    /// `force` 为 true 时无视引用计数直接销毁
    pub async fn destroy_with(&self, force: bool) {
        let container = {
            let _transition = self.transitions.lock().await;
            let mut state = self.state.lock().await;
            let outcome = state.lifecycle.release(force);
            match outcome {
                DestroyOutcome::Retained { remaining } => {
                    drop(state);
                    debug!("Socialize 引用计数: {}", remaining);
                    self.events.publish(SocializeEvent::Released {
                        init_count: remaining,
                        timestamp: SocializeEvent::now(),
                    });
                    return;
                }
                DestroyOutcome::TearDown => {
                    state.config = None;
                    state.session = None;
                    state.external_config = self.options.properties.clone();
                    state.container.take()
                }
            }
        };

        self.drain_tasks().await;

        let container_id = match container {
            Some(container) => {
                container.destroy().await;
                Some(container.id())
            }
            None => None,
        };

        info!("✅ Socialize 已销毁");
        self.events.publish(SocializeEvent::Destroyed {
            container_id,
            timestamp: SocializeEvent::now(),
        });
    }

    /// 等待托管任务结束，超过上限的任务被放弃
    async fn drain_tasks(&self) {
        if self.tasks.is_empty() {
            return;
        }

        let timeout = self.options.teardown_timeout();
        info!("🔄 等待 {} 个后台任务结束（最多 {:?}）", self.tasks.len(), timeout);

        self.tasks.close();
        if tokio::time::timeout(timeout, self.tasks.wait()).await.is_err() {
            warn!("⚠️ {} 个后台任务未在 {:?} 内结束，已放弃等待", self.tasks.len(), timeout);
        }
        self.tasks.reopen();
    }

    /// 运行一个随服务销毁而被等待的后台任务
    pub fn spawn_managed<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tasks.spawn(task)
    }

    /// 正在运行的托管任务数
    pub fn managed_task_count(&self) -> usize {
        self.tasks.len()
    }

    // ========== 状态查询 ==========

    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.lifecycle.is_initialized()
    }

    /// 已初始化且容器当前的宿主上下文就是 `context`
    pub async fn is_initialized_for(&self, context: &PlatformContext) -> bool {
        let state = self.state.lock().await;
        if !state.lifecycle.is_initialized() {
            return false;
        }
        state
            .container
            .as_ref()
            .and_then(|container| container.context())
            .map(|current| current == *context)
            .unwrap_or(false)
    }

    pub async fn init_count(&self) -> u32 {
        self.state.lock().await.lifecycle.count()
    }

    /// 已加载的 bean 配置路径
    pub async fn init_paths(&self) -> Option<InitPaths> {
        self.state.lock().await.lifecycle.paths().cloned()
    }

    pub async fn container(&self) -> Option<Arc<Container>> {
        self.state.lock().await.container.clone()
    }

    /// 当前配置：已初始化时为合并后的快照，否则为外部设置的配置
    pub async fn config(&self) -> Arc<Configuration> {
        let state = self.state.lock().await;
        match state.config.as_ref() {
            Some(config) => config.clone(),
            None => Arc::new(state.external_config.clone()),
        }
    }

    /// 设置外部配置项
    ///
    /// 已初始化时，容器中没有该键才会写入当前快照（容器配置优先）。
    pub async fn set_property<K: Into<String>, V: Into<String>>(&self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        let mut state = self.state.lock().await;
        state.external_config.set(key.clone(), value.clone());

        let container_has_key = state
            .container
            .as_ref()
            .map(|container| container.config().contains(&key))
            .unwrap_or(false);
        if container_has_key {
            return;
        }
        if let Some(config) = state.config.as_ref() {
            let mut next = (**config).clone();
            next.set(key, value);
            state.config = Some(Arc::new(next));
        }
    }

    // ========== 事件 ==========

    pub fn subscribe_events(&self) -> broadcast::Receiver<SocializeEvent> {
        self.events.subscribe()
    }

    // ========== 宿主生命周期 ==========

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// 宿主进入暂停：通知生命周期 Hook（定位服务等）
    pub async fn on_pause(&self, context: &PlatformContext) {
        self.paused.store(true, Ordering::SeqCst);

        let Some(container) = self.container().await else {
            return;
        };
        if let Err(e) = container.lifecycle().notify_pause(context).await {
            warn!("⚠️ 暂停处理失败: {}", e);
        }
    }

    /// 宿主恢复：刷新第三方 token，通知生命周期 Hook
    ///
    /// 只有之前处于暂停状态时才执行。
    pub async fn on_resume(&self, context: &PlatformContext) {
        if !self.paused.swap(false, Ordering::SeqCst) {
            return;
        }

        let Some(container) = self.container().await else {
            return;
        };

        let registry = container.auth_providers();
        for provider in registry.providers() {
            if let Err(e) = provider.refresh(context).await {
                error!("❌ Error occurred on resume ({}): {}", provider.provider_type(), e);
            }
        }

        if let Err(e) = container.lifecycle().notify_resume(context).await {
            warn!("⚠️ 恢复处理失败: {}", e);
        }
    }

    // ========== 推送广播 ==========

    /// 处理宿主收到的系统广播
    ///
    /// 返回 `true` 表示广播属于 Socialize 且已被消费。
    pub async fn handle_broadcast_intent(
        &self,
        context: &PlatformContext,
        intent: &BroadcastIntent,
    ) -> bool {
        let route = IntentRoute::of(intent);
        if route == IntentRoute::Ignore {
            return false;
        }

        let dispatcher = self
            .container()
            .await
            .and_then(|container| container.notification_dispatcher());
        match dispatcher {
            Some(dispatcher) => {
                if let Err(e) = dispatcher.dispatch(context, intent).await {
                    error!("❌ 推送分发失败: {}", e);
                }
            }
            None => warn!("⚠️ 收到 Socialize 推送，但没有装配通知分发服务"),
        }

        route.consumed()
    }
}
