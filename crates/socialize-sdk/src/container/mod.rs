//! 依赖容器
//!
//! 每个 bean 配置路径对应一个 [`BeanSource`]，由 [`ResourceLocator`] 按路径查找。
//! 构建时每个来源向 [`ContainerBuilder`] 的类型化槽位写入服务，最终得到一个 [`Container`]，
//! 它独占本次初始化周期内的全部服务实例。

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::asserter::InitializationAsserter;
use crate::auth::{
    AuthProvider, AuthProviderRegistry, AuthProviderType, SocializeAuthProvider, UserSystem,
};
use crate::config::Configuration;
use crate::error::{Result, SocializeError};
use crate::lifecycle::{LifecycleHook, LifecycleManager};
use crate::notifications::{NotificationChecker, NotificationDispatcher};
use crate::platform::PlatformContext;

mod paths;

pub use paths::InitPaths;

/// 一组服务装配定义
pub trait BeanSource: Send + Sync {
    fn configure(&self, context: &PlatformContext, builder: &mut ContainerBuilder) -> Result<()>;
}

impl<F> BeanSource for F
where
    F: Fn(&PlatformContext, &mut ContainerBuilder) -> Result<()> + Send + Sync,
{
    fn configure(&self, context: &PlatformContext, builder: &mut ContainerBuilder) -> Result<()> {
        self(context, builder)
    }
}

/// 随容器启动和销毁的服务
#[async_trait]
pub trait ManagedService: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&self, _context: &PlatformContext) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()>;
}

/// 路径 → bean 来源
#[derive(Clone, Default)]
pub struct ResourceLocator {
    sources: HashMap<String, Arc<dyn BeanSource>>,
}

impl ResourceLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: Into<String>>(&mut self, path: S, source: Arc<dyn BeanSource>) {
        let path = path.into();
        debug!("注册 bean 配置: {}", path);
        self.sources.insert(path, source);
    }

    pub fn with_source<S: Into<String>>(mut self, path: S, source: Arc<dyn BeanSource>) -> Self {
        self.register(path, source);
        self
    }

    pub fn contains(&self, path: &str) -> bool {
        self.sources.contains_key(path)
    }

    pub fn locate(&self, path: &str) -> Result<Arc<dyn BeanSource>> {
        self.sources
            .get(path)
            .cloned()
            .ok_or_else(|| SocializeError::Config(format!("bean 配置不存在: {}", path)))
    }
}

impl fmt::Debug for ResourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<_> = self.sources.keys().collect();
        paths.sort();
        f.debug_struct("ResourceLocator").field("paths", &paths).finish()
    }
}

/// 容器构建器
#[derive(Default)]
pub struct ContainerBuilder {
    paths: Option<InitPaths>,
    config: Configuration,
    auth_providers: AuthProviderRegistry,
    user_system: Option<Arc<dyn UserSystem>>,
    asserter: Option<Arc<dyn InitializationAsserter>>,
    notification_checker: Option<Arc<dyn NotificationChecker>>,
    notification_dispatcher: Option<Arc<dyn NotificationDispatcher>>,
    lifecycle: LifecycleManager,
    services: Vec<Arc<dyn ManagedService>>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 依次加载每个路径对应的 bean 来源
    pub fn load(
        context: &PlatformContext,
        locator: &ResourceLocator,
        paths: &InitPaths,
    ) -> Result<Self> {
        let mut builder = Self::new();
        for path in paths.iter() {
            debug!("加载 bean 配置 [{}]", path);
            locator.locate(path)?.configure(context, &mut builder)?;
        }
        builder.paths = Some(paths.clone());
        Ok(builder)
    }

    pub fn config_mut(&mut self) -> &mut Configuration {
        &mut self.config
    }

    pub fn set_property<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> &mut Self {
        self.config.set(key, value);
        self
    }

    pub fn auth_provider(&mut self, provider: Arc<dyn AuthProvider>) -> &mut Self {
        self.auth_providers.register(provider);
        self
    }

    pub fn user_system(&mut self, user_system: Arc<dyn UserSystem>) -> &mut Self {
        self.user_system = Some(user_system);
        self
    }

    pub fn asserter(&mut self, asserter: Arc<dyn InitializationAsserter>) -> &mut Self {
        self.asserter = Some(asserter);
        self
    }

    pub fn notification_checker(&mut self, checker: Arc<dyn NotificationChecker>) -> &mut Self {
        self.notification_checker = Some(checker);
        self
    }

    pub fn notification_dispatcher(
        &mut self,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> &mut Self {
        self.notification_dispatcher = Some(dispatcher);
        self
    }

    pub fn lifecycle_hook(&mut self, hook: Arc<dyn LifecycleHook>) -> &mut Self {
        self.lifecycle.register_hook(hook);
        self
    }

    pub fn managed_service(&mut self, service: Arc<dyn ManagedService>) -> &mut Self {
        self.services.push(service);
        self
    }

    /// 启动托管服务并生成容器
    ///
    /// 任一服务启动失败时，已启动的服务按逆序停止，错误返回给调用方。
    pub async fn build(mut self, context: &PlatformContext) -> Result<Container> {
        if !self.auth_providers.contains(AuthProviderType::Socialize) {
            self.auth_providers.register(Arc::new(SocializeAuthProvider));
        }

        for (index, service) in self.services.iter().enumerate() {
            if let Err(e) = service.start(context).await {
                warn!("⚠️ 服务 {} 启动失败: {}", service.name(), e);
                for started in self.services[..index].iter().rev() {
                    if let Err(stop_error) = started.stop().await {
                        warn!("⚠️ 服务 {} 停止失败: {}", started.name(), stop_error);
                    }
                }
                return Err(e);
            }
        }

        let container = Container {
            id: Uuid::new_v4(),
            paths: self.paths,
            config: Arc::new(self.config),
            auth_providers: Arc::new(self.auth_providers),
            user_system: self.user_system,
            asserter: self.asserter,
            notification_checker: self.notification_checker,
            notification_dispatcher: self.notification_dispatcher,
            lifecycle: Arc::new(self.lifecycle),
            services: self.services,
            context: RwLock::new(Some(context.clone())),
            destroyed: AtomicBool::new(false),
        };

        info!(
            "✅ 容器已构建: id={}, providers={:?}, services={}",
            container.id,
            container.auth_providers.provider_types(),
            container.services.len()
        );
        Ok(container)
    }
}

/// 一个初始化周期内的全部服务
pub struct Container {
    id: Uuid,
    paths: Option<InitPaths>,
    config: Arc<Configuration>,
    auth_providers: Arc<AuthProviderRegistry>,
    user_system: Option<Arc<dyn UserSystem>>,
    asserter: Option<Arc<dyn InitializationAsserter>>,
    notification_checker: Option<Arc<dyn NotificationChecker>>,
    notification_dispatcher: Option<Arc<dyn NotificationDispatcher>>,
    lifecycle: Arc<LifecycleManager>,
    services: Vec<Arc<dyn ManagedService>>,
    context: RwLock<Option<PlatformContext>>,
    destroyed: AtomicBool,
}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// 构建时加载的路径，外部直接构建的容器为 `None`
    pub fn paths(&self) -> Option<&InitPaths> {
        self.paths.as_ref()
    }

    /// 容器自身解析出的配置（未与外部配置合并）
    pub fn config(&self) -> Arc<Configuration> {
        self.config.clone()
    }

    pub fn auth_providers(&self) -> Arc<AuthProviderRegistry> {
        self.auth_providers.clone()
    }

    pub fn user_system(&self) -> Option<Arc<dyn UserSystem>> {
        self.user_system.clone()
    }

    pub fn asserter(&self) -> Option<Arc<dyn InitializationAsserter>> {
        self.asserter.clone()
    }

    pub fn notification_checker(&self) -> Option<Arc<dyn NotificationChecker>> {
        self.notification_checker.clone()
    }

    pub fn notification_dispatcher(&self) -> Option<Arc<dyn NotificationDispatcher>> {
        self.notification_dispatcher.clone()
    }

    pub fn lifecycle(&self) -> Arc<LifecycleManager> {
        self.lifecycle.clone()
    }

    pub fn set_context(&self, context: &PlatformContext) {
        *self.context.write() = Some(context.clone());
    }

    pub fn context(&self) -> Option<PlatformContext> {
        self.context.read().clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// 停止所有托管服务，重复调用无效果
    pub async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        debug!("销毁容器: {}", self.id);
        for service in self.services.iter().rev() {
            if let Err(e) = service.stop().await {
                warn!("⚠️ 服务 {} 停止失败: {}", service.name(), e);
            }
        }
        self.context.write().take();
        info!("✅ 容器已销毁: {}", self.id);
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("paths", &self.paths)
            .field("auth_providers", &self.auth_providers)
            .field("services", &self.services.len())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
