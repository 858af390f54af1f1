//! SDK 生命周期管理
//!
//! - [`LifecycleHook`] / [`LifecycleManager`]：宿主暂停/恢复时统一通知各模块（定位服务等）
//! - [`state`]：初始化引用计数状态机

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::Result;
use crate::platform::PlatformContext;

pub mod state;

pub use state::{DestroyOutcome, InitPlan, LifecycleState};

/// 生命周期回调 Hook
///
/// 各模块通过实现此 trait 来响应宿主生命周期变化
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    /// 宿主进入暂停状态时调用
    async fn on_pause(&self, context: &PlatformContext) -> Result<()>;

    /// 宿主恢复时调用
    async fn on_resume(&self, context: &PlatformContext) -> Result<()>;
}

/// 生命周期管理器
#[derive(Clone, Default)]
pub struct LifecycleManager {
    hooks: Vec<Arc<dyn LifecycleHook>>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// 获取已注册的 Hook 数量
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// 注册生命周期回调 Hook
    pub fn register_hook(&mut self, hook: Arc<dyn LifecycleHook>) {
        self.hooks.push(hook);
        info!("✅ 生命周期 Hook 已注册: 当前共 {} 个", self.hooks.len());
    }

    /// 通知所有 Hook：宿主暂停
    ///
    /// 按注册顺序执行，某个 Hook 失败时记录错误并继续执行其他 Hook，最后返回第一个错误
    pub async fn notify_pause(&self, context: &PlatformContext) -> Result<()> {
        info!("🔄 通知所有模块：宿主暂停");

        let mut first_error = None;
        let mut failed = 0usize;

        for (index, hook) in self.hooks.iter().enumerate() {
            if let Err(e) = hook.on_pause(context).await {
                warn!("⚠️ Hook #{} 暂停处理失败: {}", index, e);
                failed += 1;
                first_error.get_or_insert(e);
            }
        }

        if let Some(e) = first_error {
            warn!("⚠️ {} 个模块暂停处理失败，但所有模块都已尝试执行", failed);
            return Err(e);
        }

        info!("✅ 所有模块暂停处理完成");
        Ok(())
    }

    /// 通知所有 Hook：宿主恢复
    pub async fn notify_resume(&self, context: &PlatformContext) -> Result<()> {
        info!("🔄 通知所有模块：宿主恢复");

        let mut first_error = None;
        let mut failed = 0usize;

        for (index, hook) in self.hooks.iter().enumerate() {
            if let Err(e) = hook.on_resume(context).await {
                warn!("⚠️ Hook #{} 恢复处理失败: {}", index, e);
                failed += 1;
                first_error.get_or_insert(e);
            }
        }

        if let Some(e) = first_error {
            warn!("⚠️ {} 个模块恢复处理失败，但所有模块都已尝试执行", failed);
            return Err(e);
        }

        info!("✅ 所有模块恢复处理完成");
        Ok(())
    }
}
