//! 宿主平台上下文与设备能力检查

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SocializeError};

/// 屏幕密度分级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayDensity {
    Low,
    Medium,
    High,
    ExtraHigh,
}

/// 宿主平台上下文（对应 Android 的 Context / iOS 的 Application）
///
/// 相等性只比较 `id`：同一个宿主对象在多次调用间传入同一个上下文。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformContext {
    id: Uuid,
    package_name: String,
    app_name: Option<String>,
    density: DisplayDensity,
    permissions: BTreeSet<String>,
}

impl PlatformContext {
    pub fn new<S: Into<String>>(package_name: S) -> Self {
        Self {
            id: Uuid::new_v4(),
            package_name: package_name.into(),
            app_name: None,
            density: DisplayDensity::Medium,
            permissions: BTreeSet::new(),
        }
    }

    pub fn with_app_name<S: Into<String>>(mut self, app_name: S) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn with_density(mut self, density: DisplayDensity) -> Self {
        self.density = density;
        self
    }

    pub fn with_permission<S: Into<String>>(mut self, permission: S) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// 应用名，未设置时回退到包名
    pub fn app_name(&self) -> &str {
        match self.app_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.package_name,
        }
    }

    pub fn density(&self) -> DisplayDensity {
        self.density
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

impl PartialEq for PlatformContext {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PlatformContext {}

/// 设备能力检查
///
/// 在初始化的最开始调用，拒绝时初始化直接失败。
pub trait PlatformChecker: Send + Sync {
    fn check_supported(&self, context: &PlatformContext) -> Result<()>;
}

/// 默认检查：不支持低分辨率（LDPI）设备
#[derive(Debug, Default, Clone, Copy)]
pub struct DisplayDensityChecker;

impl PlatformChecker for DisplayDensityChecker {
    fn check_supported(&self, context: &PlatformContext) -> Result<()> {
        if context.density() == DisplayDensity::Low {
            return Err(SocializeError::UnsupportedPlatform(
                "Socialize is not supported on low resolution (LDPI) devices".to_string(),
            ));
        }
        Ok(())
    }
}
