//! 初始化引用计数状态机
//!
//! | 当前状态                       | 事件                     | 结果                                      |
//! |--------------------------------|--------------------------|-------------------------------------------|
//! | `Uninitialized`                | init(P)                  | `Build(P)` → 成功后 `Initialized(1, P)`   |
//! | `Initialized(n, L)`，L ⊇ P     | init(P)                  | `Reuse` → `Initialized(n + 1, L)`         |
//! | `Initialized(n, L)`，P ⊄ L     | init(P)                  | `Rebuild(L ∪ P)` → `Initialized(1, L ∪ P)`|
//! | `Initialized(n, None)`         | init(P)                  | `Recover(P)` → `Initialized(1, P)`        |
//! | `Uninitialized`                | adopt(container)         | `Initialized(1, None)`                    |
//! | `Initialized(n, _)`            | adopt(container)         | `Initialized(n + 1, _)`                   |
//! | `Initialized(n, _)`，n > 1     | destroy                  | `Retained` → `Initialized(n - 1, _)`      |
//! | `Initialized(1, _)` / 未初始化 | destroy                  | `TearDown` → `Uninitialized`              |
//! | 任意                           | destroy(force)           | `TearDown` → `Uninitialized`              |
//!
//! `Initializing` 不单独建模：构建期间服务锁被持有，构建失败时状态保持 `Uninitialized`。

use crate::container::InitPaths;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Initialized {
        count: u32,
        /// 外部传入的容器没有路径记录
        paths: Option<InitPaths>,
    },
}

/// `init` 的执行计划
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitPlan {
    Build(InitPaths),
    Reuse,
    Rebuild { paths: InitPaths, new_path: String },
    Recover(InitPaths),
}

impl InitPlan {
    /// 需要构建新容器时的路径
    pub fn build_paths(&self) -> Option<&InitPaths> {
        match self {
            InitPlan::Build(paths) | InitPlan::Recover(paths) => Some(paths),
            InitPlan::Rebuild { paths, .. } => Some(paths),
            InitPlan::Reuse => None,
        }
    }
}

/// `destroy` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    Retained { remaining: u32 },
    TearDown,
}

impl LifecycleState {
    pub fn is_initialized(&self) -> bool {
        self.count() > 0
    }

    pub fn count(&self) -> u32 {
        match self {
            LifecycleState::Uninitialized => 0,
            LifecycleState::Initialized { count, .. } => *count,
        }
    }

    pub fn paths(&self) -> Option<&InitPaths> {
        match self {
            LifecycleState::Uninitialized => None,
            LifecycleState::Initialized { paths, .. } => paths.as_ref(),
        }
    }

    pub fn plan(&self, requested: &InitPaths) -> InitPlan {
        match self {
            LifecycleState::Uninitialized => InitPlan::Build(requested.clone()),
            LifecycleState::Initialized { paths: None, .. } => InitPlan::Recover(requested.clone()),
            LifecycleState::Initialized {
                paths: Some(loaded),
                ..
            } => match loaded.first_missing(requested) {
                None => InitPlan::Reuse,
                Some(new_path) => InitPlan::Rebuild {
                    paths: loaded.union(requested),
                    new_path: new_path.to_string(),
                },
            },
        }
    }

    /// 新容器提交成功
    pub fn commit(&mut self, paths: Option<InitPaths>) {
        *self = LifecycleState::Initialized { count: 1, paths };
    }

    /// 复用当前容器，计数 + 1；未初始化时无效果
    pub fn retain(&mut self) -> u32 {
        if let LifecycleState::Initialized { count, .. } = self {
            *count += 1;
        }
        self.count()
    }

    pub fn release(&mut self, force: bool) -> DestroyOutcome {
        match self {
            LifecycleState::Initialized { count, .. } if !force && *count > 1 => {
                *count -= 1;
                DestroyOutcome::Retained { remaining: *count }
            }
            _ => {
                *self = LifecycleState::Uninitialized;
                DestroyOutcome::TearDown
            }
        }
    }

    pub fn reset(&mut self) {
        *self = LifecycleState::Uninitialized;
    }
}
