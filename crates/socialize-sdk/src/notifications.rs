//! 推送通知路由
//!
//! 推送的传输层由宿主负责，SDK 只判断一条广播是否属于 Socialize，并把它交给容器里装配的
//! [`NotificationDispatcher`]。

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Configuration;
use crate::error::Result;
use crate::platform::PlatformContext;

/// C2DM 消息广播
pub const C2DM_MESSAGE_ACTION: &str = "com.google.android.c2dm.intent.RECEIVE";
/// C2DM 注册回调广播
pub const C2DM_REGISTRATION_ACTION: &str = "com.google.android.c2dm.intent.REGISTRATION";
/// 消息来源字段
pub const SOURCE_EXTRA: &str = "source";
/// Socialize 发出的消息来源值
pub const SOURCE_SOCIALIZE: &str = "socialize";

/// 宿主收到的系统广播
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastIntent {
    pub action: Option<String>,
    pub extras: BTreeMap<String, String>,
}

impl BroadcastIntent {
    pub fn new<S: Into<String>>(action: S) -> Self {
        Self {
            action: Some(action.into()),
            extras: BTreeMap::new(),
        }
    }

    pub fn with_extra<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }
}

/// 广播的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentRoute {
    /// Socialize 推送消息：分发并消费
    Message,
    /// 注册回调：分发但不消费，宿主自己的接收器仍然需要它
    Registration,
    /// 与 Socialize 无关
    Ignore,
}

impl IntentRoute {
    pub fn of(intent: &BroadcastIntent) -> Self {
        match intent.action.as_deref() {
            Some(C2DM_MESSAGE_ACTION) => {
                let from_socialize = intent
                    .extra(SOURCE_EXTRA)
                    .map(|source| source.trim().eq_ignore_ascii_case(SOURCE_SOCIALIZE))
                    .unwrap_or(false);
                if from_socialize {
                    IntentRoute::Message
                } else {
                    IntentRoute::Ignore
                }
            }
            Some(C2DM_REGISTRATION_ACTION) => IntentRoute::Registration,
            _ => IntentRoute::Ignore,
        }
    }

    /// 宿主是否应当停止继续处理这条广播
    pub fn consumed(&self) -> bool {
        matches!(self, IntentRoute::Message)
    }
}

/// 初始化时检查推送注册状态
#[async_trait]
pub trait NotificationChecker: Send + Sync {
    async fn check_registrations(&self, context: &PlatformContext, config: &Configuration) -> Result<()>;
}

/// 把属于 Socialize 的广播交给通知服务
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, context: &PlatformContext, intent: &BroadcastIntent) -> Result<()>;
}
