//! 事件系统 - 生命周期与认证状态变化的广播
//!
//! UI 协作方（action bar、评论视图等）通过订阅事件得知 Session 或容器的变化，
//! 从而重新获取引用。

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::auth::AuthProviderType;

/// SDK 事件类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocializeEvent {
    /// 新容器已提交
    Initialized {
        container_id: Uuid,
        paths: Vec<String>,
        timestamp: i64,
    },
    /// 复用现有容器，引用计数增加
    Reinitialized { init_count: u32, timestamp: i64 },
    /// 引用计数减少但容器保留
    Released { init_count: u32, timestamp: i64 },
    /// 容器已销毁
    Destroyed {
        container_id: Option<Uuid>,
        timestamp: i64,
    },
    /// 认证成功，Session 已替换
    Authenticated {
        provider: AuthProviderType,
        user_id: Option<u64>,
        timestamp: i64,
    },
    /// 单个 Provider 的凭证已清除
    ProviderSessionCleared {
        provider: AuthProviderType,
        timestamp: i64,
    },
    /// Session 已整体清除
    SessionCleared { timestamp: i64 },
}

impl SocializeEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            SocializeEvent::Initialized { .. } => "initialized",
            SocializeEvent::Reinitialized { .. } => "reinitialized",
            SocializeEvent::Released { .. } => "released",
            SocializeEvent::Destroyed { .. } => "destroyed",
            SocializeEvent::Authenticated { .. } => "authenticated",
            SocializeEvent::ProviderSessionCleared { .. } => "provider_session_cleared",
            SocializeEvent::SessionCleared { .. } => "session_cleared",
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            SocializeEvent::Initialized { timestamp, .. }
            | SocializeEvent::Reinitialized { timestamp, .. }
            | SocializeEvent::Released { timestamp, .. }
            | SocializeEvent::Destroyed { timestamp, .. }
            | SocializeEvent::Authenticated { timestamp, .. }
            | SocializeEvent::ProviderSessionCleared { timestamp, .. }
            | SocializeEvent::SessionCleared { timestamp } => *timestamp,
        }
    }

    pub(crate) fn now() -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// 事件总线
///
/// 只做广播，不保留历史；订阅晚于事件发生时收不到该事件。
pub struct EventBus {
    sender: broadcast::Sender<SocializeEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 发布事件，无订阅者时直接丢弃
    pub fn publish(&self, event: SocializeEvent) {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(receivers) => debug!("📣 事件 {} 已送达 {} 个订阅者", event_type, receivers),
            Err(_) => debug!("事件 {} 无订阅者", event_type),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SocializeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
