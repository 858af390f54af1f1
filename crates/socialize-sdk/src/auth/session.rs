//! Session：已认证身份 + 按 Provider 缓存的凭证

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::provider::{AuthProviderInfo, AuthProviderType};

/// 后端用户身份
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: u64,
    pub display_name: Option<String>,
}

/// 单个 Provider 的用户凭证（token 等，对核心透明）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProviderCredentials {
    pub provider_info: Option<AuthProviderInfo>,
    pub user_id: Option<String>,
    pub access_token: Option<String>,
    pub token_secret: Option<String>,
}

impl UserProviderCredentials {
    pub fn new(provider_info: AuthProviderInfo) -> Self {
        Self {
            provider_info: Some(provider_info),
            ..Self::default()
        }
    }

    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_access_token<S: Into<String>>(mut self, token: S) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_token_secret<S: Into<String>>(mut self, secret: S) -> Self {
        self.token_secret = Some(secret.into());
        self
    }

    pub fn provider_type(&self) -> Option<AuthProviderType> {
        self.provider_info.as_ref().map(|info| info.provider_type)
    }
}

/// 认证会话
///
/// 由认证流程整体创建后替换，外部拿到的都是 `Arc<Session>` 快照。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub user: Option<UserIdentity>,
    /// 老版本会话只记录一个认证 Provider，没有按 Provider 的凭证
    pub auth_provider_type: Option<AuthProviderType>,
    credentials: HashMap<AuthProviderType, UserProviderCredentials>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new<K: Into<String>, S: Into<String>>(consumer_key: K, consumer_secret: S) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            user: None,
            auth_provider_type: None,
            credentials: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_user(mut self, user: UserIdentity) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_legacy_provider(mut self, provider_type: AuthProviderType) -> Self {
        self.auth_provider_type = Some(provider_type);
        self
    }

    pub fn with_credentials(
        mut self,
        provider_type: AuthProviderType,
        credentials: UserProviderCredentials,
    ) -> Self {
        self.set_credentials(provider_type, credentials);
        self
    }

    pub fn credentials(&self, provider_type: AuthProviderType) -> Option<&UserProviderCredentials> {
        self.credentials.get(&provider_type)
    }

    pub fn set_credentials(
        &mut self,
        provider_type: AuthProviderType,
        credentials: UserProviderCredentials,
    ) {
        self.credentials.insert(provider_type, credentials);
    }

    pub fn all_credentials(
        &self,
    ) -> impl Iterator<Item = (&AuthProviderType, &UserProviderCredentials)> {
        self.credentials.iter()
    }

    /// 清除某个 Provider 的凭证
    pub fn clear(&mut self, provider_type: AuthProviderType) -> Option<UserProviderCredentials> {
        self.credentials.remove(&provider_type)
    }

    /// 从旧会话继承本会话没有的 Provider 凭证
    ///
    /// 仅当两者属于同一用户时继承。
    pub fn inherit_credentials(&mut self, previous: &Session) {
        if self.user.is_some() && previous.user.is_some() && self.user != previous.user {
            return;
        }
        for (provider_type, credentials) in &previous.credentials {
            self.credentials
                .entry(*provider_type)
                .or_insert_with(|| credentials.clone());
        }
    }

    /// 会话是否覆盖指定 Provider
    ///
    /// 原生 Provider 总是满足；其余先看凭证表，没有凭证时回退到老版本的单一 Provider 字段。
    pub fn covers(&self, provider_type: AuthProviderType) -> bool {
        if provider_type == AuthProviderType::Socialize {
            return true;
        }
        if self.credentials.contains_key(&provider_type) {
            return true;
        }
        self.auth_provider_type == Some(provider_type)
    }
}
