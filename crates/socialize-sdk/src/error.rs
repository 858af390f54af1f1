use std::sync::Arc;

use crate::auth::AuthProviderType;

/// SDK 错误类型
///
/// 预期内的失败（未初始化、未认证、不支持的 Provider）都以此类型返回给宿主，
/// 其余底层错误统一包装为 `Wrapped`，保留原始 cause。
#[derive(Debug, Clone, thiserror::Error)]
pub enum SocializeError {
    /// 设备未通过能力检查
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// 操作需要先完成初始化
    #[error("Not initialized: {0}")]
    NotInitialized(String),

    /// 操作需要已认证的 Session
    #[error("Not authenticated: {0}")]
    NotAuthenticated(String),

    /// 请求的认证 Provider 未注册
    #[error("Unsupported auth provider: {0}")]
    UnsupportedProvider(AuthProviderType),

    /// 第三方认证所需配置缺失
    #[error("Validation error: {0}")]
    Validation(String),

    /// 配置加载/解析错误
    #[error("Config error: {0}")]
    Config(String),

    /// 认证流程失败（后端拒绝、凭证无效等）
    #[error("Authentication error: {0}")]
    Auth(String),

    /// 底层错误，类型归一但保留 cause
    #[error("{message}")]
    Wrapped {
        message: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync>,
    },
}

impl SocializeError {
    /// 包装任意底层错误
    pub fn wrap<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SocializeError::Wrapped {
            message: error.to_string(),
            source: Arc::new(error),
        }
    }

    /// 是否是前置条件错误（未初始化、Provider 不支持、配置缺失等）
    ///
    /// 前置条件错误走 listener 的 `on_error`，认证本身的失败走 `on_auth_fail`。
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            SocializeError::UnsupportedPlatform(_)
                | SocializeError::NotInitialized(_)
                | SocializeError::NotAuthenticated(_)
                | SocializeError::UnsupportedProvider(_)
                | SocializeError::Validation(_)
        )
    }
}

impl From<std::io::Error> for SocializeError {
    fn from(error: std::io::Error) -> Self {
        SocializeError::wrap(error)
    }
}

impl From<serde_json::Error> for SocializeError {
    fn from(error: serde_json::Error) -> Self {
        SocializeError::Config(format!("JSON error: {}", error))
    }
}

pub type Result<T> = std::result::Result<T, SocializeError>;
