//! Error types for FFI layer
//!
//! These errors are designed to be simple and cross-language friendly.

use socialize_sdk::SocializeError;

/// Main error type for FFI operations
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum SocializeFfiError {
    #[error("Unsupported platform: {msg}")]
    UnsupportedPlatform { msg: String },

    #[error("Not initialized: {msg}")]
    NotInitialized { msg: String },

    #[error("Not authenticated: {msg}")]
    NotAuthenticated { msg: String },

    #[error("Unsupported auth provider: {provider}")]
    UnsupportedProvider { provider: String },

    #[error("Validation error: {msg}")]
    Validation { msg: String },

    #[error("Config error: {msg}")]
    Config { msg: String },

    #[error("Authentication error: {reason}")]
    Authentication { reason: String },

    #[error("Generic error: {msg}")]
    Generic { msg: String },
}

impl SocializeFfiError {
    pub fn generic<T: std::fmt::Display>(msg: T) -> Self {
        let msg = ensure_non_empty(msg.to_string(), "Unknown error");
        tracing::error!("Generic error: {}", msg);
        Self::Generic { msg }
    }
}

/// 保证错误文案非空，避免 Kotlin/iOS 上显示空白
fn ensure_non_empty(s: String, fallback: &'static str) -> String {
    let t = s.trim();
    if t.is_empty() {
        fallback.to_string()
    } else {
        s
    }
}

impl From<SocializeError> for SocializeFfiError {
    fn from(error: SocializeError) -> Self {
        tracing::debug!("SDK error: {:?}", error);

        match error {
            SocializeError::UnsupportedPlatform(msg) => Self::UnsupportedPlatform {
                msg: ensure_non_empty(msg, "Unsupported platform"),
            },
            SocializeError::NotInitialized(msg) => Self::NotInitialized {
                msg: ensure_non_empty(msg, "Socialize not initialized"),
            },
            SocializeError::NotAuthenticated(msg) => Self::NotAuthenticated {
                msg: ensure_non_empty(msg, "Not authenticated"),
            },
            SocializeError::UnsupportedProvider(provider) => Self::UnsupportedProvider {
                provider: provider.to_string(),
            },
            SocializeError::Validation(msg) => Self::Validation {
                msg: ensure_non_empty(msg, "Validation failed"),
            },
            SocializeError::Config(msg) => Self::Config {
                msg: ensure_non_empty(msg, "Invalid configuration"),
            },
            SocializeError::Auth(reason) => Self::Authentication {
                reason: ensure_non_empty(reason, "Authentication failed"),
            },
            SocializeError::Wrapped { message, .. } => Self::Generic {
                msg: ensure_non_empty(message, "Internal error"),
            },
        }
    }
}
