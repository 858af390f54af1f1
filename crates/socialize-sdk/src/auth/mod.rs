//! 认证：Provider 注册表、Session 模型与后端用户子系统

pub mod provider;
pub mod providers;
pub mod session;
pub mod user_system;

pub use provider::{AuthProvider, AuthProviderInfo, AuthProviderRegistry, AuthProviderType};
pub use providers::{
    FacebookAuthProvider, NativeCredentialCache, NoopCredentialCache, SocializeAuthProvider,
    TwitterAuthProvider, FACEBOOK_DEFAULT_PERMISSIONS,
};
pub use session::{Session, UserIdentity, UserProviderCredentials};
pub use user_system::{AuthRequest, UserSystem};
