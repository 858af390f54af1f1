//! 调用前置条件检查

use crate::auth::Session;
use crate::error::{Result, SocializeError};
use crate::platform::PlatformContext;

/// 前置条件检查
///
/// 容器可以装配自定义实现（例如在检查失败时弹出提示），没有装配时使用 [`DefaultAsserter`]。
pub trait InitializationAsserter: Send + Sync {
    fn assert_initialized(&self, context: &PlatformContext, initialized: bool) -> Result<()>;

    fn assert_authenticated(&self, session: Option<&Session>) -> Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAsserter;

impl InitializationAsserter for DefaultAsserter {
    fn assert_initialized(&self, _context: &PlatformContext, initialized: bool) -> Result<()> {
        if initialized {
            Ok(())
        } else {
            Err(SocializeError::NotInitialized(
                "Socialize not initialized".to_string(),
            ))
        }
    }

    fn assert_authenticated(&self, session: Option<&Session>) -> Result<()> {
        match session {
            Some(_) => Ok(()),
            None => Err(SocializeError::NotAuthenticated(
                "Not authenticated".to_string(),
            )),
        }
    }
}
