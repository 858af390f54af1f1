//! 宿主回调
//!
//! 所有回调都在内部锁释放之后调用，回调里可以安全地再次调用 SDK。

use std::sync::Arc;

use crate::auth::Session;
use crate::container::Container;
use crate::error::SocializeError;
use crate::platform::PlatformContext;

/// 初始化结果回调
pub trait InitListener: Send + Sync {
    fn on_init(&self, context: &PlatformContext, container: Arc<Container>);

    fn on_error(&self, error: SocializeError);
}

/// 认证结果回调
pub trait AuthListener: Send + Sync {
    fn on_auth_success(&self, session: Arc<Session>);

    /// 认证本身失败（后端拒绝、凭证无效等）
    fn on_auth_fail(&self, error: SocializeError);

    /// 前置条件不满足（未初始化、Provider 不支持等）
    fn on_error(&self, error: SocializeError);

    fn on_cancel(&self) {}
}

/// 按错误类型分发到 `on_error` / `on_auth_fail`
pub(crate) fn deliver_auth_error(listener: &dyn AuthListener, error: SocializeError) {
    if error.is_precondition() {
        listener.on_error(error);
    } else {
        listener.on_auth_fail(error);
    }
}
