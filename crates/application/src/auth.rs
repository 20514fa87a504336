//! 令牌校验端口
//!
//! 握手时携带的不透明令牌在这里换成用户身份，校验失败一律拒绝。

use domain::UserId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("token required")]
    Missing,
    #[error("invalid token: {reason}")]
    Invalid { reason: String },
}

impl AuthError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        AuthError::Invalid {
            reason: reason.into(),
        }
    }

    /// 握手被拒绝时随关闭帧发送给客户端的原因
    pub fn close_reason(&self) -> &'static str {
        match self {
            AuthError::Missing => "Token required",
            AuthError::Invalid { .. } => "Invalid token",
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait TokenVerifier: Send + Sync {
    /// 校验令牌并取出用户身份，没有副作用
    fn verify(&self, token: &str) -> Result<UserId, AuthError>;
}
