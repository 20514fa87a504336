//! 领域模型错误定义

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 事件负载无法解析
    #[error("事件负载无效: {message}")]
    InvalidPayload { message: String },

    /// 客户端帧无法解析
    #[error("客户端帧无效: {message}")]
    InvalidFrame { message: String },

    /// 未知的事件总线频道
    #[error("未知频道: {channel}")]
    UnknownChannel { channel: String },
}

impl DomainError {
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame {
            message: message.into(),
        }
    }

    pub fn unknown_channel(channel: impl Into<String>) -> Self {
        Self::UnknownChannel {
            channel: channel.into(),
        }
    }
}
