//! 应用层实现。
//!
//! 连接注册表、令牌校验与事件发布端口、打字提示转发，以及事件总线到连接的桥接。

pub mod auth;
pub mod bridge;
pub mod error;
pub mod local_bus;
pub mod publisher;
pub mod registry;
pub mod relay;

pub use auth::{AuthError, TokenVerifier};
pub use bridge::{BusMessage, EventBridge};
pub use error::ApplicationError;
pub use local_bus::LocalEventBus;
pub use publisher::EventPublisher;
pub use registry::{ConnectionHandle, ConnectionRegistry, Delivery, OutboundFrame};
pub use relay::RelayService;
