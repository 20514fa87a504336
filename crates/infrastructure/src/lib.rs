//! 基础设施层实现。
//!
//! 提供 JWT 令牌校验和 Redis 事件总线适配器，实现应用层定义的端口。

pub mod auth;
pub mod redis;

pub use auth::{Claims, JwtTokenVerifier};
pub use self::redis::{RedisError, RedisEventPublisher, RedisEventSubscriber, RedisResult};
