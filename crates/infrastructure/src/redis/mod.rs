//! Redis Pub/Sub 模块
//!
//! 事件总线的 Redis 实现：订阅固定频道集合，以及按事件种类发布。

pub mod error;
pub mod publisher;
pub mod subscriber;

// 重新导出
pub use error::*;
pub use publisher::*;
pub use subscriber::*;
