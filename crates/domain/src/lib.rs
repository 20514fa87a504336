//! 私信实时投递系统的核心领域模型
//!
//! 包含用户标识、连接标识、事件总线上的事件以及客户端帧格式。

pub mod errors;
pub mod events;
pub mod frames;
pub mod value_objects;

// 重新导出常用类型
pub use errors::*;
pub use events::*;
pub use frames::*;
pub use value_objects::*;
