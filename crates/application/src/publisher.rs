use async_trait::async_trait;
use domain::RelayEvent;

use crate::error::ApplicationError;

/// 事件发布端口
///
/// 请求处理层用它把事件发到 `event.kind` 对应的频道，返回收到消息的订阅者数量。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &RelayEvent) -> Result<u32, ApplicationError>;
}
