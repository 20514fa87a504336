// 进程内事件总线
use crate::{ApplicationError, BusMessage, EventPublisher};
use async_trait::async_trait;
use domain::RelayEvent;
use tokio::sync::mpsc;

/// 不经过外部中间件的事件总线，发布的事件直接进入桥接任务的输入通道
#[derive(Clone)]
pub struct LocalEventBus {
    sender: mpsc::UnboundedSender<BusMessage>,
}

impl LocalEventBus {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BusMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// 在指定频道上发送原始负载
    pub fn publish_raw(
        &self,
        channel: impl Into<String>,
        payload: impl Into<String>,
    ) -> Result<(), ApplicationError> {
        self.sender
            .send(BusMessage::new(channel, payload))
            .map_err(|err| ApplicationError::publish(err.to_string()))
    }
}

#[async_trait]
impl EventPublisher for LocalEventBus {
    async fn publish(&self, event: &RelayEvent) -> Result<u32, ApplicationError> {
        self.publish_raw(event.kind.channel(), event.to_json()?)?;
        Ok(1)
    }
}
