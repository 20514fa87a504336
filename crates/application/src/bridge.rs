//! 事件总线桥接
//!
//! 专用任务消费订阅端转来的 `(channel, payload)`，按 `receiverId` 原样投递给在线连接。

use domain::{DomainError, EventKind, RoutingHeader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::ApplicationError;
use crate::registry::{ConnectionRegistry, Delivery};

/// 订阅端收到的一条原始消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub channel: String,
    pub payload: String,
}

impl BusMessage {
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

#[derive(Clone)]
pub struct EventBridge {
    registry: ConnectionRegistry,
}

impl EventBridge {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// 投递一条总线消息，负载不做重新序列化
    pub async fn dispatch(&self, message: &BusMessage) -> Result<Delivery, ApplicationError> {
        if EventKind::from_channel(&message.channel).is_none() {
            return Err(DomainError::unknown_channel(&message.channel).into());
        }

        let header = RoutingHeader::parse(&message.payload)?;
        Ok(self
            .registry
            .send_to(&header.receiver_id, message.payload.clone())
            .await)
    }

    /// 持续消费直到发送端全部关闭；单条消息出错只记录日志
    pub async fn run(self, mut messages: mpsc::UnboundedReceiver<BusMessage>) {
        info!("Event bridge started");

        while let Some(message) = messages.recv().await {
            match self.dispatch(&message).await {
                Ok(delivery) => {
                    debug!(channel = %message.channel, ?delivery, "Bus event dispatched");
                }
                Err(err) => {
                    warn!(channel = %message.channel, error = %err, "Discarding bus event");
                }
            }
        }

        info!("Event bridge stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ConnectionHandle, OutboundFrame};
    use domain::UserId;

    const NEW_MESSAGE: &str =
        r#"{"type":"NEW_MESSAGE","receiverId":"u1","data":{"id":"m1","content":"hi"}}"#;

    #[tokio::test]
    async fn forwards_payload_verbatim_to_receiver_only() {
        let registry = ConnectionRegistry::new();
        let (h1, mut rx1) = ConnectionHandle::new();
        let (h2, mut rx2) = ConnectionHandle::new();
        registry.register(UserId::new("u1"), h1).await;
        registry.register(UserId::new("u2"), h2).await;
        let bridge = EventBridge::new(registry);

        let delivery = bridge
            .dispatch(&BusMessage::new("new-message", NEW_MESSAGE))
            .await
            .expect("dispatch");

        assert_eq!(delivery, Delivery::Delivered);
        assert_eq!(rx1.recv().await, Some(OutboundFrame::Text(NEW_MESSAGE.to_string())));
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn offline_receiver_is_a_silent_drop() {
        let bridge = EventBridge::new(ConnectionRegistry::new());
        let delivery = bridge
            .dispatch(&BusMessage::new("new-message", NEW_MESSAGE))
            .await
            .expect("dispatch");
        assert_eq!(delivery, Delivery::Dropped);
    }

    #[tokio::test]
    async fn rejects_bad_payloads_and_foreign_channels() {
        let bridge = EventBridge::new(ConnectionRegistry::new());

        assert!(bridge
            .dispatch(&BusMessage::new("new-message", "{oops"))
            .await
            .is_err());
        assert!(bridge
            .dispatch(&BusMessage::new(
                "friend-response",
                r#"{"type":"FRIEND_RESPONSE","senderId":"u1","action":"ACCEPTED"}"#
            ))
            .await
            .is_err());
        assert!(bridge
            .dispatch(&BusMessage::new("presence", NEW_MESSAGE))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn run_survives_bad_messages() {
        let registry = ConnectionRegistry::new();
        let (h1, mut rx1) = ConnectionHandle::new();
        registry.register(UserId::new("u1"), h1).await;

        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(EventBridge::new(registry).run(rx));

        tx.send(BusMessage::new("new-message", "garbage")).unwrap();
        tx.send(BusMessage::new("new-message", NEW_MESSAGE)).unwrap();
        drop(tx);

        task.await.expect("bridge task");
        assert_eq!(rx1.recv().await, Some(OutboundFrame::Text(NEW_MESSAGE.to_string())));
    }
}
