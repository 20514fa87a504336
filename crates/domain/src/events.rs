//! 事件总线上的事件定义
//!
//! 请求处理层通过事件总线发布 `{type, receiverId, data}`，中继按 `receiverId` 投递。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::UserId;

/// 事件种类，每种对应一个固定的事件总线频道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    FriendRequest,
    FriendResponse,
    NewMessage,
    MessageReaction,
}

impl EventKind {
    /// 中继启动时订阅的全部事件种类
    pub const ALL: [EventKind; 4] = [
        EventKind::FriendRequest,
        EventKind::FriendResponse,
        EventKind::NewMessage,
        EventKind::MessageReaction,
    ];

    /// 该事件种类对应的频道名
    pub fn channel(self) -> &'static str {
        match self {
            EventKind::FriendRequest => "friend-request",
            EventKind::FriendResponse => "friend-response",
            EventKind::NewMessage => "new-message",
            EventKind::MessageReaction => "message-reaction",
        }
    }

    pub fn from_channel(channel: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.channel() == channel)
    }

    /// 全部订阅频道名
    pub fn channels() -> impl Iterator<Item = &'static str> {
        Self::ALL.into_iter().map(EventKind::channel)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.channel())
    }
}

impl FromStr for EventKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_channel(s).ok_or_else(|| DomainError::unknown_channel(s))
    }
}

/// 发布到事件总线的完整事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(rename = "receiverId")]
    pub receiver_id: UserId,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl RelayEvent {
    pub fn new(kind: EventKind, receiver_id: impl Into<UserId>, data: serde_json::Value) -> Self {
        Self {
            kind,
            receiver_id: receiver_id.into(),
            data,
        }
    }

    pub fn to_json(&self) -> Result<String, DomainError> {
        serde_json::to_string(self).map_err(|err| DomainError::invalid_payload(err.to_string()))
    }
}

/// 事件负载中用于路由的部分
///
/// 只要求 `receiverId`，其余字段原样保留在原始负载中，不做校验。
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingHeader {
    #[serde(rename = "receiverId")]
    pub receiver_id: UserId,
}

impl RoutingHeader {
    pub fn parse(payload: &str) -> Result<Self, DomainError> {
        serde_json::from_str(payload).map_err(|err| DomainError::invalid_payload(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn channel_names_round_trip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_channel(kind.channel()), Some(kind));
        }
        assert_eq!(EventKind::from_channel("presence"), None);
        assert!("typing".parse::<EventKind>().is_err());
    }

    #[test]
    fn relay_event_uses_wire_field_names() {
        let event = RelayEvent::new(
            EventKind::NewMessage,
            "u1",
            json!({"id": "m1", "content": "hi"}),
        );
        let value: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "NEW_MESSAGE",
                "receiverId": "u1",
                "data": {"id": "m1", "content": "hi"}
            })
        );
    }

    #[test]
    fn routing_header_ignores_extra_fields() {
        let header = RoutingHeader::parse(
            r#"{"type":"SOMETHING_NEW","receiverId":"u7","data":[1,2,3],"extra":true}"#,
        )
        .unwrap();
        assert_eq!(header.receiver_id.as_str(), "u7");
    }

    #[test]
    fn routing_header_requires_receiver_id() {
        assert!(RoutingHeader::parse(r#"{"type":"FRIEND_RESPONSE","senderId":"u1"}"#).is_err());
        assert!(RoutingHeader::parse(r#"{"receiverId":42}"#).is_err());
        assert!(RoutingHeader::parse("not json").is_err());
    }
}
