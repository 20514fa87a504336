//! WebSocket 帧格式
//!
//! 客户端发往中继的帧，以及中继合成后发往客户端的帧。

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::UserId;

/// 客户端发送的帧
///
/// 目前只处理 `TYPING`，其他类型一律解析为 [`ClientFrame::Unknown`] 并忽略。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    #[serde(rename = "TYPING", rename_all = "camelCase")]
    Typing {
        receiver_id: UserId,
        /// 缺省时转发的帧也不带该字段
        #[serde(default)]
        is_typing: Option<bool>,
    },
    #[serde(other)]
    Unknown,
}

impl ClientFrame {
    pub fn parse(text: &str) -> Result<Self, DomainError> {
        serde_json::from_str(text).map_err(|err| DomainError::invalid_frame(err.to_string()))
    }
}

/// 中继合成后发往客户端的帧
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    #[serde(rename = "TYPING", rename_all = "camelCase")]
    Typing {
        sender_id: UserId,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_typing: Option<bool>,
    },
}

impl ServerFrame {
    pub fn typing(sender_id: UserId, is_typing: Option<bool>) -> Self {
        Self::Typing {
            sender_id,
            is_typing,
        }
    }

    pub fn to_json(&self) -> Result<String, DomainError> {
        serde_json::to_string(self).map_err(|err| DomainError::invalid_frame(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_typing_frame() {
        let frame = ClientFrame::parse(r#"{"type":"TYPING","receiverId":"u2","isTyping":true}"#)
            .unwrap();
        assert_eq!(
            frame,
            ClientFrame::Typing {
                receiver_id: UserId::new("u2"),
                is_typing: Some(true),
            }
        );
    }

    #[test]
    fn unknown_types_are_not_errors() {
        let frame = ClientFrame::parse(r#"{"type":"READ_RECEIPT","messageId":"m1"}"#).unwrap();
        assert_eq!(frame, ClientFrame::Unknown);
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(ClientFrame::parse("{not json").is_err());
        assert!(ClientFrame::parse(r#"{"type":"TYPING","isTyping":true}"#).is_err());
    }

    #[test]
    fn typing_notice_wire_format() {
        let json = ServerFrame::typing(UserId::new("u1"), Some(false)).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            json!({"type": "TYPING", "senderId": "u1", "isTyping": false})
        );
    }

    #[test]
    fn typing_without_flag_is_relayed_without_flag() {
        let frame = ClientFrame::parse(r#"{"type":"TYPING","receiverId":"u2"}"#).unwrap();
        assert_eq!(
            frame,
            ClientFrame::Typing {
                receiver_id: UserId::new("u2"),
                is_typing: None,
            }
        );

        let json = ServerFrame::typing(UserId::new("u1"), None).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, json!({"type": "TYPING", "senderId": "u1"}));
    }
}
