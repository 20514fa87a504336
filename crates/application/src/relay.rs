//! 中继用例
//!
//! 连接生命周期中与传输无关的部分：握手认证、登记、注销，以及客户端帧的处理。

use std::sync::Arc;

use domain::{ClientFrame, ServerFrame, UserId};
use tokio::sync::mpsc;
use tracing::debug;

use crate::auth::{AuthError, TokenVerifier};
use crate::error::ApplicationError;
use crate::registry::{ConnectionHandle, ConnectionRegistry, Delivery, OutboundFrame};

#[derive(Clone)]
pub struct RelayService {
    registry: ConnectionRegistry,
    verifier: Arc<dyn TokenVerifier>,
}

impl RelayService {
    pub fn new(registry: ConnectionRegistry, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { registry, verifier }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// 校验握手令牌，空令牌等同于未提供
    pub fn authenticate(&self, token: Option<&str>) -> Result<UserId, AuthError> {
        let token = token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::Missing)?;
        self.verifier.verify(token)
    }

    /// 为已认证用户创建连接句柄并登记
    pub async fn connect(
        &self,
        user_id: &UserId,
    ) -> (ConnectionHandle, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (handle, receiver) = ConnectionHandle::new();
        self.registry.register(user_id.clone(), handle.clone()).await;
        (handle, receiver)
    }

    pub async fn disconnect(&self, user_id: &UserId, handle: &ConnectionHandle) -> bool {
        self.registry.unregister(user_id, handle).await
    }

    /// 处理客户端发来的一帧文本
    ///
    /// `TYPING` 帧转发给 `receiverId` 对应的连接，返回投递结果；其他类型返回 `None`。
    pub async fn handle_client_frame(
        &self,
        sender_id: &UserId,
        text: &str,
    ) -> Result<Option<Delivery>, ApplicationError> {
        match ClientFrame::parse(text)? {
            ClientFrame::Typing {
                receiver_id,
                is_typing,
            } => {
                let notice = ServerFrame::typing(sender_id.clone(), is_typing).to_json()?;
                let delivery = self.registry.send_to(&receiver_id, notice).await;
                debug!(
                    sender_id = %sender_id,
                    receiver_id = %receiver_id,
                    ?is_typing,
                    ?delivery,
                    "Typing indicator relayed"
                );
                Ok(Some(delivery))
            }
            ClientFrame::Unknown => {
                debug!(sender_id = %sender_id, "Ignoring client frame of unknown type");
                Ok(None)
            }
        }
    }
}
