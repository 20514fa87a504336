//! 连接注册表
//!
//! 用户身份到当前唯一在线连接的映射。连接任务和事件桥接任务并发读写，
//! 临界区内只做查找、插入和删除，帧写入通过每条连接自己的发送通道完成。

use std::collections::HashMap;
use std::sync::Arc;

use domain::{ConnectionId, UserId};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

/// 发送给单条连接写任务的命令
///
/// 所有写操作都经由同一个通道进入写任务，保证单连接上的帧不会交错。
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    Text(String),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close { code: u16, reason: String },
}

/// 一条在线连接的写端句柄
///
/// 克隆出的句柄共享同一个写通道；相等性按 [`ConnectionId`] 判断。
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<OutboundFrame>,
}

impl ConnectionHandle {
    /// 创建句柄以及写任务要消费的接收端
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = Self {
            id: ConnectionId::new(),
            sender,
        };
        (handle, receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// 写任务仍在运行时为 true
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    pub fn send(&self, frame: OutboundFrame) -> bool {
        self.sender.send(frame).is_ok()
    }

    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.send(OutboundFrame::Text(text.into()))
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

/// 一次投递尝试的结果，仅用于日志和测试
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Dropped,
}

/// 内存中的连接注册表
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<UserId, ConnectionHandle>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 安装 `handle` 为该用户的当前连接
    ///
    /// 已有的旧连接被覆盖但不会被关闭，返回被覆盖的句柄。
    pub async fn register(
        &self,
        user_id: UserId,
        handle: ConnectionHandle,
    ) -> Option<ConnectionHandle> {
        let connection_id = handle.id();
        let previous = {
            let mut connections = self.connections.write().await;
            connections.insert(user_id.clone(), handle)
        };

        match &previous {
            Some(old) => info!(
                user_id = %user_id,
                connection_id = %connection_id,
                replaced_connection_id = %old.id(),
                "Connection replaced existing registration"
            ),
            None => info!(user_id = %user_id, connection_id = %connection_id, "Connection registered"),
        }

        previous
    }

    /// 仅当当前登记的正是 `handle` 时才删除
    ///
    /// 被新连接顶替的旧连接稍后关闭时，不会把新连接的登记删掉。
    pub async fn unregister(&self, user_id: &UserId, handle: &ConnectionHandle) -> bool {
        let removed = {
            let mut connections = self.connections.write().await;
            match connections.get(user_id) {
                Some(current) if current == handle => connections.remove(user_id).is_some(),
                _ => false,
            }
        };

        if removed {
            info!(user_id = %user_id, connection_id = %handle.id(), "Connection unregistered");
        } else {
            debug!(
                user_id = %user_id,
                connection_id = %handle.id(),
                "Stale connection closed, registration left untouched"
            );
        }

        removed
    }

    pub async fn lookup(&self, user_id: &UserId) -> Option<ConnectionHandle> {
        let connections = self.connections.read().await;
        connections.get(user_id).cloned()
    }

    /// 尽力投递：目标不在线或连接已关闭时静默丢弃
    pub async fn send_to(&self, user_id: &UserId, payload: impl Into<String>) -> Delivery {
        let Some(handle) = self.lookup(user_id).await else {
            debug!(user_id = %user_id, "Recipient not connected, dropping payload");
            return Delivery::Dropped;
        };

        if handle.is_open() && handle.send_text(payload) {
            debug!(user_id = %user_id, connection_id = %handle.id(), "Payload queued for delivery");
            Delivery::Delivered
        } else {
            debug!(user_id = %user_id, connection_id = %handle.id(), "Recipient connection closed, dropping payload");
            Delivery::Dropped
        }
    }

    /// 已登记的用户数
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}
