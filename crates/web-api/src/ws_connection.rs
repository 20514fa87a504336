use std::ops::ControlFlow;
use std::time::Duration;

use crate::state::AppState;
use application::{ConnectionHandle, OutboundFrame};
use axum::extract::ws::{close_code, CloseFrame, Message as WsMessage, WebSocket};
use config::HeartbeatConfig;
use domain::UserId;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};

/// 单条已认证 WebSocket 连接
///
/// 封装连接从登记到注销的完整生命周期：
/// - 登记到连接注册表
/// - 写任务独占 socket 写端，所有出站帧经由句柄通道进入
/// - 读循环处理客户端帧
/// - 可选心跳
/// - 断开时按句柄注销
pub struct WebSocketConnection {
    socket: WebSocket,
    state: AppState,
    user_id: UserId,
}

impl WebSocketConnection {
    pub fn new(socket: WebSocket, state: AppState, user_id: UserId) -> Self {
        Self {
            socket,
            state,
            user_id,
        }
    }

    /// 运行连接直到任一方向关闭
    pub async fn run(self) {
        let Self {
            socket,
            state,
            user_id,
        } = self;

        let (handle, outbound) = state.relay.connect(&user_id).await;
        let connection_id = handle.id();
        tracing::info!(user_id = %user_id, connection_id = %connection_id, "User connected");

        let (sender, mut incoming) = socket.split();
        let mut send_task = tokio::spawn(write_loop(sender, outbound));

        let (pong_tx, pong_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let heartbeat_task = spawn_heartbeat(&state.heartbeat, handle.clone(), pong_rx);

        loop {
            tokio::select! {
                message = incoming.next() => match message {
                    Some(Ok(message)) => {
                        if Self::handle_incoming(&state, &user_id, &handle, &pong_tx, message)
                            .await
                            .is_break()
                        {
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        tracing::warn!(user_id = %user_id, error = %err, "WebSocket receive error");
                        break;
                    }
                    None => {
                        tracing::debug!(user_id = %user_id, "WebSocket stream ended");
                        break;
                    }
                },
                _ = &mut send_task => {
                    tracing::debug!(user_id = %user_id, "WebSocket send task finished");
                    break;
                }
            }
        }

        send_task.abort();
        if let Some(task) = heartbeat_task {
            task.abort();
        }

        state.relay.disconnect(&user_id, &handle).await;
        tracing::info!(user_id = %user_id, connection_id = %connection_id, "User disconnected");
    }

    async fn handle_incoming(
        state: &AppState,
        user_id: &UserId,
        handle: &ConnectionHandle,
        pong_tx: &mpsc::UnboundedSender<Vec<u8>>,
        message: WsMessage,
    ) -> ControlFlow<()> {
        match message {
            WsMessage::Text(text) => {
                if let Err(err) = state.relay.handle_client_frame(user_id, text.as_str()).await {
                    tracing::warn!(user_id = %user_id, error = %err, "Discarding client frame");
                }
            }
            WsMessage::Binary(_) => {
                tracing::debug!(user_id = %user_id, "Ignoring binary frame");
            }
            WsMessage::Ping(data) => {
                handle.send(OutboundFrame::Pong(data.to_vec()));
            }
            WsMessage::Pong(data) => {
                let _ = pong_tx.send(data.to_vec());
            }
            WsMessage::Close(frame) => {
                tracing::info!(user_id = %user_id, reason = ?frame, "Client initiated close");
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}

/// 写任务：串行写出该连接的全部帧，发送关闭帧或写失败后结束
async fn write_loop(
    mut sender: SplitSink<WebSocket, WsMessage>,
    mut outbound: mpsc::UnboundedReceiver<OutboundFrame>,
) {
    while let Some(frame) = outbound.recv().await {
        let closing = matches!(frame, OutboundFrame::Close { .. });
        let message = match frame {
            OutboundFrame::Text(text) => WsMessage::Text(text.into()),
            OutboundFrame::Ping(data) => WsMessage::Ping(data.into()),
            OutboundFrame::Pong(data) => WsMessage::Pong(data.into()),
            OutboundFrame::Close { code, reason } => WsMessage::Close(Some(CloseFrame {
                code,
                reason: reason.into(),
            })),
        };

        if let Err(err) = sender.send(message).await {
            tracing::warn!(error = %err, "Failed to write WebSocket frame");
            break;
        }
        if closing {
            break;
        }
    }
}

fn spawn_heartbeat(
    config: &HeartbeatConfig,
    handle: ConnectionHandle,
    pong_rx: mpsc::UnboundedReceiver<Vec<u8>>,
) -> Option<JoinHandle<()>> {
    if !config.is_enabled() {
        return None;
    }
    Some(tokio::spawn(heartbeat_loop(
        handle,
        pong_rx,
        config.interval(),
        config.timeout(),
    )))
}

/// 定期发送 ping，超时未收到对应的 pong 则以 1001 关闭
///
/// 每个 ping 携带递增序号，只有载荷相同的 pong 才算应答。
async fn heartbeat_loop(
    handle: ConnectionHandle,
    mut pong_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    every: Duration,
    pong_timeout: Duration,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // 跳过立即触发的第一次
    ticker.tick().await;

    let mut sequence: u64 = 0;
    loop {
        ticker.tick().await;

        // 丢弃上一轮之后积压的 pong
        while pong_rx.try_recv().is_ok() {}

        sequence += 1;
        let nonce = sequence.to_be_bytes().to_vec();
        if !handle.send(OutboundFrame::Ping(nonce.clone())) {
            break;
        }

        let answered = timeout(pong_timeout, async {
            while let Some(payload) = pong_rx.recv().await {
                if payload == nonce {
                    return true;
                }
            }
            false
        })
        .await
        .unwrap_or(false);

        if !answered {
            tracing::warn!(connection_id = %handle.id(), "Pong timeout, closing connection");
            handle.send(OutboundFrame::Close {
                code: close_code::AWAY,
                reason: "Pong timeout".to_string(),
            });
            break;
        }

        // 下一个 ping 从收到应答起算满一个间隔
        ticker.reset();
    }
}
