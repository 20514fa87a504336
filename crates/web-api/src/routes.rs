use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    routing::get,
    Json, Router,
};
use application::AuthError;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::{state::AppState, ws_connection::WebSocketConnection};

/// WebSocket连接查询参数
#[derive(Debug, Deserialize)]
struct WsAuthQuery {
    token: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // 客户端直接连接根路径，`/ws` 为显式别名
        .route("/", get(websocket_upgrade))
        .route("/ws", get(websocket_upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "connections": state.registry().len().await,
    }))
}

/// 握手阶段完成认证；失败时仍完成升级，再以 1008 关闭，客户端能看到具体原因
async fn websocket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsAuthQuery>,
) -> Response {
    match state.relay.authenticate(query.token.as_deref()) {
        Ok(user_id) => {
            tracing::info!(user_id = %user_id, "WebSocket connection authenticated");
            ws.on_upgrade(move |socket| WebSocketConnection::new(socket, state, user_id).run())
        }
        Err(err) => {
            tracing::warn!(error = %err, reason = err.close_reason(), "WebSocket auth failed");
            ws.on_upgrade(move |socket| reject(socket, err))
        }
    }
}

async fn reject(mut socket: WebSocket, err: AuthError) {
    let close_frame = CloseFrame {
        code: close_code::POLICY,
        reason: err.close_reason().into(),
    };
    if let Err(send_err) = socket.send(WsMessage::Close(Some(close_frame))).await {
        tracing::debug!(error = %send_err, "Failed to send close frame to rejected client");
    }
}
