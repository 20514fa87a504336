//! Web API 层。
//!
//! 提供 Axum 路由：健康检查，以及把 WebSocket 升级请求交给连接生命周期处理。

mod routes;
mod state;
mod ws_connection;

pub use config::HeartbeatConfig;
pub use routes::router;
pub use state::AppState;
