#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use application::{ConnectionRegistry, EventBridge, LocalEventBus, RelayService};
use config::{HeartbeatConfig, JwtConfig};
use domain::{ConnectionId, UserId};
use futures_util::StreamExt;
use infrastructure::JwtTokenVerifier;
use serde_json::Value;
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot,
    time::{sleep, timeout, Instant},
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{protocol::CloseFrame, Message as TungsteniteMessage},
    MaybeTlsStream, WebSocketStream,
};
use web_api::{router, AppState};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const TEST_SECRET: &str = "test-secret";

/// 测试用中继进程：真实路由、真实 JWT 校验、进程内事件总线
pub struct TestRelay {
    pub addr: SocketAddr,
    pub registry: ConnectionRegistry,
    pub bus: LocalEventBus,
    verifier: JwtTokenVerifier,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestRelay {
    pub async fn start() -> Self {
        Self::start_with_heartbeat(HeartbeatConfig::default()).await
    }

    pub async fn start_with_heartbeat(heartbeat: HeartbeatConfig) -> Self {
        let verifier = JwtTokenVerifier::new(&JwtConfig {
            secret: TEST_SECRET.to_string(),
            leeway_secs: 0,
        });
        let registry = ConnectionRegistry::new();
        let relay = RelayService::new(registry.clone(), Arc::new(verifier.clone()));

        let (bus, bus_rx) = LocalEventBus::new();
        tokio::spawn(EventBridge::new(registry.clone()).run(bus_rx));

        let app = router(AppState::new(relay, heartbeat));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            registry,
            bus,
            verifier,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn token(&self, user: &str) -> String {
        self.verifier
            .issue(&UserId::new(user), Some(Duration::from_secs(300)))
            .expect("issue token")
    }

    pub fn ws_url(&self, query: &str) -> String {
        format!("ws://{}/{}", self.addr, query)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// 以 `user` 身份连接，并等待注册表登记这条新连接
    pub async fn connect(&self, user: &str) -> Client {
        let user_id = UserId::new(user);
        let previous = self.connection_id(&user_id).await;

        let (client, _) = connect_async(self.ws_url(&format!("?token={}", self.token(user))))
            .await
            .expect("connect");

        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            let current = self.connection_id(&user_id).await;
            if current.is_some() && current != previous {
                break;
            }
            assert!(Instant::now() < deadline, "{user} was never registered");
            sleep(Duration::from_millis(10)).await;
        }
        client
    }

    pub async fn connection_id(&self, user_id: &UserId) -> Option<ConnectionId> {
        self.registry.lookup(user_id).await.map(|handle| handle.id())
    }

    /// 等待注册表满足条件
    pub async fn wait_until_registered(&self, user: &str, registered: bool) {
        let user_id = UserId::new(user);
        let deadline = Instant::now() + Duration::from_secs(3);
        while self.registry.lookup(&user_id).await.is_some() != registered {
            assert!(
                Instant::now() < deadline,
                "{user} registration never became {registered}"
            );
            sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// 读取下一条文本帧，跳过控制帧
pub async fn next_text(client: &mut Client) -> String {
    let deadline = Duration::from_secs(2);
    loop {
        let message = timeout(deadline, client.next())
            .await
            .expect("frame in time")
            .expect("stream open")
            .expect("valid frame");
        match message {
            TungsteniteMessage::Text(text) => return text.as_str().to_string(),
            TungsteniteMessage::Ping(_) | TungsteniteMessage::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

pub async fn next_json(client: &mut Client) -> Value {
    serde_json::from_str(&next_text(client).await).expect("json frame")
}

/// 读到关闭帧为止，返回关闭帧
pub async fn next_close(client: &mut Client) -> Option<CloseFrame> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, client.next()).await.expect("close in time") {
            Some(Ok(TungsteniteMessage::Close(frame))) => return frame,
            Some(Ok(_)) => continue,
            Some(Err(err)) => panic!("stream error before close frame: {err}"),
            None => panic!("stream ended without close frame"),
        }
    }
}

/// 断言在短时间内没有收到任何文本帧
pub async fn assert_silent(client: &mut Client) {
    match timeout(Duration::from_millis(300), client.next()).await {
        Err(_) => {}
        Ok(Some(Ok(TungsteniteMessage::Text(text)))) => {
            panic!("unexpected text frame: {text}")
        }
        Ok(other) => panic!("unexpected stream state: {other:?}"),
    }
}
