//! 中继进程入口
//!
//! 加载配置，订阅 Redis 事件总线，启动 Axum WebSocket 服务。

use std::{env, sync::Arc};

use application::{ConnectionRegistry, EventBridge, RelayService};
use config::AppConfig;
use infrastructure::{JwtTokenVerifier, RedisEventSubscriber};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 指定了配置文件时走分层加载，否则只读环境变量
    let config = if env::var("RELAY_CONFIG_FILE").is_ok() {
        AppConfig::load()?
    } else {
        AppConfig::from_env()?
    };

    let verifier = JwtTokenVerifier::new(&config.jwt);
    let registry = ConnectionRegistry::new();
    let relay = RelayService::new(registry.clone(), Arc::new(verifier));

    // 事件总线 -> 桥接任务 -> 连接注册表
    let subscriber = RedisEventSubscriber::new(&config.redis)?;
    let bus_messages = subscriber.start();
    tokio::spawn(EventBridge::new(registry).run(bus_messages));

    if config.heartbeat.is_enabled() {
        tracing::info!(
            interval_secs = config.heartbeat.interval_secs,
            timeout_secs = config.heartbeat.timeout_secs,
            "心跳检测已启用"
        );
    }

    let app = router(AppState::new(relay, config.heartbeat.clone()));
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("中继服务启动在 ws://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    subscriber.shutdown();
    tracing::info!("中继服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "无法监听关闭信号");
        std::future::pending::<()>().await;
    }
    tracing::info!("收到关闭信号");
}
