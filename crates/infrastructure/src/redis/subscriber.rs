//! Redis 消息订阅者
//!
//! 启动时订阅固定的事件频道集合，把收到的原始消息转入桥接任务的输入通道，
//! 连接断开后按指数退避无限重连，退避上限 30 秒。

use application::BusMessage;
use config::RedisConfig;
use domain::EventKind;
use futures_util::stream::StreamExt;
use redis::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, info, warn};

use super::error::{RedisError, RedisResult};

/// 重连退避上限
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Redis 事件订阅者
pub struct RedisEventSubscriber {
    client: Client,
    config: RedisConfig,
    channels: Vec<String>,
    shutdown_signal: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    running: Arc<AtomicBool>,
}

impl RedisEventSubscriber {
    /// 创建订阅者，此时只校验 URL，不建立连接
    pub fn new(config: &RedisConfig) -> RedisResult<Self> {
        let client = Client::open(config.url.as_str()).map_err(|e| RedisError::ConfigError {
            message: format!("创建 Redis 客户端失败: {}", e),
        })?;

        Ok(Self {
            client,
            config: config.clone(),
            channels: EventKind::channels().map(str::to_string).collect(),
            shutdown_signal: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// 订阅的频道列表，运行期间不变
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// 在后台任务中开始监听
    ///
    /// 返回的接收端在监听任务彻底停止后关闭。
    pub fn start(&self) -> mpsc::UnboundedReceiver<BusMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();

        info!(channels = ?self.channels, "启动 Redis 事件订阅");

        self.running.store(true, Ordering::Relaxed);
        let running = Arc::clone(&self.running);
        let listen = Self::listen_loop(
            self.client.clone(),
            self.config.clone(),
            self.channels.clone(),
            Arc::clone(&self.shutdown_signal),
            Arc::clone(&self.shutdown_notify),
            sender,
        );
        tokio::spawn(async move {
            listen.await;
            running.store(false, Ordering::Relaxed);
        });

        receiver
    }

    /// 监听循环，负责重连
    ///
    /// 只在关闭信号或桥接任务退出时结束。连续失败达到 `max_reconnect_attempts`
    /// 次时额外记录一次，之后继续按退避间隔重试。
    async fn listen_loop(
        client: Client,
        config: RedisConfig,
        channels: Vec<String>,
        shutdown_signal: Arc<AtomicBool>,
        shutdown_notify: Arc<Notify>,
        sender: mpsc::UnboundedSender<BusMessage>,
    ) {
        let mut retry_count: u32 = 0;

        while !shutdown_signal.load(Ordering::Relaxed) && !sender.is_closed() {
            match Self::create_and_listen(&client, &channels, &sender, &shutdown_signal).await {
                Ok(()) => {
                    retry_count = 0;
                    info!("Redis 订阅连接已结束");
                }
                Err(e) => {
                    retry_count = retry_count.saturating_add(1);
                    error!(error = %e, retry_count, "Redis 订阅错误");

                    if retry_count == config.max_reconnect_attempts {
                        error!(retry_count, "Redis 订阅连续失败，继续后台重连");
                    }

                    let delay = reconnect_delay(config.reconnect_interval_ms, retry_count);
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = shutdown_notify.notified() => {}
                    }
                }
            }
        }

        info!("Redis 事件订阅已停止");
    }

    /// 创建连接、订阅全部频道并转发消息
    async fn create_and_listen(
        client: &Client,
        channels: &[String],
        sender: &mpsc::UnboundedSender<BusMessage>,
        shutdown_signal: &Arc<AtomicBool>,
    ) -> RedisResult<()> {
        let mut pubsub =
            client
                .get_async_pubsub()
                .await
                .map_err(|e| RedisError::ConnectionError {
                    message: format!("获取 PubSub 连接失败: {}", e),
                })?;

        for channel in channels {
            pubsub
                .subscribe(channel.as_str())
                .await
                .map_err(|e| RedisError::SubscribeError {
                    message: format!("订阅频道 {} 失败: {}", channel, e),
                })?;
        }

        info!("已订阅 {} 个频道", channels.len());

        let messages = pubsub.on_message();
        tokio::pin!(messages);
        loop {
            if shutdown_signal.load(Ordering::Relaxed) {
                break;
            }

            // 使用超时避免无限阻塞，便于检查关闭信号
            match timeout(Duration::from_millis(1000), messages.next()).await {
                Ok(Some(msg)) => {
                    let channel = msg.get_channel_name().to_string();
                    match msg.get_payload::<String>() {
                        Ok(payload) => {
                            debug!(channel = %channel, "收到事件总线消息");
                            if sender.send(BusMessage::new(channel, payload)).is_err() {
                                warn!("桥接任务已关闭，停止转发");
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(channel = %channel, error = %e, "获取消息负载失败");
                        }
                    }
                }
                Ok(None) => {
                    // Stream 结束，连接已断开
                    break;
                }
                Err(_) => continue,
            }
        }

        Ok(())
    }

    /// 通知监听循环退出
    pub fn shutdown(&self) {
        info!("开始关闭 Redis 订阅者");
        self.shutdown_signal.store(true, Ordering::Relaxed);
        self.shutdown_notify.notify_one();
    }

    /// 监听任务仍在运行时为 true
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

impl Drop for RedisEventSubscriber {
    fn drop(&mut self) {
        self.shutdown_signal.store(true, Ordering::Relaxed);
        self.shutdown_notify.notify_one();
    }
}

/// 第 `attempt` 次失败后的等待时间：`interval * 2^(attempt-1)`，不超过上限
fn reconnect_delay(interval_ms: u64, attempt: u32) -> Duration {
    let factor = 2_u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(interval_ms.saturating_mul(factor)).min(MAX_RECONNECT_DELAY)
}
