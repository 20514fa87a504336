//! Redis 消息发布者
//!
//! 供请求处理层使用：事件按种类发布到对应频道。

use application::{ApplicationError, EventPublisher};
use async_trait::async_trait;
use config::RedisConfig;
use domain::RelayEvent;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tracing::{debug, info};

use super::error::{RedisError, RedisResult};

/// Redis 发布者
///
/// 内部的 [`ConnectionManager`] 断线后自动重连，克隆开销很小。
#[derive(Clone)]
pub struct RedisEventPublisher {
    connection: ConnectionManager,
}

impl RedisEventPublisher {
    pub async fn new(config: &RedisConfig) -> RedisResult<Self> {
        let client = Client::open(config.url.as_str()).map_err(|e| RedisError::ConfigError {
            message: format!("创建 Redis 客户端失败: {}", e),
        })?;

        let connection =
            client
                .get_connection_manager()
                .await
                .map_err(|e| RedisError::ConnectionError {
                    message: format!("连接 Redis 失败: {}", e),
                })?;

        info!("Redis 发布者创建成功");
        Ok(Self { connection })
    }

    /// 向频道发布原始负载，返回订阅者数量
    pub async fn publish_raw(&self, channel: &str, payload: &str) -> RedisResult<u32> {
        let mut connection = self.connection.clone();
        let receivers: u32 =
            connection
                .publish(channel, payload)
                .await
                .map_err(|e| RedisError::PublishError {
                    message: format!("发布到频道 {} 失败: {}", channel, e),
                })?;
        Ok(receivers)
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, event: &RelayEvent) -> Result<u32, ApplicationError> {
        let payload = event.to_json()?;
        let channel = event.kind.channel();
        let receivers = self
            .publish_raw(channel, &payload)
            .await
            .map_err(|e| ApplicationError::publish(e.to_string()))?;

        debug!(
            channel,
            receiver_id = %event.receiver_id,
            receivers,
            "事件已发布"
        );
        Ok(receivers)
    }
}
