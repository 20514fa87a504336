//! 统一配置中心
//!
//! 中继进程的全部配置：
//! - 监听地址
//! - JWT 校验密钥
//! - Redis 事件总线连接
//! - 可选的心跳检测

use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// 服务配置
    #[validate(nested)]
    pub server: ServerConfig,
    /// JWT认证配置
    #[validate(nested)]
    pub jwt: JwtConfig,
    /// Redis配置
    #[validate(nested)]
    pub redis: RedisConfig,
    /// 心跳配置
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
}

/// JWT配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JwtConfig {
    #[validate(length(min = 1))]
    pub secret: String,
    /// 校验 `exp` 时允许的时钟偏差（秒）
    #[serde(default = "default_leeway_secs")]
    pub leeway_secs: u64,
}

/// Redis配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RedisConfig {
    #[validate(url)]
    pub url: String,
    /// 首次重连间隔，之后按指数退避
    pub reconnect_interval_ms: u64,
    /// 连续失败达到该次数时记录错误告警，重连本身不会停止
    pub max_reconnect_attempts: u32,
}

/// 心跳配置，`interval_secs` 为 0 表示关闭
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default)]
    pub interval_secs: u64,
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub timeout_secs: u64,
}

impl HeartbeatConfig {
    pub fn is_enabled(&self) -> bool {
        self.interval_secs > 0
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_leeway_secs() -> u64 {
    60
}

fn default_heartbeat_timeout_secs() -> u64 {
    10
}

const DEFAULT_PORT: u16 = 3002;

impl Default for AppConfig {
    /// 纯开发默认值，不读取环境变量
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
            },
            jwt: JwtConfig {
                secret: "dev-secret-key-not-for-production-use".to_string(),
                leeway_secs: default_leeway_secs(),
            },
            redis: RedisConfig {
                url: "redis://127.0.0.1:6379".to_string(),
                reconnect_interval_ms: 500,
                max_reconnect_attempts: 5,
            },
            heartbeat: HeartbeatConfig {
                interval_secs: 0,
                timeout_secs: default_heartbeat_timeout_secs(),
            },
        }
    }
}

impl AppConfig {
    /// 从环境变量加载配置
    ///
    /// `JWT_SECRET` 和 `REDIS_URL` 必须存在，其余使用默认值。
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.jwt.secret = required_var("JWT_SECRET")?;
        config.redis.url = required_var("REDIS_URL")?;
        config.apply_optional_env()?;
        config.validate()?;
        Ok(config)
    }

    /// 从环境变量加载配置，开发环境版本
    /// 缺失的变量全部回落到默认值，仅用于测试和开发
    pub fn from_env_with_defaults() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(secret) = env::var("JWT_SECRET") {
            config.jwt.secret = secret;
        }
        if let Ok(url) = env::var("REDIS_URL") {
            config.redis.url = url;
        }
        config.apply_optional_env()?;
        Ok(config)
    }

    /// 分层加载：默认值 -> 可选配置文件 (RELAY_CONFIG_FILE) -> 环境变量 (RELAY_*)
    pub fn load() -> Result<Self, ConfigError> {
        let mut fig = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Ok(path) = env::var("RELAY_CONFIG_FILE") {
            if path.ends_with(".yml") || path.ends_with(".yaml") {
                fig = fig.merge(Yaml::file(path));
            } else if path.ends_with(".json") {
                fig = fig.merge(Json::file(path));
            } else {
                fig = fig.merge(Toml::file(path));
            }
        }
        fig = fig.merge(Env::prefixed("RELAY_").split("__"));

        let config: AppConfig = fig
            .extract()
            .map_err(|err| ConfigError::Load(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn apply_optional_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = env::var("SERVER_HOST") {
            self.server.host = host;
        }
        self.server.port = match parsed_var("SERVER_PORT")? {
            Some(port) => port,
            None => parsed_var("PORT")?.unwrap_or(self.server.port),
        };
        if let Some(ms) = parsed_var("REDIS_RECONNECT_INTERVAL_MS")? {
            self.redis.reconnect_interval_ms = ms;
        }
        if let Some(attempts) = parsed_var("REDIS_MAX_RECONNECT_ATTEMPTS")? {
            self.redis.max_reconnect_attempts = attempts;
        }
        if let Some(leeway) = parsed_var("JWT_LEEWAY_SECS")? {
            self.jwt.leeway_secs = leeway;
        }
        if let Some(secs) = parsed_var("HEARTBEAT_INTERVAL_SECS")? {
            self.heartbeat.interval_secs = secs;
        }
        if let Some(secs) = parsed_var("HEARTBEAT_TIMEOUT_SECS")? {
            self.heartbeat.timeout_secs = secs;
        }
        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        Validate::validate(self)?;

        if !(self.redis.url.starts_with("redis://") || self.redis.url.starts_with("rediss://")) {
            return Err(ConfigError::InvalidRedisUrl(self.redis.url.clone()));
        }

        if self.heartbeat.is_enabled() && self.heartbeat.timeout_secs == 0 {
            return Err(ConfigError::InvalidHeartbeat(
                "timeout must be greater than 0 when heartbeat is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// 监听地址，形如 `0.0.0.0:3002`
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn required_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name))
}

fn parsed_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { name, value }),
        Err(_) => Ok(None),
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
    #[error("Invalid Redis URL: {0}")]
    InvalidRedisUrl(String),
    #[error("Invalid heartbeat configuration: {0}")]
    InvalidHeartbeat(String),
    #[error("Invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("Failed to load configuration: {0}")]
    Load(String),
}
