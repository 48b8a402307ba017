//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 服务监听地址与 CORS
//! - 消息存储后端
//! - 实时通道参数
//! - 日志过滤

use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// 配置文件路径环境变量
pub const CONFIG_FILE_ENV: &str = "APP_CONFIG_FILE";

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    /// 服务配置
    #[validate(nested)]
    pub server: ServerConfig,
    /// 存储配置
    #[validate(nested)]
    pub storage: StorageConfig,
    /// 实时通道配置
    #[validate(nested)]
    pub realtime: RealtimeConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1))]
    pub host: String,
    #[validate(range(min = 1))]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// 消息存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// 进程内存储，重启即丢失
    Memory,
    /// PostgreSQL
    Postgres,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    #[serde(default)]
    pub database_url: Option<String>,
    #[validate(range(min = 1, max = 100))]
    pub max_connections: u32,
}

/// 实时通道配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RealtimeConfig {
    /// 全局广播通道容量，落后超过该值的连接会丢失广播
    #[validate(range(min = 16))]
    pub broadcast_capacity: usize,
    /// 群聊消息未指定标签时使用的频道
    #[validate(length(min = 1, max = 64))]
    pub default_group: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` 语法，`RUST_LOG` 优先
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info,tower_http=debug".into(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 5002,
                cors_origins: vec!["*".into()],
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                database_url: None,
                max_connections: 5,
            },
            realtime: RealtimeConfig {
                broadcast_capacity: 1024,
                default_group: "doctors".into(),
            },
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// 加载顺序：默认值 -> 可选配置文件（APP_CONFIG_FILE）-> 环境变量（APP_*）
    pub fn load() -> Result<Self, ConfigError> {
        let mut fig = Figment::new().merge(Serialized::defaults(AppConfig::default()));
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            if path.ends_with(".yml") || path.ends_with(".yaml") {
                fig = fig.merge(Yaml::file(path));
            } else if path.ends_with(".json") {
                fig = fig.merge(Json::file(path));
            } else {
                fig = fig.merge(Toml::file(path));
            }
        }
        fig = fig.merge(Env::prefixed("APP_").split("__"));

        let cfg: AppConfig = fig.extract().map_err(Box::new)?;
        cfg.check()?;
        Ok(cfg)
    }

    /// 字段校验加上跨字段约束
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.storage.backend == StorageBackend::Postgres
            && self
                .storage
                .database_url
                .as_deref()
                .map_or(true, |url| url.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "storage.database_url is required for the postgres backend".into(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 用于日志输出的脱敏表示
    pub fn sanitize(&self) -> String {
        let mut redacted = self.clone();
        if let Some(url) = redacted.storage.database_url.as_mut() {
            *url = match url.find('@') {
                Some(at) => format!("postgres://[REDACTED]{}", &url[at..]),
                None => "[REDACTED]".into(),
            };
        }
        format!("{:?}", redacted)
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
