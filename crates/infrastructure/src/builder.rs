use std::sync::Arc;

use application::{
    InMemoryMessageRepository, InMemoryProfileDirectory, MessageRepository, ProfileDirectory,
};
use config::{StorageBackend, StorageConfig};
use thiserror::Error;

use crate::{
    migrations::MIGRATOR,
    repository::{create_pg_pool, PgMessageRepository, PgProfileDirectory},
};

#[derive(Debug, Error)]
pub enum InfrastructureError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("storage backend misconfigured: {0}")]
    Misconfigured(String),
}

/// 按存储配置装配好的适配器
#[derive(Clone)]
pub struct Infrastructure {
    pub message_repository: Arc<dyn MessageRepository>,
    pub profile_directory: Arc<dyn ProfileDirectory>,
}

impl Infrastructure {
    pub async fn connect(config: &StorageConfig) -> Result<Self, InfrastructureError> {
        match config.backend {
            StorageBackend::Memory => {
                tracing::warn!("使用内存存储，进程退出后消息将丢失");
                Ok(Self::in_memory())
            }
            StorageBackend::Postgres => {
                let database_url = config.database_url.as_deref().ok_or_else(|| {
                    InfrastructureError::Misconfigured("database_url is required".to_owned())
                })?;
                let pool = create_pg_pool(database_url, config.max_connections).await?;
                MIGRATOR.run(&pool).await?;
                tracing::info!(max_connections = config.max_connections, "数据库连接池已就绪");

                Ok(Self {
                    message_repository: Arc::new(PgMessageRepository::new(pool.clone())),
                    profile_directory: Arc::new(PgProfileDirectory::new(pool)),
                })
            }
        }
    }

    pub fn in_memory() -> Self {
        Self {
            message_repository: Arc::new(InMemoryMessageRepository::new()),
            profile_directory: Arc::new(InMemoryProfileDirectory::new()),
        }
    }
}
