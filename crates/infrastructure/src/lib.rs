//! 基础设施层实现。
//!
//! 提供 PostgreSQL 消息存储与档案查询适配器，并按配置装配存储后端。

pub mod builder;
pub mod migrations;
pub mod repository;

pub use builder::{Infrastructure, InfrastructureError};
pub use migrations::MIGRATOR;
pub use repository::{create_pg_pool, PgMessageRepository, PgProfileDirectory};
