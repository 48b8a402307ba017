use domain::{ConnectionId, DomainError, RepositoryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// 向单个连接推送失败
///
/// 连接在查找之后、推送之前已关闭，或其发送队列已满，调用方都按离线处理。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PushError {
    #[error("connection {0} is closed")]
    ConnectionClosed(ConnectionId),
    #[error("connection {0} outbox is full")]
    QueueFull(ConnectionId),
}
