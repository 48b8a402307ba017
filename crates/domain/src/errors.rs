//! 领域模型错误定义
//!
//! 定义了领域层与存储层共享的错误类型。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// 参数校验失败
    #[error("invalid argument {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 违反实体不变量的操作
    #[error("operation not allowed: {0}")]
    OperationNotAllowed(String),
}

impl DomainError {
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn operation_not_allowed(reason: impl Into<String>) -> Self {
        Self::OperationNotAllowed(reason.into())
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;

/// 持久化错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
    #[error("storage failure: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}
