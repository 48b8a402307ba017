//! 实时聊天核心领域模型
//!
//! 包含用户标识、连接标识、消息实体，以及相关的校验规则与错误类型。

pub mod errors;
pub mod message;
pub mod value_objects;

// 重新导出常用类型
pub use errors::*;
pub use message::*;
pub use value_objects::*;
