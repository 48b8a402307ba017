//! Web API 层。
//!
//! 提供 Axum 路由：`/ws` 实时通道，以及只读的聊天记录查询接口。

mod error;
mod routes;
mod state;
mod ws_connection;

pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
