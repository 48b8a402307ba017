//! 应用层实现。
//!
//! 这里提供实时聊天的核心用例：在线目录、私聊投递、输入状态转发、
//! 群聊广播与连接生命周期，以及对外部适配器（消息存储、档案查询、广播通道）的抽象。

pub mod broadcaster;
pub mod clock;
pub mod delivery;
pub mod error;
pub mod events;
pub mod group;
pub mod local_broadcast;
pub mod memory;
pub mod presence;
pub mod repository;
pub mod services;
pub mod session;
pub mod typing;

pub use broadcaster::{EventBroadcaster, EventStream};
pub use clock::{Clock, SystemClock};
pub use delivery::{AckOutcome, DeliveryEngine};
pub use error::{ApplicationError, PushError};
pub use events::{ClientEvent, ServerEvent};
pub use group::GroupBroadcast;
pub use local_broadcast::LocalEventBroadcaster;
pub use memory::{InMemoryMessageRepository, InMemoryProfileDirectory};
pub use presence::{ConnectionHandle, PresenceDirectory};
pub use repository::{MessageRepository, ProfileDirectory};
pub use services::{ChatService, ChatServiceDependencies};
pub use session::{ConnectionSession, ConnectionState};
pub use typing::TypingRelay;
