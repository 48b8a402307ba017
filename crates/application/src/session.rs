use std::sync::Arc;

use domain::{ConnectionId, UserId};

use crate::events::ServerEvent;
use crate::presence::{ConnectionHandle, PresenceDirectory};

/// 单个物理连接的状态
///
/// 握手阶段由传输层完成，会话从 `Open` 开始。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// 已建立，尚未注册用户
    Open,
    /// 已绑定到用户
    Registered(UserId),
    /// 已关闭，之后的所有操作都被忽略
    Closed,
}

/// 连接生命周期：把一个连接绑定到在线目录，并在断开时解绑
pub struct ConnectionSession {
    handle: ConnectionHandle,
    presence: Arc<PresenceDirectory>,
    state: ConnectionState,
}

impl ConnectionSession {
    pub fn open(handle: ConnectionHandle, presence: Arc<PresenceDirectory>) -> Self {
        tracing::info!(connection_id = %handle.id(), "连接已建立");
        Self {
            handle,
            presence,
            state: ConnectionState::Open,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match &self.state {
            ConnectionState::Registered(user_id) => Some(user_id),
            _ => None,
        }
    }

    /// 注册（或改绑）用户；连接关闭后返回 `false`
    pub async fn register(&mut self, user_id: UserId) -> bool {
        if self.state == ConnectionState::Closed {
            tracing::debug!(connection_id = %self.id(), "连接已关闭，忽略注册");
            return false;
        }
        self.presence
            .register(user_id.clone(), self.handle.clone())
            .await;
        self.state = ConnectionState::Registered(user_id);
        true
    }

    /// 回复本连接；连接已断开时静默丢弃
    pub fn reply(&self, event: ServerEvent) {
        if let Err(err) = self.handle.push(event) {
            tracing::debug!(error = %err, "回复失败，连接已关闭");
        }
    }

    /// 处理传输层断开，每个连接只生效一次
    ///
    /// 返回本次是否从在线目录中移除了条目。
    pub async fn close(&mut self) -> bool {
        let previous = std::mem::replace(&mut self.state, ConnectionState::Closed);
        match previous {
            ConnectionState::Registered(user_id) => {
                let removed = self.presence.remove(self.handle.id()).await;
                if removed.is_none() {
                    tracing::debug!(
                        user_id = %user_id,
                        connection_id = %self.handle.id(),
                        "用户已被新连接覆盖，无需清理"
                    );
                }
                removed.is_some()
            }
            ConnectionState::Open => {
                tracing::info!(connection_id = %self.handle.id(), "未注册的连接断开");
                false
            }
            ConnectionState::Closed => false,
        }
    }
}
