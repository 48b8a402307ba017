use std::collections::HashMap;
use std::sync::Arc;

use domain::{ConnectionId, UserId};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

use crate::broadcaster::EventBroadcaster;
use crate::error::PushError;
use crate::events::ServerEvent;

/// 指向一个活动连接的句柄
///
/// 推送只是把事件放进该连接的有界发送队列；写任务退出或队列已满时推送即失败。
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::Sender<ServerEvent>,
}

/// 每个连接发送队列的默认容量
pub const OUTBOX_CAPACITY: usize = 32;

impl ConnectionHandle {
    pub fn new(id: ConnectionId, sender: mpsc::Sender<ServerEvent>) -> Self {
        Self { id, sender }
    }

    /// 创建句柄以及连接写任务要消费的队列
    pub fn channel() -> (Self, mpsc::Receiver<ServerEvent>) {
        Self::with_capacity(OUTBOX_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self::new(ConnectionId::generate(), sender), receiver)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn push(&self, event: ServerEvent) -> Result<(), PushError> {
        self.sender.try_send(event).map_err(|err| match err {
            TrySendError::Full(_) => PushError::QueueFull(self.id),
            TrySendError::Closed(_) => PushError::ConnectionClosed(self.id),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

/// 在线目录：用户到其当前连接的映射
///
/// 每个用户最多对应一个连接，后注册者覆盖先注册者；没有条目即视为离线。
/// 所有写操作在同一把写锁内完成，并在锁内广播状态变化，
/// 保证状态事件与目录变更顺序一致。
pub struct PresenceDirectory {
    entries: RwLock<HashMap<UserId, ConnectionHandle>>,
    broadcaster: Arc<dyn EventBroadcaster>,
}

impl PresenceDirectory {
    pub fn new(broadcaster: Arc<dyn EventBroadcaster>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            broadcaster,
        }
    }

    /// 绑定用户与连接并广播上线
    ///
    /// 同一连接若之前绑定过其他用户，旧绑定会被释放并广播其下线。
    pub async fn register(&self, user_id: UserId, handle: ConnectionHandle) {
        let mut entries = self.entries.write().await;

        let previous_users: Vec<UserId> = entries
            .iter()
            .filter(|(user, existing)| existing.id == handle.id && **user != user_id)
            .map(|(user, _)| user.clone())
            .collect();
        for user in previous_users {
            entries.remove(&user);
            tracing::info!(user_id = %user, connection_id = %handle.id, "连接改绑其他用户，旧用户下线");
            self.broadcaster
                .broadcast(ServerEvent::online_status(user, false));
        }

        let connection_id = handle.id;
        if let Some(replaced) = entries.insert(user_id.clone(), handle) {
            if replaced.id != connection_id {
                tracing::info!(
                    user_id = %user_id,
                    old_connection_id = %replaced.id,
                    connection_id = %connection_id,
                    "用户重新连接，覆盖旧连接"
                );
            }
        }
        tracing::info!(user_id = %user_id, connection_id = %connection_id, "用户上线");
        self.broadcaster
            .broadcast(ServerEvent::online_status(user_id, true));
    }

    pub async fn lookup(&self, user_id: &UserId) -> Option<ConnectionHandle> {
        self.entries.read().await.get(user_id).cloned()
    }

    /// 按连接反查并移除条目，广播下线
    ///
    /// 连接没有对应条目（未注册、已被覆盖或重复断开）时什么也不做，返回 `None`。
    pub async fn remove(&self, connection_id: ConnectionId) -> Option<UserId> {
        let mut entries = self.entries.write().await;
        let user_id = entries
            .iter()
            .find(|(_, handle)| handle.id == connection_id)
            .map(|(user, _)| user.clone())?;
        entries.remove(&user_id);

        tracing::info!(user_id = %user_id, connection_id = %connection_id, "用户下线");
        self.broadcaster
            .broadcast(ServerEvent::online_status(user_id.clone(), false));
        Some(user_id)
    }

    pub async fn is_online(&self, user_id: &UserId) -> bool {
        self.entries.read().await.contains_key(user_id)
    }

    pub async fn online_users(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.entries.read().await.keys().cloned().collect();
        users.sort();
        users
    }
}
