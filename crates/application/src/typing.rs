use std::sync::Arc;

use domain::UserId;

use crate::events::{ServerEvent, TypingEvent};
use crate::presence::PresenceDirectory;

/// 输入状态转发：只推给在线用户，不排队、不重试、不持久化
pub struct TypingRelay {
    presence: Arc<PresenceDirectory>,
}

impl TypingRelay {
    pub fn new(presence: Arc<PresenceDirectory>) -> Self {
        Self { presence }
    }

    /// 返回事件是否交给了对方连接
    pub async fn notify_typing(&self, from_id: UserId, to_id: &UserId) -> bool {
        let Some(handle) = self.presence.lookup(to_id).await else {
            tracing::debug!(from_id = %from_id, to_id = %to_id, "对方离线，丢弃输入状态");
            return false;
        };
        match handle.push(ServerEvent::Typing(TypingEvent { from_id })) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(to_id = %to_id, error = %err, "输入状态推送失败");
                false
            }
        }
    }
}
