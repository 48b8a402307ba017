use std::sync::Arc;

use domain::{GroupTag, Message, MessageContent, MessageKind, UserId};

use crate::broadcaster::EventBroadcaster;
use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::events::{GroupMessageEvent, ServerEvent};
use crate::repository::{MessageRepository, ProfileDirectory};

const UNKNOWN_SENDER: &str = "Unknown";

/// 群聊广播
///
/// 没有成员概念：消息扇出给当前所有连接，与群标签无关。
/// 群消息不记录逐人送达状态。
pub struct GroupBroadcast {
    messages: Arc<dyn MessageRepository>,
    profiles: Arc<dyn ProfileDirectory>,
    broadcaster: Arc<dyn EventBroadcaster>,
    clock: Arc<dyn Clock>,
}

impl GroupBroadcast {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        profiles: Arc<dyn ProfileDirectory>,
        broadcaster: Arc<dyn EventBroadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            messages,
            profiles,
            broadcaster,
            clock,
        }
    }

    pub async fn send_group(
        &self,
        sender_id: UserId,
        content: MessageContent,
        kind: MessageKind,
        group: GroupTag,
    ) -> Result<Message, ApplicationError> {
        let sender_name = self.resolve_name(&sender_id).await;

        let message = Message::group(sender_id, group.clone(), content, kind, self.clock.now());
        let stored = self.messages.insert(message).await.map_err(|err| {
            tracing::error!(group = %group, error = %err, "群聊消息持久化失败");
            ApplicationError::from(err)
        })?;

        let receivers = self
            .broadcaster
            .broadcast(ServerEvent::ReceiveGroupMessage(GroupMessageEvent {
                id: stored.id,
                sender_id: stored.sender_id.clone(),
                sender_name,
                group,
                content: stored.content.clone(),
                kind: stored.kind,
                timestamp: stored.timestamp,
            }));
        tracing::debug!(message_id = %stored.id, receivers, "群聊消息已广播");

        Ok(stored)
    }

    async fn resolve_name(&self, sender_id: &UserId) -> String {
        match self.profiles.display_name(sender_id).await {
            Ok(Some(name)) => name,
            Ok(None) => UNKNOWN_SENDER.to_owned(),
            Err(err) => {
                tracing::warn!(sender_id = %sender_id, error = %err, "查询发送者名称失败");
                UNKNOWN_SENDER.to_owned()
            }
        }
    }
}
