use std::sync::Arc;

use domain::{GroupTag, Message, UserId};

use crate::{
    broadcaster::{EventBroadcaster, EventStream},
    clock::Clock,
    delivery::{AckOutcome, DeliveryEngine},
    error::ApplicationError,
    events::{ClientEvent, DeliveryPair, GroupMessagePayload, SendMessagePayload, ServerEvent},
    group::GroupBroadcast,
    presence::{ConnectionHandle, PresenceDirectory},
    repository::{MessageRepository, ProfileDirectory},
    session::ConnectionSession,
    typing::TypingRelay,
};

pub struct ChatServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub profile_directory: Arc<dyn ProfileDirectory>,
    pub broadcaster: Arc<dyn EventBroadcaster>,
    pub clock: Arc<dyn Clock>,
    /// 群聊事件未带标签时使用的频道
    pub default_group: GroupTag,
}

/// 实时聊天入口
///
/// 持有进程内唯一的在线目录，把每个连接上的事件分派给对应组件。
/// 同一连接的事件由调用方串行送入，保证同一发送者到同一接收者的消息顺序。
pub struct ChatService {
    presence: Arc<PresenceDirectory>,
    delivery: DeliveryEngine,
    typing: TypingRelay,
    group: GroupBroadcast,
    messages: Arc<dyn MessageRepository>,
    broadcaster: Arc<dyn EventBroadcaster>,
    default_group: GroupTag,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        let presence = Arc::new(PresenceDirectory::new(deps.broadcaster.clone()));
        let delivery = DeliveryEngine::new(
            deps.message_repository.clone(),
            presence.clone(),
            deps.clock.clone(),
        );
        let typing = TypingRelay::new(presence.clone());
        let group = GroupBroadcast::new(
            deps.message_repository.clone(),
            deps.profile_directory,
            deps.broadcaster.clone(),
            deps.clock,
        );

        Self {
            presence,
            delivery,
            typing,
            group,
            messages: deps.message_repository,
            broadcaster: deps.broadcaster,
            default_group: deps.default_group,
        }
    }

    pub fn presence(&self) -> &Arc<PresenceDirectory> {
        &self.presence
    }

    pub fn delivery(&self) -> &DeliveryEngine {
        &self.delivery
    }

    /// 为新连接创建会话，同时返回其广播订阅
    pub fn open_session(&self, handle: ConnectionHandle) -> (ConnectionSession, EventStream) {
        let stream = self.broadcaster.subscribe();
        (ConnectionSession::open(handle, self.presence.clone()), stream)
    }

    /// 处理一个连接上的入站事件
    ///
    /// 只有首次持久化失败会以 `send-failed` 回复发送者，其余情况都在内部消化。
    pub async fn dispatch(&self, session: &mut ConnectionSession, event: ClientEvent) {
        match event {
            ClientEvent::Register(user_id) => {
                session.register(user_id).await;
            }
            ClientEvent::SendMessage(payload) => self.handle_send_message(session, payload).await,
            ClientEvent::Typing(payload) => match session.user_id() {
                Some(from_id) => {
                    self.typing.notify_typing(from_id.clone(), &payload.to).await;
                }
                None => {
                    tracing::debug!(connection_id = %session.id(), "未注册连接的输入状态被丢弃");
                }
            },
            ClientEvent::SendGroupMessage(payload) => {
                self.handle_group_message(session, payload).await
            }
            ClientEvent::MessageDelivered(DeliveryPair {
                sender_id,
                receiver_id,
            }) => {
                if let Err(err) = self
                    .delivery
                    .acknowledge_delivered(sender_id, receiver_id)
                    .await
                {
                    tracing::error!(error = %err, "处理送达确认失败");
                }
            }
        }
    }

    async fn handle_send_message(&self, session: &ConnectionSession, payload: SendMessagePayload) {
        let result = self
            .delivery
            .send_direct(
                payload.sender_id,
                payload.receiver_id,
                payload.content,
                payload.kind,
            )
            .await;
        if let Err(err) = result {
            session.reply(ServerEvent::send_failed(err.to_string()));
        }
    }

    async fn handle_group_message(&self, session: &ConnectionSession, payload: GroupMessagePayload) {
        let group = payload.group.unwrap_or_else(|| self.default_group.clone());
        let result = self
            .group
            .send_group(payload.sender_id, payload.content, payload.kind, group)
            .await;
        if let Err(err) = result {
            session.reply(ServerEvent::send_failed(err.to_string()));
        }
    }

    pub async fn acknowledge(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
    ) -> Result<AckOutcome, ApplicationError> {
        self.delivery
            .acknowledge_delivered(sender_id, receiver_id)
            .await
    }

    pub async fn conversation(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Vec<Message>, ApplicationError> {
        Ok(self.messages.find_conversation(a, b).await?)
    }

    pub async fn group_history(&self, group: &GroupTag) -> Result<Vec<Message>, ApplicationError> {
        Ok(self.messages.find_group(group).await?)
    }

    pub async fn pending(&self, receiver_id: &UserId) -> Result<Vec<Message>, ApplicationError> {
        Ok(self.messages.find_pending(receiver_id).await?)
    }

    pub async fn online_users(&self) -> Vec<UserId> {
        self.presence.online_users().await
    }
}
