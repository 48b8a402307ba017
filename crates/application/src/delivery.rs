use std::sync::Arc;

use domain::{Message, MessageContent, MessageKind, UserId};

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::events::{DeliveryPair, ServerEvent};
use crate::presence::PresenceDirectory;
use crate::repository::MessageRepository;

/// 客户端确认的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckOutcome {
    /// 本次从未送达变为已送达的消息数
    pub updated: u64,
    /// 是否向在线的发送者推送了确认
    pub sender_notified: bool,
}

/// 私聊投递引擎
///
/// 先持久化再路由：持久化失败即发送失败；推送成功后回写送达标记，
/// 回写失败只记日志（客户端已经收到消息，存储中仍显示未送达）。
pub struct DeliveryEngine {
    messages: Arc<dyn MessageRepository>,
    presence: Arc<PresenceDirectory>,
    clock: Arc<dyn Clock>,
}

impl DeliveryEngine {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        presence: Arc<PresenceDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            messages,
            presence,
            clock,
        }
    }

    pub async fn send_direct(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        content: MessageContent,
        kind: MessageKind,
    ) -> Result<Message, ApplicationError> {
        let message = Message::direct(
            sender_id,
            receiver_id.clone(),
            content,
            kind,
            self.clock.now(),
        );

        let mut stored = self.messages.insert(message).await.map_err(|err| {
            tracing::error!(error = %err, "消息持久化失败");
            ApplicationError::from(err)
        })?;

        // 持久化期间接收者可能已上线、下线或换了连接，这里必须重新查找
        let Some(handle) = self.presence.lookup(&receiver_id).await else {
            tracing::debug!(message_id = %stored.id, "接收者离线，消息待取");
            return Ok(stored);
        };

        if let Err(err) = handle.push(ServerEvent::ReceiveMessage(stored.clone())) {
            tracing::warn!(
                message_id = %stored.id,
                error = %err,
                "推送失败（连接已关闭或队列已满），消息保持未送达"
            );
            return Ok(stored);
        }

        match self.messages.mark_delivered(stored.id).await {
            Ok(()) => {
                stored.mark_delivered()?;
            }
            Err(err) => {
                tracing::warn!(
                    message_id = %stored.id,
                    error = %err,
                    "消息已推送但送达标记写入失败"
                );
            }
        }

        Ok(stored)
    }

    /// 处理接收方的“已渲染”确认
    ///
    /// 与推送时的送达标记相互独立：即使没有需要更新的消息，
    /// 只要发送者在线就会再次收到确认事件。
    pub async fn acknowledge_delivered(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
    ) -> Result<AckOutcome, ApplicationError> {
        let updated = self
            .messages
            .mark_conversation_delivered(&sender_id, &receiver_id)
            .await?;

        let sender_notified = match self.presence.lookup(&sender_id).await {
            Some(handle) => {
                let event = ServerEvent::MessageDelivered(DeliveryPair {
                    sender_id: sender_id.clone(),
                    receiver_id: receiver_id.clone(),
                });
                match handle.push(event) {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::warn!(sender_id = %sender_id, error = %err, "送达确认推送失败");
                        false
                    }
                }
            }
            None => false,
        };

        tracing::debug!(
            sender_id = %sender_id,
            receiver_id = %receiver_id,
            updated,
            sender_notified,
            "处理送达确认"
        );

        Ok(AckOutcome {
            updated,
            sender_notified,
        })
    }
}
