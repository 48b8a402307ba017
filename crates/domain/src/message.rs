use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{GroupTag, MessageContent, MessageId, Timestamp, UserId};

/// 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
        }
    }

    pub fn parse(value: &str) -> DomainResult<Self> {
        match value {
            "text" => Ok(MessageKind::Text),
            "image" => Ok(MessageKind::Image),
            other => Err(DomainError::invalid_argument(
                "kind",
                format!("unknown message kind '{other}'"),
            )),
        }
    }
}

/// 消息的投递目标：私聊接收者或群聊频道，二者只能有其一
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Direct(UserId),
    Group(GroupTag),
}

/// 一条聊天消息
///
/// `delivered` 只对私聊有意义，只会从 `false` 变为 `true`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupTag>,
    pub content: MessageContent,
    #[serde(default)]
    pub kind: MessageKind,
    pub delivered: bool,
    pub timestamp: Timestamp,
}

impl Message {
    /// 创建一条待投递的私聊消息
    pub fn direct(
        sender_id: UserId,
        receiver_id: UserId,
        content: MessageContent,
        kind: MessageKind,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            sender_id,
            receiver_id: Some(receiver_id),
            group: None,
            content,
            kind,
            delivered: false,
            timestamp,
        }
    }

    /// 创建一条群聊广播消息
    pub fn group(
        sender_id: UserId,
        group: GroupTag,
        content: MessageContent,
        kind: MessageKind,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            sender_id,
            receiver_id: None,
            group: Some(group),
            content,
            kind,
            delivered: false,
            timestamp,
        }
    }

    /// 从存储记录重建，校验接收者与群标签的互斥关系
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: MessageId,
        sender_id: UserId,
        receiver_id: Option<UserId>,
        group: Option<GroupTag>,
        content: MessageContent,
        kind: MessageKind,
        delivered: bool,
        timestamp: Timestamp,
    ) -> DomainResult<Self> {
        let message = Self {
            id,
            sender_id,
            receiver_id,
            group,
            content,
            kind,
            delivered,
            timestamp,
        };
        message.recipient()?;
        if message.group.is_some() && message.delivered {
            return Err(DomainError::operation_not_allowed(
                "group messages carry no delivery flag",
            ));
        }
        Ok(message)
    }

    pub fn recipient(&self) -> DomainResult<Recipient> {
        match (&self.receiver_id, &self.group) {
            (Some(receiver), None) => Ok(Recipient::Direct(receiver.clone())),
            (None, Some(group)) => Ok(Recipient::Group(group.clone())),
            _ => Err(DomainError::operation_not_allowed(
                "message must have exactly one of receiver or group",
            )),
        }
    }

    pub fn is_group(&self) -> bool {
        self.group.is_some()
    }

    /// 标记已送达；重复调用无副作用
    pub fn mark_delivered(&mut self) -> DomainResult<()> {
        if self.is_group() {
            return Err(DomainError::operation_not_allowed(
                "group messages are never individually delivered",
            ));
        }
        self.delivered = true;
        Ok(())
    }

    /// 是否属于两个用户之间的会话（不区分方向）
    pub fn is_between(&self, a: &UserId, b: &UserId) -> bool {
        match &self.receiver_id {
            Some(receiver) => {
                (&self.sender_id == a && receiver == b) || (&self.sender_id == b && receiver == a)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    fn text(value: &str) -> MessageContent {
        MessageContent::new(value).unwrap()
    }

    #[test]
    fn direct_message_starts_undelivered() {
        let mut msg = Message::direct(user("a"), user("b"), text("hi"), MessageKind::Text, Utc::now());
        assert!(!msg.delivered);
        assert_eq!(msg.recipient().unwrap(), Recipient::Direct(user("b")));

        msg.mark_delivered().unwrap();
        msg.mark_delivered().unwrap();
        assert!(msg.delivered);
    }

    #[test]
    fn group_message_cannot_be_marked_delivered() {
        let group = GroupTag::parse("doctors").unwrap();
        let mut msg = Message::group(user("a"), group, text("hello team"), MessageKind::Text, Utc::now());
        assert!(msg.receiver_id.is_none());
        assert!(msg.mark_delivered().is_err());
        assert!(!msg.delivered);
    }

    #[test]
    fn restore_rejects_both_receiver_and_group() {
        let result = Message::restore(
            MessageId::generate(),
            user("a"),
            Some(user("b")),
            Some(GroupTag::parse("doctors").unwrap()),
            text("x"),
            MessageKind::Text,
            false,
            Utc::now(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn conversation_match_is_symmetric() {
        let msg = Message::direct(user("a"), user("b"), text("hi"), MessageKind::Text, Utc::now());
        assert!(msg.is_between(&user("a"), &user("b")));
        assert!(msg.is_between(&user("b"), &user("a")));
        assert!(!msg.is_between(&user("a"), &user("c")));
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let msg = Message::direct(user("a"), user("b"), text("hi"), MessageKind::Image, Utc::now());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["senderId"], "a");
        assert_eq!(json["receiverId"], "b");
        assert_eq!(json["kind"], "image");
        assert_eq!(json["delivered"], false);
        assert!(json.get("group").is_none());
    }
}
