//! 实时通道的线上事件格式
//!
//! 每个 WebSocket 文本帧是一个 `{"event": "...", "data": ...}` 对象，
//! 事件名使用 kebab-case，载荷字段使用 camelCase。

use domain::{GroupTag, Message, MessageContent, MessageId, MessageKind, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// 客户端发往服务器的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// 将连接绑定到用户
    #[serde(alias = "join")]
    Register(UserId),
    /// 发送私聊消息
    #[serde(alias = "private_message")]
    SendMessage(SendMessagePayload),
    /// 正在输入
    Typing(TypingPayload),
    /// 发送群聊消息
    SendGroupMessage(GroupMessagePayload),
    /// 客户端确认已渲染来自某发送者的消息
    MessageDelivered(DeliveryPair),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    #[serde(alias = "from")]
    pub sender_id: UserId,
    #[serde(alias = "to")]
    pub receiver_id: UserId,
    #[serde(alias = "message")]
    pub content: MessageContent,
    #[serde(default)]
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub to: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessagePayload {
    pub sender_id: UserId,
    #[serde(alias = "message")]
    pub content: MessageContent,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub group: Option<GroupTag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPair {
    pub sender_id: UserId,
    pub receiver_id: UserId,
}

/// 服务器推送给客户端的事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    ReceiveMessage(Message),
    ReceiveGroupMessage(GroupMessageEvent),
    Typing(TypingEvent),
    UserOnlineStatus(OnlineStatusEvent),
    MessageDelivered(DeliveryPair),
    SendFailed(SendFailedEvent),
    Error(ErrorEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessageEvent {
    pub id: MessageId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub group: GroupTag,
    pub content: MessageContent,
    pub kind: MessageKind,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub from_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineStatusEvent {
    pub user_id: UserId,
    pub online: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendFailedEvent {
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub code: String,
    pub message: String,
}

impl ServerEvent {
    pub fn online_status(user_id: UserId, online: bool) -> Self {
        ServerEvent::UserOnlineStatus(OnlineStatusEvent { user_id, online })
    }

    pub fn send_failed(reason: impl Into<String>) -> Self {
        ServerEvent::SendFailed(SendFailedEvent {
            reason: reason.into(),
        })
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerEvent::Error(ErrorEvent {
            code: code.into(),
            message: message.into(),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ClientEvent {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
