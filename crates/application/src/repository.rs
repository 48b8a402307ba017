use async_trait::async_trait;
use domain::{GroupTag, Message, MessageId, RepositoryError, UserId};

#[async_trait]
pub trait MessageRepository: Send + Sync {
    // 持久化新消息；返回后消息即视为已发送
    async fn insert(&self, message: Message) -> Result<Message, RepositoryError>;

    // 标记单条私聊消息已送达
    async fn mark_delivered(&self, id: MessageId) -> Result<(), RepositoryError>;

    // 将 sender -> receiver 方向所有未送达消息标记为已送达，返回更新条数
    async fn mark_conversation_delivered(
        &self,
        sender_id: &UserId,
        receiver_id: &UserId,
    ) -> Result<u64, RepositoryError>;

    // 发给某用户、尚未送达的私聊消息（按时间升序）
    async fn find_pending(&self, receiver_id: &UserId) -> Result<Vec<Message>, RepositoryError>;

    // 两个用户之间双向的会话记录（按时间升序）
    async fn find_conversation(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Vec<Message>, RepositoryError>;

    // 群聊频道的全部消息（按时间升序）
    async fn find_group(&self, group: &GroupTag) -> Result<Vec<Message>, RepositoryError>;
}

/// 外部档案系统：按用户标识解析显示名称
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn display_name(&self, user_id: &UserId) -> Result<Option<String>, RepositoryError>;
}
