use application::{MessageRepository, ProfileDirectory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    GroupTag, Message, MessageContent, MessageId, MessageKind, RepositoryError, UserId,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict,
        _ => RepositoryError::storage(err.to_string()),
    }
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

const MESSAGE_COLUMNS: &str =
    "id, sender_id, receiver_id, group_tag, content, kind, delivered, created_at";

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    sender_id: String,
    receiver_id: Option<String>,
    group_tag: Option<String>,
    content: String,
    kind: String,
    delivered: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let sender_id =
            UserId::parse(value.sender_id).map_err(|err| invalid_data(err.to_string()))?;
        let receiver_id = value
            .receiver_id
            .map(UserId::parse)
            .transpose()
            .map_err(|err| invalid_data(err.to_string()))?;
        let group = value
            .group_tag
            .map(GroupTag::parse)
            .transpose()
            .map_err(|err| invalid_data(err.to_string()))?;
        let content =
            MessageContent::new(value.content).map_err(|err| invalid_data(err.to_string()))?;
        let kind = MessageKind::parse(&value.kind).map_err(|err| invalid_data(err.to_string()))?;

        Message::restore(
            MessageId::from(value.id),
            sender_id,
            receiver_id,
            group,
            content,
            kind,
            value.delivered,
            value.created_at,
        )
        .map_err(|err| invalid_data(err.to_string()))
    }
}

fn into_messages(records: Vec<MessageRecord>) -> Result<Vec<Message>, RepositoryError> {
    records.into_iter().map(Message::try_from).collect()
}

pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn insert(&self, message: Message) -> Result<Message, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            INSERT INTO messages ({MESSAGE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(Uuid::from(message.id))
        .bind(message.sender_id.as_str())
        .bind(message.receiver_id.as_ref().map(UserId::as_str))
        .bind(message.group.as_ref().map(GroupTag::as_str))
        .bind(message.content.as_str())
        .bind(message.kind.as_str())
        .bind(message.delivered)
        .bind(message.timestamp)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Message::try_from(record)
    }

    async fn mark_delivered(&self, id: MessageId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE messages SET delivered = TRUE WHERE id = $1 AND receiver_id IS NOT NULL"#,
        )
        .bind(Uuid::from(id))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn mark_conversation_delivered(
        &self,
        sender_id: &UserId,
        receiver_id: &UserId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET delivered = TRUE
            WHERE sender_id = $1 AND receiver_id = $2 AND delivered = FALSE
            "#,
        )
        .bind(sender_id.as_str())
        .bind(receiver_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected())
    }

    async fn find_pending(&self, receiver_id: &UserId) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE receiver_id = $1 AND delivered = FALSE
            ORDER BY created_at ASC, seq ASC
            "#
        ))
        .bind(receiver_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        into_messages(records)
    }

    async fn find_conversation(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at ASC, seq ASC
            "#
        ))
        .bind(a.as_str())
        .bind(b.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        into_messages(records)
    }

    async fn find_group(&self, group: &GroupTag) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE group_tag = $1
            ORDER BY created_at ASC, seq ASC
            "#
        ))
        .bind(group.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        into_messages(records)
    }
}

/// 从 `user_profiles` 表读取显示名称
pub struct PgProfileDirectory {
    pool: PgPool,
}

impl PgProfileDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileDirectory for PgProfileDirectory {
    async fn display_name(&self, user_id: &UserId) -> Result<Option<String>, RepositoryError> {
        sqlx::query_scalar::<_, String>(
            r#"SELECT display_name FROM user_profiles WHERE user_id = $1"#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
