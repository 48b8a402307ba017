//! 内存实现的消息存储与档案查询（用于开发与测试）

use std::collections::HashMap;

use async_trait::async_trait;
use domain::{GroupTag, Message, MessageId, RepositoryError, UserId};
use tokio::sync::RwLock;

use crate::repository::{MessageRepository, ProfileDirectory};

#[derive(Default)]
pub struct InMemoryMessageRepository {
    messages: RwLock<Vec<Message>>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: MessageId) -> Option<Message> {
        self.messages
            .read()
            .await
            .iter()
            .find(|message| message.id == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }

    async fn select(&self, predicate: impl Fn(&Message) -> bool) -> Vec<Message> {
        let mut selected: Vec<Message> = self
            .messages
            .read()
            .await
            .iter()
            .filter(|message| predicate(message))
            .cloned()
            .collect();
        selected.sort_by_key(|message| message.timestamp);
        selected
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn insert(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut messages = self.messages.write().await;
        if messages.iter().any(|existing| existing.id == message.id) {
            return Err(RepositoryError::Conflict);
        }
        messages.push(message.clone());
        Ok(message)
    }

    async fn mark_delivered(&self, id: MessageId) -> Result<(), RepositoryError> {
        let mut messages = self.messages.write().await;
        let message = messages
            .iter_mut()
            .find(|message| message.id == id)
            .ok_or(RepositoryError::NotFound)?;
        message
            .mark_delivered()
            .map_err(|err| RepositoryError::storage(err.to_string()))
    }

    async fn mark_conversation_delivered(
        &self,
        sender_id: &UserId,
        receiver_id: &UserId,
    ) -> Result<u64, RepositoryError> {
        let mut messages = self.messages.write().await;
        let mut updated = 0;
        for message in messages.iter_mut().filter(|message| {
            !message.delivered
                && &message.sender_id == sender_id
                && message.receiver_id.as_ref() == Some(receiver_id)
        }) {
            message
                .mark_delivered()
                .map_err(|err| RepositoryError::storage(err.to_string()))?;
            updated += 1;
        }
        Ok(updated)
    }

    async fn find_pending(&self, receiver_id: &UserId) -> Result<Vec<Message>, RepositoryError> {
        Ok(self
            .select(|message| {
                !message.delivered && message.receiver_id.as_ref() == Some(receiver_id)
            })
            .await)
    }

    async fn find_conversation(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        Ok(self.select(|message| message.is_between(a, b)).await)
    }

    async fn find_group(&self, group: &GroupTag) -> Result<Vec<Message>, RepositoryError> {
        Ok(self
            .select(|message| message.group.as_ref() == Some(group))
            .await)
    }
}

#[derive(Default)]
pub struct InMemoryProfileDirectory {
    names: RwLock<HashMap<UserId, String>>,
}

impl InMemoryProfileDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = (UserId, String)>) -> Self {
        Self {
            names: RwLock::new(profiles.into_iter().collect()),
        }
    }

    pub async fn insert(&self, user_id: UserId, name: impl Into<String>) {
        self.names.write().await.insert(user_id, name.into());
    }
}

#[async_trait]
impl ProfileDirectory for InMemoryProfileDirectory {
    async fn display_name(&self, user_id: &UserId) -> Result<Option<String>, RepositoryError> {
        Ok(self.names.read().await.get(user_id).cloned())
    }
}
