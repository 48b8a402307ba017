#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use application::events::{GroupMessageEvent, SendMessagePayload};
use application::{
    ChatService, ChatServiceDependencies, ClientEvent, Clock, ConnectionHandle, ConnectionSession,
    EventStream, InMemoryProfileDirectory, LocalEventBroadcaster, MessageRepository,
    ProfileDirectory, ServerEvent,
};
use chrono::DateTime;
use domain::{GroupTag, MessageContent, MessageKind, Timestamp, UserId};
use tokio::sync::mpsc;

/// 每次取值递增一秒，保证消息时间戳有序
#[derive(Default)]
pub struct StepClock {
    ticks: AtomicI64,
}

impl Clock for StepClock {
    fn now(&self) -> Timestamp {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        DateTime::from_timestamp(1_700_000_000 + tick, 0).unwrap()
    }
}

pub fn user(id: &str) -> UserId {
    UserId::parse(id).unwrap()
}

pub fn content(text: &str) -> MessageContent {
    MessageContent::new(text).unwrap()
}

pub fn doctors() -> GroupTag {
    GroupTag::parse("doctors").unwrap()
}

pub fn chat_service(
    messages: Arc<dyn MessageRepository>,
    profiles: Arc<dyn ProfileDirectory>,
) -> Arc<ChatService> {
    Arc::new(ChatService::new(ChatServiceDependencies {
        message_repository: messages,
        profile_directory: profiles,
        broadcaster: Arc::new(LocalEventBroadcaster::new(256)),
        clock: Arc::new(StepClock::default()),
        default_group: doctors(),
    }))
}

pub fn empty_profiles() -> Arc<dyn ProfileDirectory> {
    Arc::new(InMemoryProfileDirectory::new())
}

/// 模拟一个客户端连接：会话、私有推送队列与广播订阅
pub struct TestClient {
    pub session: ConnectionSession,
    pub inbox: mpsc::Receiver<ServerEvent>,
    pub stream: EventStream,
}

impl TestClient {
    pub async fn connect(service: &ChatService, user_id: Option<&str>) -> Self {
        let (handle, inbox) = ConnectionHandle::channel();
        let (mut session, stream) = service.open_session(handle);
        if let Some(id) = user_id {
            service
                .dispatch(&mut session, ClientEvent::Register(user(id)))
                .await;
        }
        Self {
            session,
            inbox,
            stream,
        }
    }

    pub async fn send(&mut self, service: &ChatService, from: &str, to: &str, text: &str) {
        let event = ClientEvent::SendMessage(SendMessagePayload {
            sender_id: user(from),
            receiver_id: user(to),
            content: content(text),
            kind: MessageKind::Text,
        });
        service.dispatch(&mut self.session, event).await;
    }

    /// 取出已经排队的私有推送，不等待
    pub fn pushed(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.inbox.try_recv() {
            events.push(event);
        }
        events
    }

    /// 跳过在线状态等广播，等待下一条群聊消息
    pub async fn next_group_message(&mut self) -> GroupMessageEvent {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(1), self.stream.recv())
                .await
                .expect("timed out waiting for group message")
                .expect("broadcast closed");
            if let ServerEvent::ReceiveGroupMessage(message) = event {
                return message;
            }
        }
    }
}
