// 简单的本地广播器实现
use crate::broadcaster::{EventBroadcaster, EventStream};
use crate::events::ServerEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct LocalEventBroadcaster {
    sender: broadcast::Sender<ServerEvent>,
}

impl LocalEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl Default for LocalEventBroadcaster {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl EventBroadcaster for LocalEventBroadcaster {
    fn broadcast(&self, event: ServerEvent) -> usize {
        // 没有订阅者时 send 会返回错误，这种情况下事件本来就无人接收
        self.sender.send(event).unwrap_or(0)
    }

    fn subscribe(&self) -> EventStream {
        EventStream::new(self.sender.subscribe())
    }
}
