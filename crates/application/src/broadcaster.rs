use tokio::sync::broadcast;

use crate::events::ServerEvent;

/// 面向所有已连接客户端的广播通道
///
/// 在线状态变化与群聊消息通过它扇出；私聊与输入状态走单连接推送。
pub trait EventBroadcaster: Send + Sync {
    /// 广播事件，返回收到该事件的订阅者数量
    fn broadcast(&self, event: ServerEvent) -> usize;

    /// 订阅之后发生的广播
    fn subscribe(&self) -> EventStream;
}

/// 单个连接持有的广播订阅
pub struct EventStream {
    receiver: broadcast::Receiver<ServerEvent>,
}

impl EventStream {
    pub fn new(receiver: broadcast::Receiver<ServerEvent>) -> Self {
        Self { receiver }
    }

    /// 等待下一条广播；通道关闭时返回 `None`
    ///
    /// 订阅者处理过慢被跳过的事件只记录日志，不中断订阅。
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "广播订阅落后，丢弃部分事件");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
