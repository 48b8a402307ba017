use application::{ClientEvent, ConnectionHandle, ServerEvent};
use axum::body::Bytes;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::state::AppState;

/// 单个 WebSocket 连接
///
/// 写方向由独立任务负责，合并本连接的私有推送、全体广播与心跳回应。
/// 读方向在当前任务中逐帧解析并串行分派，保证同一连接上的事件按到达顺序处理。
pub struct WebSocketConnection {
    socket: WebSocket,
    state: AppState,
}

impl WebSocketConnection {
    pub fn new(socket: WebSocket, state: AppState) -> Self {
        Self { socket, state }
    }

    pub async fn run(self) {
        let chat_service = self.state.chat_service.clone();
        let (handle, mut outbox) = ConnectionHandle::channel();
        let (mut session, mut broadcasts) = chat_service.open_session(handle);
        let connection_id = session.id();

        let (mut sender, mut incoming) = self.socket.split();
        let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<Bytes>();

        let mut send_task = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    Some(event) = outbox.recv() => event,
                    Some(event) = broadcasts.recv() => event,
                    Some(data) = pong_rx.recv() => {
                        if sender.send(WsMessage::Pong(data)).await.is_err() {
                            tracing::warn!("Failed to send pong message");
                            break;
                        }
                        continue;
                    }
                    else => break,
                };

                let payload = match event.to_json() {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to serialize websocket payload");
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                    tracing::warn!("Failed to send text message");
                    break;
                }
            }
            tracing::info!("WebSocket发送任务结束");
        });

        let recv_loop = async {
            while let Some(frame) = incoming.next().await {
                let message = match frame {
                    Ok(message) => message,
                    Err(err) => {
                        tracing::debug!(error = %err, "WebSocket读取失败");
                        break;
                    }
                };

                match message {
                    WsMessage::Text(text) => match ClientEvent::from_json(text.as_str()) {
                        Ok(event) => chat_service.dispatch(&mut session, event).await,
                        Err(err) => {
                            tracing::warn!(connection_id = %connection_id, error = %err, "无法解析客户端事件");
                            session.reply(ServerEvent::error("INVALID_EVENT", err.to_string()));
                        }
                    },
                    WsMessage::Binary(_) => {
                        session.reply(ServerEvent::error(
                            "UNSUPPORTED_FRAME",
                            "binary frames are not supported",
                        ));
                    }
                    WsMessage::Ping(data) => {
                        tracing::debug!("收到ping消息，发送pong回应");
                        if pong_tx.send(data).is_err() {
                            break;
                        }
                    }
                    WsMessage::Pong(_) => {
                        tracing::debug!("收到pong消息");
                    }
                    WsMessage::Close(_) => {
                        tracing::info!("WebSocket收到关闭消息");
                        break;
                    }
                }
            }
        };

        // 等待任意一个方向结束（连接断开）
        let send_finished = tokio::select! {
            _ = &mut send_task => {
                tracing::info!("WebSocket发送任务完成");
                true
            }
            _ = recv_loop => {
                tracing::info!("WebSocket接收循环完成");
                false
            }
        };

        // 先摘除在线条目，再停掉写任务，队列关闭前不会再有新的路由
        session.close().await;
        if !send_finished {
            send_task.abort();
            let _ = send_task.await;
        }
        tracing::info!(connection_id = %connection_id, "WebSocket连接已断开，在线状态已清理");
    }
}
