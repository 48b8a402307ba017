#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use application::{
    ChatService, ChatServiceDependencies, InMemoryMessageRepository, InMemoryProfileDirectory,
    LocalEventBroadcaster, SystemClock,
};
use domain::{GroupTag, UserId};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use web_api::{router, AppState};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    pub profiles: Arc<InMemoryProfileDirectory>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let profiles = Arc::new(InMemoryProfileDirectory::new());
        let chat_service = ChatService::new(ChatServiceDependencies {
            message_repository: Arc::new(InMemoryMessageRepository::new()),
            profile_directory: profiles.clone(),
            broadcaster: Arc::new(LocalEventBroadcaster::new(256)),
            clock: Arc::new(SystemClock),
            default_group: GroupTag::parse("doctors").expect("group tag"),
        });
        let app = router(AppState::new(Arc::new(chat_service)), &["*".to_owned()]);

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Self {
            addr,
            profiles,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn connect(&self) -> WsClient {
        let (ws, _) = connect_async(format!("ws://{}/ws", self.addr))
            .await
            .expect("websocket connect");
        ws
    }

    /// 连接并注册，等到自己的上线广播后返回
    pub async fn connect_as(&self, user_id: &str) -> WsClient {
        let mut ws = self.connect().await;
        send_event(&mut ws, "register", Value::String(user_id.to_owned())).await;
        loop {
            let event = next_event(&mut ws, "user-online-status").await;
            if event["userId"] == user_id && event["online"] == true {
                return ws;
            }
        }
    }

    pub async fn get_json(&self, path: &str) -> Value {
        reqwest::get(self.http(path))
            .await
            .expect("http request")
            .json::<Value>()
            .await
            .expect("json body")
    }

    pub async fn set_profile(&self, user_id: &str, name: &str) {
        self.profiles
            .insert(UserId::parse(user_id).expect("user id"), name)
            .await;
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub async fn send_event(ws: &mut WsClient, event: &str, data: Value) {
    let frame = serde_json::json!({ "event": event, "data": data });
    send_raw(ws, &frame.to_string()).await;
}

pub async fn send_raw(ws: &mut WsClient, text: &str) {
    ws.send(Message::Text(text.to_owned().into()))
        .await
        .expect("send frame");
}

/// 等待指定名称的事件并返回其 `data`，跳过其他事件
pub async fn next_event(ws: &mut WsClient, name: &str) -> Value {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let frame = ws
                .next()
                .await
                .expect("stream ended")
                .expect("websocket error");
            if let Message::Text(text) = frame {
                let value: Value = serde_json::from_str(text.as_str()).expect("json frame");
                if value["event"] == name {
                    return value["data"].clone();
                }
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {name}"))
}

/// 在给定时间内确认没有收到指定事件
pub async fn assert_no_event(ws: &mut WsClient, name: &str, wait: Duration) {
    let result = tokio::time::timeout(wait, next_event_quiet(ws, name)).await;
    assert!(result.is_err(), "unexpected {name} event: {result:?}");
}

async fn next_event_quiet(ws: &mut WsClient, name: &str) -> Value {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                let value: Value = serde_json::from_str(text.as_str()).expect("json frame");
                if value["event"] == name {
                    return value["data"].clone();
                }
            }
            Some(Ok(_)) => {}
            _ => std::future::pending::<()>().await,
        }
    }
}

/// 轮询 HTTP 接口直到条件满足
pub async fn eventually<F>(server: &TestServer, path: &str, check: F) -> Value
where
    F: Fn(&Value) -> bool,
{
    for _ in 0..50 {
        let body = server.get_json(path).await;
        if check(&body) {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition on {path} never held");
}
