use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    http::{HeaderValue, StatusCode},
    response::Response,
    routing::get,
    Json, Router,
};
use domain::{GroupTag, Message, UserId};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::ApiError, state::AppState, ws_connection::WebSocketConnection};

#[derive(Debug, Serialize)]
struct OnlineUsersResponse {
    users: Vec<UserId>,
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(websocket_upgrade))
        .nest("/api/chat", chat_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/messages/{sender_id}/{receiver_id}", get(get_conversation))
        .route("/group/{group_tag}", get(get_group_history))
        .route("/pending/{user_id}", get(get_pending))
        .route("/online", get(get_online_users))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin = %origin, error = %err, "忽略无效的 CORS 来源");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn get_conversation(
    State(state): State<AppState>,
    Path((sender_id, receiver_id)): Path<(String, String)>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let sender_id = UserId::parse(sender_id)?;
    let receiver_id = UserId::parse(receiver_id)?;

    let messages = state
        .chat_service
        .conversation(&sender_id, &receiver_id)
        .await?;
    Ok(Json(messages))
}

async fn get_group_history(
    State(state): State<AppState>,
    Path(group_tag): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let group = GroupTag::parse(group_tag)?;
    let messages = state.chat_service.group_history(&group).await?;
    Ok(Json(messages))
}

async fn get_pending(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let user_id = UserId::parse(user_id)?;
    let messages = state.chat_service.pending(&user_id).await?;
    Ok(Json(messages))
}

async fn get_online_users(State(state): State<AppState>) -> Json<OnlineUsersResponse> {
    Json(OnlineUsersResponse {
        users: state.chat_service.online_users().await,
    })
}

async fn websocket_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| WebSocketConnection::new(socket, state).run())
}
