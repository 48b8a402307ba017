//! 主应用程序入口
//!
//! 加载配置，装配存储与实时聊天服务，启动 Axum Web 服务。

use std::sync::Arc;

use application::{ChatService, ChatServiceDependencies, LocalEventBroadcaster, SystemClock};
use config::AppConfig;
use domain::GroupTag;
use infrastructure::Infrastructure;
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    // RUST_LOG 优先，否则使用配置中的过滤规则
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(config = %config.sanitize(), "配置已加载");

    let infrastructure = Infrastructure::connect(&config.storage).await?;
    let default_group = GroupTag::parse(config.realtime.default_group.clone())?;

    let chat_service = ChatService::new(ChatServiceDependencies {
        message_repository: infrastructure.message_repository,
        profile_directory: infrastructure.profile_directory,
        broadcaster: Arc::new(LocalEventBroadcaster::new(
            config.realtime.broadcast_capacity,
        )),
        clock: Arc::new(SystemClock),
        default_group,
    });

    let state = AppState::new(Arc::new(chat_service));
    let app = router(state, &config.server.cors_origins);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!("聊天服务启动在 http://{}", address);
    axum::serve(listener, app).await?;

    Ok(())
}
