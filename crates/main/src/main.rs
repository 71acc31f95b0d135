//! 主应用程序入口
//!
//! 启动连接枢纽与 Axum Web API 服务。

use std::sync::Arc;

use application::{ChatService, ChatServiceDependencies, Clock, RoomResolver, SystemClock};
use config::AppConfig;
use domain::ChatRepository;
use infrastructure::{create_pg_pool, PgChatRepository};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState, Hub};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env();
    tracing::info!(
        "连接数据库: {}",
        config.database.url.split('@').last().unwrap_or("unknown")
    );

    let pg_pool = create_pg_pool(&config.database.url, config.database.max_connections).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    let repository: Arc<dyn ChatRepository> = Arc::new(PgChatRepository::new(pg_pool));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
        repository: repository.clone(),
    }));
    let room_resolver = Arc::new(RoomResolver::new(repository, clock.clone()));

    // 枢纽协调循环：整个进程只有这一个任务
    let hub = Hub::spawn();

    let state = AppState::new(chat_service, room_resolver, clock, hub);
    let app = router(state);

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    tracing::info!(
        "聊天服务器启动在 http://{}:{}",
        config.server.host,
        config.server.port
    );
    axum::serve(listener, app).await?;

    Ok(())
}
