//! 集成测试支撑：基于内存仓库组装完整路由。

use std::net::SocketAddr;
use std::sync::Arc;

use application::{ChatService, ChatServiceDependencies, Clock, RoomResolver, SystemClock};
use async_trait::async_trait;
use axum::Router;
use domain::{
    ChatRepository, Message, MessageDraft, ParticipantPair, RepositoryError, RepositoryResult,
    Room, RoomId, Timestamp,
};
use infrastructure::InMemoryChatRepository;
use web_api::{router, AppState, Hub};

pub fn build_router() -> Router {
    build_router_with(Arc::new(InMemoryChatRepository::new()))
}

pub fn build_router_with(repository: Arc<dyn ChatRepository>) -> Router {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let chat_service = Arc::new(ChatService::new(ChatServiceDependencies {
        repository: repository.clone(),
    }));
    let room_resolver = Arc::new(RoomResolver::new(repository, clock.clone()));

    let state = AppState::new(chat_service, room_resolver, clock, Hub::spawn());
    router(state)
}

pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    addr
}

/// 保存永远失败的仓库，其余操作转发内存实现；
/// 用来验证落库失败抑制广播且连接存活。
#[derive(Default)]
pub struct FailingSaveRepository {
    inner: InMemoryChatRepository,
}

#[async_trait]
impl ChatRepository for FailingSaveRepository {
    async fn save_message(&self, _draft: MessageDraft) -> RepositoryResult<Message> {
        Err(RepositoryError::storage("injected save failure"))
    }

    async fn messages_for_room(
        &self,
        room_id: RoomId,
        limit: u32,
        offset: u32,
    ) -> RepositoryResult<Vec<Message>> {
        self.inner.messages_for_room(room_id, limit, offset).await
    }

    async fn find_room(&self, pair: ParticipantPair) -> RepositoryResult<Option<Room>> {
        self.inner.find_room(pair).await
    }

    async fn create_room(&self, pair: ParticipantPair, now: Timestamp) -> RepositoryResult<Room> {
        self.inner.create_room(pair, now).await
    }
}
