//! 内存持久化实现。
//!
//! 集成测试与本地运行使用。create_room 在单个写锁内完成
//! 取或建，与 Postgres 实现的唯一约束给出相同的幂等语义。

use std::collections::HashMap;

use async_trait::async_trait;
use domain::{
    ChatRepository, Message, MessageDraft, MessageId, ParticipantPair, RepositoryResult, Room,
    RoomId, Timestamp,
};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryChatRepository {
    rooms: RwLock<HashMap<ParticipantPair, Room>>,
    messages: RwLock<HashMap<RoomId, Vec<Message>>>,
}

impl InMemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn save_message(&self, draft: MessageDraft) -> RepositoryResult<Message> {
        let message = draft.into_message(MessageId::generate());
        let mut messages = self.messages.write().await;
        messages
            .entry(message.room_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn messages_for_room(
        &self,
        room_id: RoomId,
        limit: u32,
        offset: u32,
    ) -> RepositoryResult<Vec<Message>> {
        let messages = self.messages.read().await;
        let mut page = messages.get(&room_id).cloned().unwrap_or_default();
        page.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(page
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_room(&self, pair: ParticipantPair) -> RepositoryResult<Option<Room>> {
        let rooms = self.rooms.read().await;
        Ok(rooms.get(&pair).cloned())
    }

    async fn create_room(&self, pair: ParticipantPair, now: Timestamp) -> RepositoryResult<Room> {
        let mut rooms = self.rooms.write().await;
        let room = rooms
            .entry(pair)
            .or_insert_with(|| Room::new(RoomId::generate(), pair, now));
        Ok(room.clone())
    }
}
