//! 双人房间解析。
//!
//! 把一对无序的用户标识映射到唯一的房间，首次使用时创建。

use std::sync::Arc;

use domain::{ChatRepository, ParticipantPair, Room, UserId};

use crate::{clock::Clock, error::ApplicationResult};

pub struct RoomResolver {
    repository: Arc<dyn ChatRepository>,
    clock: Arc<dyn Clock>,
}

impl RoomResolver {
    pub fn new(repository: Arc<dyn ChatRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// 取出或创建这对用户的房间。
    ///
    /// 两个并发调用可能同时观察到"不存在"；create_room 的契约保证
    /// 输掉竞争的一方拿到已存在的房间，因此两侧返回同一个 Room，
    /// 竞争结果对调用方不可见。
    pub async fn resolve(&self, a: UserId, b: UserId) -> ApplicationResult<Room> {
        let pair = ParticipantPair::new(a, b)?;

        if let Some(room) = self.repository.find_room(pair).await? {
            return Ok(room);
        }

        let room = self.repository.create_room(pair, self.clock.now()).await?;
        tracing::debug!(room_id = %room.id, pair = %pair, "room resolved");
        Ok(room)
    }
}
