use serde::{Deserialize, Serialize};

use crate::value_objects::{ParticipantPair, RoomId, Timestamp};

/// 双人会话房间。
///
/// 不变式：任意一对无序参与者 {A,B} 至多对应一个房间，由存储层的
/// 唯一性约束保证（见 ChatRepository::create_room）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub participants: ParticipantPair,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Room {
    pub fn new(id: RoomId, participants: ParticipantPair, created_at: Timestamp) -> Self {
        Self {
            id,
            participants,
            created_at,
            updated_at: created_at,
        }
    }
}
