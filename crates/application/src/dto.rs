use domain::{Message, Room, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 消息的对外投影，字段名即存储与线上的形态。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub message_text: String,
    pub timestamp: Timestamp,
    pub chat_room_id: Uuid,
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: Uuid::from(message.id),
            sender_id: Uuid::from(message.sender_id),
            receiver_id: Uuid::from(message.receiver_id),
            message_text: message.content.as_str().to_owned(),
            timestamp: message.sent_at,
            chat_room_id: Uuid::from(message.room_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDto {
    pub chat_room_id: Uuid,
    pub user_ids: Vec<Uuid>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<&Room> for RoomDto {
    fn from(room: &Room) -> Self {
        Self {
            chat_room_id: Uuid::from(room.id),
            user_ids: vec![
                Uuid::from(room.participants.low()),
                Uuid::from(room.participants.high()),
            ],
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }
}
