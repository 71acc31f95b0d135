use serde::{Deserialize, Serialize};

use crate::value_objects::{MessageContent, MessageId, RoomId, Timestamp, UserId};

/// 已持久化的消息，创建后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: MessageContent,
    pub sent_at: Timestamp,
}

/// 持久化前的消息草稿；标识由存储层在保存时分配。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: MessageContent,
    pub sent_at: Timestamp,
}

impl MessageDraft {
    pub fn new(
        room_id: RoomId,
        sender_id: UserId,
        receiver_id: UserId,
        content: MessageContent,
        sent_at: Timestamp,
    ) -> Self {
        Self {
            room_id,
            sender_id,
            receiver_id,
            content,
            sent_at,
        }
    }

    /// 分配标识，升级为持久化消息。
    pub fn into_message(self, id: MessageId) -> Message {
        Message {
            id,
            room_id: self.room_id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            content: self.content,
            sent_at: self.sent_at,
        }
    }
}
