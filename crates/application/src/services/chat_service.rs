//! 消息用例服务。
//!
//! 落库与历史查询。落库失败由调用方决定后续（连接 actor 会据此
//! 抑制广播），这里只负责校验、构造草稿并转交持久化协作方。

use std::sync::Arc;

use domain::{ChatRepository, Message, MessageContent, MessageDraft, RoomId, Timestamp, UserId};

use crate::error::ApplicationResult;

#[derive(Debug, Clone)]
pub struct RecordMessageRequest {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub message_text: String,
    /// 发送时刻由连接 actor 分配（同一发送者内单调递增）。
    pub sent_at: Timestamp,
}

pub struct ChatServiceDependencies {
    pub repository: Arc<dyn ChatRepository>,
}

pub struct ChatService {
    repository: Arc<dyn ChatRepository>,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self {
            repository: deps.repository,
        }
    }

    /// 校验并持久化一条消息，返回带标识的持久化结果。
    pub async fn record_message(&self, request: RecordMessageRequest) -> ApplicationResult<Message> {
        let content = MessageContent::new(request.message_text)?;
        let draft = MessageDraft::new(
            request.room_id,
            request.sender_id,
            request.receiver_id,
            content,
            request.sent_at,
        );

        let message = self.repository.save_message(draft).await?;
        tracing::debug!(message_id = %message.id, room_id = %message.room_id, "message recorded");
        Ok(message)
    }

    /// 房间历史，从新到旧；空房间返回空序列。
    pub async fn history(
        &self,
        room_id: RoomId,
        limit: u32,
        offset: u32,
    ) -> ApplicationResult<Vec<Message>> {
        let messages = self
            .repository
            .messages_for_room(room_id, limit, offset)
            .await?;
        Ok(messages)
    }
}
