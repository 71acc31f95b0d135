//! Postgres 持久化实现。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    ChatRepository, Message, MessageContent, MessageDraft, MessageId, ParticipantPair,
    RepositoryError, RepositoryResult, Room, RoomId, Timestamp, UserId,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    RepositoryError::storage(err.to_string())
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

pub async fn create_pg_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

#[derive(Debug, FromRow)]
struct RoomRecord {
    id: Uuid,
    user_low: Uuid,
    user_high: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RoomRecord> for Room {
    type Error = RepositoryError;

    fn try_from(value: RoomRecord) -> Result<Self, Self::Error> {
        let participants =
            ParticipantPair::new(UserId::from(value.user_low), UserId::from(value.user_high))
                .map_err(|err| invalid_data(err.to_string()))?;

        Ok(Room {
            id: RoomId::from(value.id),
            participants,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    chat_room_id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    message_text: String,
    sent_at: DateTime<Utc>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let content =
            MessageContent::new(value.message_text).map_err(|err| invalid_data(err.to_string()))?;

        Ok(Message {
            id: MessageId::from(value.id),
            room_id: RoomId::from(value.chat_room_id),
            sender_id: UserId::from(value.sender_id),
            receiver_id: UserId::from(value.receiver_id),
            content,
            sent_at: value.sent_at,
        })
    }
}

#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn room_by_pair(&self, pair: ParticipantPair) -> RepositoryResult<Option<Room>> {
        let record = sqlx::query_as::<_, RoomRecord>(
            "SELECT id, user_low, user_high, created_at, updated_at \
             FROM chat_rooms WHERE user_low = $1 AND user_high = $2",
        )
        .bind(Uuid::from(pair.low()))
        .bind(Uuid::from(pair.high()))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Room::try_from).transpose()
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn save_message(&self, draft: MessageDraft) -> RepositoryResult<Message> {
        let message = draft.into_message(MessageId::generate());

        sqlx::query(
            "INSERT INTO messages (id, chat_room_id, sender_id, receiver_id, message_text, sent_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.room_id))
        .bind(Uuid::from(message.sender_id))
        .bind(Uuid::from(message.receiver_id))
        .bind(message.content.as_str())
        .bind(message.sent_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(message)
    }

    async fn messages_for_room(
        &self,
        room_id: RoomId,
        limit: u32,
        offset: u32,
    ) -> RepositoryResult<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, chat_room_id, sender_id, receiver_id, message_text, sent_at \
             FROM messages WHERE chat_room_id = $1 \
             ORDER BY sent_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(Uuid::from(room_id))
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }

    async fn find_room(&self, pair: ParticipantPair) -> RepositoryResult<Option<Room>> {
        self.room_by_pair(pair).await
    }

    async fn create_room(&self, pair: ParticipantPair, now: Timestamp) -> RepositoryResult<Room> {
        // 唯一约束落在 (user_low, user_high) 上；并发创建同一对时
        // 输家的 INSERT 不落行，随后的查询取回赢家的房间。
        let result = sqlx::query(
            "INSERT INTO chat_rooms (id, user_low, user_high, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) \
             ON CONFLICT (user_low, user_high) DO NOTHING",
        )
        .bind(Uuid::from(RoomId::generate()))
        .bind(Uuid::from(pair.low()))
        .bind(Uuid::from(pair.high()))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            tracing::debug!(pair = %pair, "lost room creation race, fetching existing row");
        }

        self.room_by_pair(pair)
            .await?
            .ok_or_else(|| invalid_data("room missing right after idempotent create"))
    }
}
