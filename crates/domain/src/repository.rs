//! 持久化协作方的接口契约。

use async_trait::async_trait;

use crate::errors::RepositoryResult;
use crate::message::{Message, MessageDraft};
use crate::room::Room;
use crate::value_objects::{ParticipantPair, RoomId, Timestamp};

/// 消息与房间的持久化接口。
///
/// 核心只依赖这个契约；具体实现（Postgres、内存）在 infrastructure。
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// 保存消息并分配标识。
    async fn save_message(&self, draft: MessageDraft) -> RepositoryResult<Message>;

    /// 取房间消息历史，按发送时间从新到旧；无记录时返回空序列而非错误。
    async fn messages_for_room(
        &self,
        room_id: RoomId,
        limit: u32,
        offset: u32,
    ) -> RepositoryResult<Vec<Message>>;

    /// 查找参与者对对应的房间。
    async fn find_room(&self, pair: ParticipantPair) -> RepositoryResult<Option<Room>>;

    /// 创建参与者对的房间。
    ///
    /// 必须在并发创建同一对时幂等：输掉竞争的调用返回已存在的房间，
    /// 而不是错误。唯一性由存储层约束保证，不靠调用方的先查后建。
    async fn create_room(&self, pair: ParticipantPair, now: Timestamp) -> RepositoryResult<Room>;
}
