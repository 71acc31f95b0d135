//! 应用层实现。
//!
//! 围绕领域模型的用例服务：消息落库与历史查询、双人房间解析，
//! 以及对时间来源的抽象。

pub mod clock;
pub mod dto;
pub mod error;
pub mod room_resolver;
pub mod services;

pub use clock::{Clock, SystemClock};
pub use dto::{MessageDto, RoomDto};
pub use error::{ApplicationError, ApplicationResult};
pub use room_resolver::RoomResolver;
pub use services::{ChatService, ChatServiceDependencies, RecordMessageRequest};
