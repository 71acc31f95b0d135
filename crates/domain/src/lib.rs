//! 聊天传输系统核心领域模型
//!
//! 包含消息、双人房间等核心实体，以及持久化协作方的接口契约。

pub mod errors;
pub mod message;
pub mod repository;
pub mod room;
pub mod value_objects;

// 重新导出常用类型
pub use errors::*;
pub use message::*;
pub use repository::*;
pub use room::*;
pub use value_objects::*;
