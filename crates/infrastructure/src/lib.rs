//! 基础设施层。
//!
//! `ChatRepository` 的两个实现：Postgres（生产）与内存（测试、本地）。

pub mod memory;
pub mod repository;

pub use memory::InMemoryChatRepository;
pub use repository::{create_pg_pool, PgChatRepository};
