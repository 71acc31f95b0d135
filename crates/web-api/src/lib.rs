//! Web API 层。
//!
//! 连接枢纽（Hub）、每连接 actor 对、线上协议，以及把 HTTP /
//! WebSocket 请求委托给应用层用例服务的 Axum 路由。

mod error;
mod hub;
mod protocol;
mod routes;
mod state;
mod ws_connection;

pub use error::ApiError;
pub use hub::{
    ConnectionHandle, ConnectionId, Hub, HubEvent, HubHandle, OUTBOUND_QUEUE_CAPACITY,
};
pub use protocol::{ClientFrame, MessagePayload, ServerFrame};
pub use routes::router;
pub use state::AppState;
