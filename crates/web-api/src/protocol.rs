//! WebSocket 线上协议。
//!
//! 入站与出站帧都以 `action` 字段区分操作；房间、发送者、接收者
//! 在握手时绑定，send_message 帧里不再携带。

use application::MessageDto;
use domain::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 客户端入站帧。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientFrame {
    SendMessage {
        message_text: String,
    },
    GetMessages {
        room_id: Uuid,
        limit: u32,
        offset: u32,
    },
}

/// 服务端出站帧。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerFrame {
    Messages { data: MessagePayload },
    Error { code: String, message: String },
}

/// messages 帧的载荷：广播是单条消息，历史回复是一个序列。
/// 空历史是显式的空序列，不是错误。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessagePayload {
    One(MessageDto),
    Many(Vec<MessageDto>),
}

impl ServerFrame {
    pub fn message(message: &Message) -> Self {
        Self::Messages {
            data: MessagePayload::One(MessageDto::from(message)),
        }
    }

    pub fn history(messages: &[Message]) -> Self {
        Self::Messages {
            data: MessagePayload::Many(messages.iter().map(MessageDto::from).collect()),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}
