//! WebSocket 连接 actor 对。
//!
//! 一条物理连接对应两个并发循环：读循环解码入站帧并驱动用例
//! 服务，写循环排空出站队列写回 socket。两个循环同起同灭：
//! 读侧退出时无条件向枢纽注销，注销信号再终止写侧。

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

use application::RecordMessageRequest;
use domain::{RoomId, Timestamp, UserId};
use tokio::sync::{mpsc, Notify};

use crate::hub::{ConnectionHandle, ConnectionId};
use crate::protocol::{ClientFrame, ServerFrame};
use crate::state::AppState;

/// 握手时绑定的会话三元组，缺一不可。
#[derive(Debug, Clone, Copy)]
pub struct SessionParams {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub receiver_id: UserId,
}

pub struct WebSocketConnection {
    socket: WebSocket,
    state: AppState,
    params: SessionParams,
}

impl WebSocketConnection {
    pub fn new(socket: WebSocket, state: AppState, params: SessionParams) -> Self {
        Self {
            socket,
            state,
            params,
        }
    }

    pub async fn run(self) {
        let Self {
            socket,
            state,
            params,
        } = self;

        let (sink, stream) = socket.split();
        let (handle, outbound_rx) =
            ConnectionHandle::new(ConnectionId::generate(), params.room_id, params.user_id);
        let shutdown = handle.shutdown_signal();

        state.hub.register(handle.clone());
        tracing::info!(
            connection_id = %handle.id,
            user_id = %params.user_id,
            room_id = %params.room_id,
            "WebSocket 连接已建立"
        );

        let mut write_task = tokio::spawn(write_loop(sink, outbound_rx, shutdown));

        // 任意一侧先停都拆掉整对，退出时无条件注销；
        // 对已移除连接的重复注销在枢纽侧是空操作。
        tokio::select! {
            // 写循环先停：强制断开或写失败
            _ = &mut write_task => {
                state.hub.unregister(handle.id);
            }
            // 读循环先停：读失败或对端关闭
            _ = read_loop(stream, &state, &params, &handle) => {
                state.hub.unregister(handle.id);
                // 注销触发断开信号，等写循环收尾
                let _ = write_task.await;
            }
        }

        tracing::info!(
            connection_id = %handle.id,
            user_id = %params.user_id,
            "WebSocket 连接已断开"
        );
    }
}

/// 读循环：按到达顺序处理入站帧，读失败即退出。
async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    state: &AppState,
    params: &SessionParams,
    handle: &ConnectionHandle,
) {
    let mut last_sent_at: Option<Timestamp> = None;

    while let Some(next) = stream.next().await {
        let message = match next {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(
                    connection_id = %handle.id,
                    error = %err,
                    "WebSocket receive error"
                );
                break;
            }
        };

        match message {
            WsMessage::Text(text) => {
                handle_frame(text.as_str(), state, params, handle, &mut last_sent_at).await;
            }
            WsMessage::Binary(_) => {
                tracing::debug!(connection_id = %handle.id, "binary frame ignored");
            }
            WsMessage::Close(frame) => {
                tracing::info!(
                    connection_id = %handle.id,
                    reason = ?frame,
                    "client initiated close"
                );
                break;
            }
            // ping/pong 由底层协议栈应答
            WsMessage::Ping(_) | WsMessage::Pong(_) => {}
        }
    }
}

/// 处理一条入站帧。协议错误只丢帧不断连接。
async fn handle_frame(
    text: &str,
    state: &AppState,
    params: &SessionParams,
    handle: &ConnectionHandle,
    last_sent_at: &mut Option<Timestamp>,
) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(err) => {
            tracing::warn!(
                connection_id = %handle.id,
                error = %err,
                "malformed inbound frame dropped"
            );
            return;
        }
    };

    match frame {
        ClientFrame::SendMessage { message_text } => {
            let sent_at = next_sent_at(state.clock.now(), last_sent_at);
            let request = RecordMessageRequest {
                room_id: params.room_id,
                sender_id: params.user_id,
                receiver_id: params.receiver_id,
                message_text,
                sent_at,
            };

            match state.chat_service.record_message(request).await {
                // 只有落库成功的消息才进入广播
                Ok(message) => state
                    .hub
                    .broadcast(params.room_id, ServerFrame::message(&message)),
                Err(err) => {
                    tracing::error!(
                        connection_id = %handle.id,
                        error = %err,
                        "message not persisted, broadcast suppressed"
                    );
                }
            }
        }
        ClientFrame::GetMessages {
            room_id,
            limit,
            offset,
        } => {
            let reply = match state
                .chat_service
                .history(RoomId::from(room_id), limit, offset)
                .await
            {
                Ok(messages) => ServerFrame::history(&messages),
                Err(err) => {
                    tracing::error!(
                        connection_id = %handle.id,
                        error = %err,
                        "history fetch failed"
                    );
                    ServerFrame::error("FETCH_FAILED", "failed to fetch messages")
                }
            };

            // 单播回自己的出站队列，和枢纽一样不越过非阻塞入队
            if handle.try_enqueue(reply).is_err() {
                tracing::warn!(
                    connection_id = %handle.id,
                    "outbound queue full, history reply dropped"
                );
            }
        }
    }
}

/// 发送时间戳，同一发送者内严格递增：时钟不前进时在上一次
/// 之上加一微秒。
fn next_sent_at(now: Timestamp, last: &mut Option<Timestamp>) -> Timestamp {
    let sent_at = match *last {
        Some(prev) if now <= prev => prev + chrono::Duration::microseconds(1),
        _ => now,
    };
    *last = Some(sent_at);
    sent_at
}

/// 写循环：排空出站队列。一次唤醒里排进来的帧合并为一次 flush，
/// 断开信号或写失败即终止。
async fn write_loop(
    mut sink: SplitSink<WebSocket, WsMessage>,
    mut outbound: mpsc::Receiver<ServerFrame>,
    shutdown: Arc<Notify>,
) {
    'outer: loop {
        tokio::select! {
            maybe = outbound.recv() => {
                let Some(first) = maybe else { break };
                if feed_frame(&mut sink, first).await.is_err() {
                    break 'outer;
                }
                while let Ok(frame) = outbound.try_recv() {
                    if feed_frame(&mut sink, frame).await.is_err() {
                        break 'outer;
                    }
                }
                if sink.flush().await.is_err() {
                    break;
                }
            }
            _ = shutdown.notified() => break,
        }
    }

    // 队列里未写出的帧随连接一起丢弃
    let _ = sink.close().await;
}

async fn feed_frame(
    sink: &mut SplitSink<WebSocket, WsMessage>,
    frame: ServerFrame,
) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(&frame) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, "failed to serialize outbound frame");
            return Ok(());
        }
    };
    sink.feed(WsMessage::Text(text.into())).await
}
