//! WebSocket 端到端流程测试。

mod support;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::Message as TungsteniteMessage, MaybeTlsStream, WebSocketStream,
};
use uuid::Uuid;

use support::{build_router, build_router_with, spawn_server, FailingSaveRepository};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn create_room(addr: SocketAddr, user_a: Uuid, user_b: Uuid) -> String {
    let room: Value = reqwest::Client::new()
        .post(format!("http://{}/api/v1/rooms", addr))
        .json(&json!({"user_id": user_a, "peer_id": user_b}))
        .send()
        .await
        .expect("create room")
        .json()
        .await
        .expect("room json");
    room["chat_room_id"].as_str().expect("room id").to_owned()
}

async fn connect_ws(addr: SocketAddr, room_id: &str, user_id: Uuid, receiver_id: Uuid) -> WsClient {
    let url = format!(
        "ws://{}/api/v1/ws?roomID={}&userID={}&receiverID={}",
        addr, room_id, user_id, receiver_id
    );
    let (socket, _) = connect_async(url).await.expect("ws connect");
    socket
}

async fn send_frame(socket: &mut WsClient, payload: Value) {
    socket
        .send(TungsteniteMessage::Text(payload.to_string().into()))
        .await
        .expect("send frame");
}

async fn next_json(socket: &mut WsClient) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("frame within deadline")
            .expect("stream open")
            .expect("frame");
        if let TungsteniteMessage::Text(text) = frame {
            return serde_json::from_str(text.as_str()).expect("json frame");
        }
    }
}

async fn assert_silent(socket: &mut WsClient, wait: Duration) {
    let result = timeout(wait, socket.next()).await;
    assert!(result.is_err(), "expected no frame, got {:?}", result);
}

#[tokio::test]
async fn broadcast_reaches_both_participants_and_lands_in_history() {
    let addr = spawn_server(build_router()).await;
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();
    let room_id = create_room(addr, user_a, user_b).await;

    let mut a = connect_ws(addr, &room_id, user_a, user_b).await;
    let mut b = connect_ws(addr, &room_id, user_b, user_a).await;
    // 等注册事件被协调循环处理
    sleep(Duration::from_millis(100)).await;

    send_frame(
        &mut a,
        json!({"action": "send_message", "message_text": "hi"}),
    )
    .await;

    for socket in [&mut a, &mut b] {
        let frame = next_json(socket).await;
        assert_eq!(frame["action"], "messages");
        assert_eq!(frame["data"]["message_text"], "hi");
        assert_eq!(frame["data"]["sender_id"], user_a.to_string());
        assert_eq!(frame["data"]["chat_room_id"], room_id);
    }

    send_frame(
        &mut b,
        json!({"action": "get_messages", "room_id": room_id, "limit": 10, "offset": 0}),
    )
    .await;
    let history = next_json(&mut b).await;
    assert_eq!(history["action"], "messages");
    let data = history["data"].as_array().expect("history list");
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["message_text"], "hi");
}

#[tokio::test]
async fn history_is_newest_first() {
    let addr = spawn_server(build_router()).await;
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();
    let room_id = create_room(addr, user_a, user_b).await;

    let mut a = connect_ws(addr, &room_id, user_a, user_b).await;
    sleep(Duration::from_millis(100)).await;

    for text in ["first", "second", "third"] {
        send_frame(
            &mut a,
            json!({"action": "send_message", "message_text": text}),
        )
        .await;
        // 自己也会收到广播
        let _ = next_json(&mut a).await;
    }

    send_frame(
        &mut a,
        json!({"action": "get_messages", "room_id": room_id, "limit": 2, "offset": 0}),
    )
    .await;
    let history = next_json(&mut a).await;
    let data = history["data"].as_array().expect("history list");
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["message_text"], "third");
    assert_eq!(data[1]["message_text"], "second");
}

#[tokio::test]
async fn empty_history_is_an_explicit_empty_list() {
    let addr = spawn_server(build_router()).await;
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();
    let room_id = create_room(addr, user_a, user_b).await;

    let mut a = connect_ws(addr, &room_id, user_a, user_b).await;
    send_frame(
        &mut a,
        json!({"action": "get_messages", "room_id": room_id, "limit": 10, "offset": 0}),
    )
    .await;

    let history = next_json(&mut a).await;
    assert_eq!(history["action"], "messages");
    assert_eq!(history["data"], json!([]));
}

#[tokio::test]
async fn malformed_frame_is_dropped_and_connection_survives() {
    let addr = spawn_server(build_router()).await;
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();
    let room_id = create_room(addr, user_a, user_b).await;

    let mut a = connect_ws(addr, &room_id, user_a, user_b).await;

    send_frame(&mut a, json!({"action": "send_message"})).await; // 缺字段
    send_frame(&mut a, json!({"whatever": true})).await; // 没有 action
    socket_garbage(&mut a).await; // 非 JSON

    // 连接还活着，后续帧照常处理
    send_frame(
        &mut a,
        json!({"action": "get_messages", "room_id": room_id, "limit": 10, "offset": 0}),
    )
    .await;
    let history = next_json(&mut a).await;
    assert_eq!(history["action"], "messages");
}

async fn socket_garbage(socket: &mut WsClient) {
    socket
        .send(TungsteniteMessage::Text("not json at all".into()))
        .await
        .expect("send garbage");
}

#[tokio::test]
async fn failed_save_suppresses_broadcast_for_everyone_but_keeps_connection() {
    let addr = spawn_server(build_router_with(Arc::new(
        FailingSaveRepository::default(),
    )))
    .await;
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();
    let room_id = create_room(addr, user_a, user_b).await;

    let mut a = connect_ws(addr, &room_id, user_a, user_b).await;
    let mut b = connect_ws(addr, &room_id, user_b, user_a).await;
    sleep(Duration::from_millis(100)).await;

    send_frame(
        &mut a,
        json!({"action": "send_message", "message_text": "lost"}),
    )
    .await;

    // 谁都收不到广播，发送者也一样
    assert_silent(&mut a, Duration::from_millis(300)).await;
    assert_silent(&mut b, Duration::from_millis(300)).await;

    // 连接保持可用
    send_frame(
        &mut a,
        json!({"action": "get_messages", "room_id": room_id, "limit": 10, "offset": 0}),
    )
    .await;
    let history = next_json(&mut a).await;
    assert_eq!(history["data"], json!([]));
}

#[tokio::test]
async fn handshake_missing_parameter_is_rejected() {
    let addr = spawn_server(build_router()).await;

    let url = format!(
        "ws://{}/api/v1/ws?roomID={}&userID={}",
        addr,
        Uuid::new_v4(),
        Uuid::new_v4()
    );

    match connect_async(url).await {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 400);
        }
        other => panic!("expected http 400 rejection, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn handshake_rejects_non_uuid_identifiers() {
    let addr = spawn_server(build_router()).await;

    let url = format!(
        "ws://{}/api/v1/ws?roomID=not-a-uuid&userID={}&receiverID={}",
        addr,
        Uuid::new_v4(),
        Uuid::new_v4()
    );

    assert!(connect_async(url).await.is_err());
}
