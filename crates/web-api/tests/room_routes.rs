//! HTTP 路由流程测试。

mod support;

use serde_json::{json, Value};
use uuid::Uuid;

use support::{build_router, spawn_server};

#[tokio::test]
async fn health_route_is_up() {
    let addr = spawn_server(build_router()).await;
    let status = reqwest::get(format!("http://{}/health", addr))
        .await
        .expect("health")
        .status();
    assert_eq!(status, 200);
}

#[tokio::test]
async fn room_resolution_is_idempotent_over_http() {
    let addr = spawn_server(build_router()).await;
    let client = reqwest::Client::new();
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();

    let first: Value = client
        .post(format!("http://{}/api/v1/rooms", addr))
        .json(&json!({"user_id": user_a, "peer_id": user_b}))
        .send()
        .await
        .expect("create")
        .json()
        .await
        .expect("json");

    // 第二次换参数顺序，仍然落在同一个房间
    let second: Value = client
        .post(format!("http://{}/api/v1/rooms", addr))
        .json(&json!({"user_id": user_b, "peer_id": user_a}))
        .send()
        .await
        .expect("create")
        .json()
        .await
        .expect("json");

    assert_eq!(first["chat_room_id"], second["chat_room_id"]);

    let user_ids = first["user_ids"].as_array().expect("user ids");
    assert_eq!(user_ids.len(), 2);
    assert!(user_ids.contains(&json!(user_a.to_string())));
    assert!(user_ids.contains(&json!(user_b.to_string())));
}

#[tokio::test]
async fn room_with_identical_users_is_rejected() {
    let addr = spawn_server(build_router()).await;
    let user = Uuid::new_v4();

    let response = reqwest::Client::new()
        .post(format!("http://{}/api/v1/rooms", addr))
        .json(&json!({"user_id": user, "peer_id": user}))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn history_route_returns_empty_list_for_fresh_room() {
    let addr = spawn_server(build_router()).await;
    let client = reqwest::Client::new();

    let room: Value = client
        .post(format!("http://{}/api/v1/rooms", addr))
        .json(&json!({"user_id": Uuid::new_v4(), "peer_id": Uuid::new_v4()}))
        .send()
        .await
        .expect("create")
        .json()
        .await
        .expect("json");
    let room_id = room["chat_room_id"].as_str().expect("room id");

    let history: Value = client
        .get(format!("http://{}/api/v1/rooms/{}/messages", addr, room_id))
        .send()
        .await
        .expect("history")
        .json()
        .await
        .expect("json");

    assert_eq!(history, json!([]));
}
