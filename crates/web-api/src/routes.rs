use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::{MessageDto, RoomDto};
use domain::{RoomId, UserId};

use crate::error::ApiError;
use crate::state::AppState;
use crate::ws_connection::{SessionParams, WebSocketConnection};

#[derive(Debug, Deserialize)]
struct CreateRoomPayload {
    user_id: Uuid,
    peer_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<u32>,
    offset: Option<u32>,
}

/// 握手查询参数；三个标识都必填，先收成字符串再逐个校验，
/// 缺失或非法都以终止性的 400 拒绝，不进入升级。
#[derive(Debug, Deserialize)]
struct WsQuery {
    #[serde(rename = "roomID")]
    room_id: Option<String>,
    #[serde(rename = "userID")]
    user_id: Option<String>,
    #[serde(rename = "receiverID")]
    receiver_id: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/rooms", post(get_or_create_room))
        .route("/rooms/{room_id}/messages", get(get_history))
        .route("/ws", get(websocket_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn get_or_create_room(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoomPayload>,
) -> Result<Json<RoomDto>, ApiError> {
    let room = state
        .room_resolver
        .resolve(UserId::from(payload.user_id), UserId::from(payload.peer_id))
        .await?;

    Ok(Json(RoomDto::from(&room)))
}

async fn get_history(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let messages = state
        .chat_service
        .history(
            RoomId::from(room_id),
            query.limit.unwrap_or(50),
            query.offset.unwrap_or(0),
        )
        .await?;

    Ok(Json(messages.iter().map(MessageDto::from).collect()))
}

async fn websocket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let params = session_params(query)?;

    Ok(ws.on_upgrade(move |socket| WebSocketConnection::new(socket, state, params).run()))
}

fn session_params(query: WsQuery) -> Result<SessionParams, ApiError> {
    let room_id = require_uuid("roomID", query.room_id)?;
    let user_id = require_uuid("userID", query.user_id)?;
    let receiver_id = require_uuid("receiverID", query.receiver_id)?;

    Ok(SessionParams {
        room_id: RoomId::from(room_id),
        user_id: UserId::from(user_id),
        receiver_id: UserId::from(receiver_id),
    })
}

fn require_uuid(name: &'static str, value: Option<String>) -> Result<Uuid, ApiError> {
    let value = value
        .ok_or_else(|| ApiError::bad_request(format!("{} query parameter is required", name)))?;
    Uuid::parse_str(&value)
        .map_err(|_| ApiError::bad_request(format!("{} must be a valid UUID", name)))
}
