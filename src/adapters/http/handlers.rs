//! HTTP handlers for health and REST-originated messages.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::adapters::websocket::handler::{parse_room_id, resolve_user_id};
use crate::adapters::websocket::{ErrorResponse, GatewayRejection, WebSocketState};
use crate::application::RelayError;
use crate::domain::chat::MessageEvent;

// ════════════════════════════════════════════════════════════════════════════════
// DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /api/rooms/:room_id/messages`.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: String,
    pub instance_id: String,
    pub exchange: String,
    pub connections: usize,
    pub rooms: usize,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// `GET /health`
pub async fn health(State(state): State<WebSocketState>) -> Json<HealthResponse> {
    let stats = state.relay.registry().stats().await;
    let bridge = state.relay.bridge();

    Json(HealthResponse {
        status: "ok".to_string(),
        instance_id: bridge.instance_id().to_string(),
        exchange: bridge.exchange().to_string(),
        connections: stats.connections,
        rooms: stats.rooms,
    })
}

/// `POST /api/rooms/:room_id/messages`
///
/// Identity comes from the `X-User-ID` header.
pub async fn post_message(
    State(state): State<WebSocketState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<MessageEvent>), Response> {
    let room_id = parse_room_id(Some(&room_id)).map_err(IntoResponse::into_response)?;
    let user_id = resolve_user_id(&headers, None).map_err(IntoResponse::into_response)?;

    let event = state
        .relay
        .post_message(user_id, room_id, &request.content)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok((StatusCode::CREATED, Json(event)))
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match self {
            RelayError::Access(denied) => GatewayRejection::from(denied).into_response(),
            RelayError::EmptyContent => {
                let body = ErrorResponse::new("EMPTY_CONTENT", self.to_string());
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            RelayError::ContentTooLarge { .. } => {
                let body = ErrorResponse::new("PAYLOAD_TOO_LARGE", self.to_string());
                (StatusCode::PAYLOAD_TOO_LARGE, Json(body)).into_response()
            }
            RelayError::Persist(ref e) => {
                tracing::error!(error = %e, "Message could not be stored");
                let body = ErrorResponse::new("STORAGE_UNAVAILABLE", "message could not be stored");
                (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
            }
        }
    }
}
