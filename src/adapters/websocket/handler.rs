//! WebSocket upgrade handler for chat room connections.
//!
//! Handles the HTTP → WebSocket upgrade and the connection lifecycle:
//! 1. Validate the room id and resolve the caller's identity
//! 2. Authorize the user for the room
//! 3. Upgrade to WebSocket
//! 4. Register, join the room, announce presence
//! 5. Run the pumps until disconnect

use std::sync::Arc;

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::Deserialize;

use crate::application::relay::ChatRelay;
use crate::domain::foundation::{RoomId, UserId};
use crate::ports::AccessDenied;

use super::connection::{Connection, ConnectionIdentity};
use super::messages::ErrorResponse;
use super::pumps::{run_connection, ConnectionSession, PumpSettings};
use super::registry::JoinOutcome;

/// Header carrying the authenticated user id, set by the upstream auth layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Per-connection limits applied at upgrade time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewaySettings {
    pub outbox_capacity: usize,
    pub pumps: PumpSettings,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            outbox_capacity: 256,
            pumps: PumpSettings::default(),
        }
    }
}

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub relay: Arc<ChatRelay>,
    pub settings: GatewaySettings,
}

impl WebSocketState {
    pub fn new(relay: Arc<ChatRelay>, settings: GatewaySettings) -> Self {
        Self { relay, settings }
    }
}

/// Query string of `GET /api/ws`.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub room_id: Option<String>,
    pub user_id: Option<String>,
}

/// Why an upgrade request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GatewayRejection {
    #[error("bad room id")]
    BadRoomId,

    #[error("unauthorized")]
    Unauthorized,

    #[error("room not found")]
    RoomNotFound,

    #[error("websocket upgrade required")]
    UpgradeRequired,
}

impl GatewayRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayRejection::BadRoomId => StatusCode::BAD_REQUEST,
            GatewayRejection::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayRejection::RoomNotFound => StatusCode::NOT_FOUND,
            GatewayRejection::UpgradeRequired => StatusCode::UPGRADE_REQUIRED,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayRejection::BadRoomId => "BAD_ROOM_ID",
            GatewayRejection::Unauthorized => "UNAUTHORIZED",
            GatewayRejection::RoomNotFound => "ROOM_NOT_FOUND",
            GatewayRejection::UpgradeRequired => "UPGRADE_REQUIRED",
        }
    }
}

impl From<AccessDenied> for GatewayRejection {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::Unauthorized => GatewayRejection::Unauthorized,
            AccessDenied::RoomNotFound => GatewayRejection::RoomNotFound,
        }
    }
}

impl IntoResponse for GatewayRejection {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(self.code(), self.to_string());
        (self.status(), Json(body)).into_response()
    }
}

/// Parses a room id. Missing, non-numeric and zero ids are all bad.
pub fn parse_room_id(raw: Option<&str>) -> Result<RoomId, GatewayRejection> {
    raw.and_then(|s| s.trim().parse().ok())
        .ok_or(GatewayRejection::BadRoomId)
}

/// Resolves the caller. The header wins over the query parameter.
pub fn resolve_user_id(
    headers: &HeaderMap,
    query: Option<&str>,
) -> Result<UserId, GatewayRejection> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .or(query)
        .and_then(|s| s.trim().parse().ok())
        .ok_or(GatewayRejection::Unauthorized)
}

/// Handle WebSocket upgrade requests for a chat room.
///
/// Route: `GET /api/ws?room_id=<n>[&user_id=<n>]`
///
/// Every check runs before the upgrade, so a refused client gets a plain
/// HTTP error instead of a socket that closes at once.
pub async fn ws_handler(
    ws: Option<WebSocketUpgrade>,
    headers: HeaderMap,
    Query(params): Query<ConnectParams>,
    State(state): State<WebSocketState>,
) -> Result<Response, GatewayRejection> {
    let room_id = parse_room_id(params.room_id.as_deref())?;
    let user_id = resolve_user_id(&headers, params.user_id.as_deref())?;

    let username = state.relay.authorize(user_id, room_id).await.map_err(|denied| {
        tracing::info!(user_id = %user_id, room_id = %room_id, reason = %denied, "Upgrade refused");
        GatewayRejection::from(denied)
    })?;

    let ws = ws.ok_or(GatewayRejection::UpgradeRequired)?;
    let identity = ConnectionIdentity::new(user_id, username);
    let max_message_size = state.settings.pumps.max_message_size;

    Ok(ws
        .max_message_size(max_message_size)
        .max_frame_size(max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, identity, room_id, state)))
}

/// Runs one upgraded connection to completion.
async fn handle_socket(
    socket: WebSocket,
    identity: ConnectionIdentity,
    room_id: RoomId,
    state: WebSocketState,
) {
    let relay = state.relay;
    let (connection, outbox) = Connection::new(identity.clone(), state.settings.outbox_capacity);
    let lifecycle = connection.lifecycle().clone();

    let id = relay.registry().register(connection).await;
    if let JoinOutcome::Replaced { evicted } = relay.registry().join(id, room_id).await {
        tracing::info!(
            connection_id = %id,
            evicted = %evicted,
            "Replaced earlier connection for the same user and room"
        );
    }

    tracing::info!(
        connection_id = %id,
        user_id = %identity.user_id,
        room_id = %room_id,
        "WebSocket connected"
    );
    relay.announce_connected(&identity, room_id).await;

    let (sink, stream) = socket.split();
    let session = ConnectionSession {
        id,
        identity,
        room_id,
        lifecycle,
    };
    run_connection(sink, stream, outbox, session, relay, state.settings.pumps).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn room_id_must_be_positive_integer() {
        assert!(parse_room_id(Some("5")).is_ok());
        assert_eq!(parse_room_id(None), Err(GatewayRejection::BadRoomId));
        assert_eq!(parse_room_id(Some("abc")), Err(GatewayRejection::BadRoomId));
        assert_eq!(parse_room_id(Some("0")), Err(GatewayRejection::BadRoomId));
        assert_eq!(parse_room_id(Some("-3")), Err(GatewayRejection::BadRoomId));
    }

    #[test]
    fn header_identity_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("9"));

        let user = resolve_user_id(&headers, Some("4")).unwrap();
        assert_eq!(user.value(), 9);
    }

    #[test]
    fn query_identity_is_fallback() {
        let user = resolve_user_id(&HeaderMap::new(), Some("4")).unwrap();
        assert_eq!(user.value(), 4);
    }

    #[test]
    fn missing_or_invalid_identity_is_unauthorized() {
        assert_eq!(
            resolve_user_id(&HeaderMap::new(), None),
            Err(GatewayRejection::Unauthorized)
        );
        assert_eq!(
            resolve_user_id(&HeaderMap::new(), Some("zero")),
            Err(GatewayRejection::Unauthorized)
        );
    }

    #[test]
    fn rejections_map_to_status_codes() {
        assert_eq!(GatewayRejection::BadRoomId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(GatewayRejection::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(GatewayRejection::RoomNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            GatewayRejection::UpgradeRequired.status(),
            StatusCode::UPGRADE_REQUIRED
        );
    }

    #[test]
    fn access_denials_convert() {
        assert_eq!(
            GatewayRejection::from(AccessDenied::RoomNotFound),
            GatewayRejection::RoomNotFound
        );
        assert_eq!(
            GatewayRejection::from(AccessDenied::Unauthorized),
            GatewayRejection::Unauthorized
        );
    }
}
