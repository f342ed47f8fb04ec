//! Axum router for the chat fanout service.

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::adapters::websocket::{ws_handler, WebSocketState};

use super::handlers::{health, post_message};

/// Create the service router.
///
/// # Routes
///
/// - `GET /health` - Registry stats and instance id
/// - `GET /api/ws?room_id=<n>[&user_id=<n>]` - WebSocket upgrade
/// - `POST /api/rooms/:room_id/messages` - Post a message over HTTP
pub fn build_router(state: WebSocketState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/ws", get(ws_handler))
        .route("/api/rooms/:room_id/messages", post(post_message))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_origins)),
        )
}

/// Permissive when no origins are configured or `*` is listed.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
