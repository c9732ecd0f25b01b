//! Axum request handlers for all service endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use codec::protocol::{self, EchoResponse, HealthResponse};
use codec::ServiceError;
use tracing::warn;

use super::extract::DecodedBody;
use super::state::AppState;
use super::wire::Wire;

/// `POST /echo` - decode the request body and send it back encrypted.
///
/// Lets client teams check that their encryption matches the server's. A body
/// that only decoded to a sentinel payload is answered with `400`.
pub async fn echo(State(state): State<AppState>, DecodedBody(payload): DecodedBody) -> Wire {
    if let Err(e) = protocol::require_fields(&payload, &[]) {
        if let Some((key, _)) = protocol::sentinel(&payload) {
            warn!(sentinel = key, "rejecting undecodable request body");
        }
        return state.error(&e);
    }
    state.respond(StatusCode::OK, &EchoResponse { received: payload })
}

/// `GET /health` - liveness and readiness check.
///
/// Returns `200 OK` when a payload secret is configured. Returns
/// `503 Service Unavailable` otherwise: the service still answers, but in
/// plaintext degraded mode. The body is never encrypted.
pub async fn health(State(state): State<AppState>) -> Response {
    let encryption_ready = state.encryption_ready();

    let (status_code, status_str) = if encryption_ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: status_str.into(),
        encryption_ready,
    };
    (status_code, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found(State(state): State<AppState>) -> Wire {
    state.error(&ServiceError::NotFound(
        "the requested resource does not exist".into(),
    ))
}
