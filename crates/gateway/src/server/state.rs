//! Shared application state injected into every Axum handler.

use axum::http::StatusCode;
use codec::protocol::ErrorResponse;
use codec::{PayloadCodec, RequestDecoder, ResponseWriter, ServiceError};
use serde::Serialize;

use super::wire::Wire;

/// Default largest request body read before decoding.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable: the codec shares its secret behind an
/// `Arc`, so Axum can clone the state per request without copying it.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Inbound half of the transport boundary.
    pub decoder: RequestDecoder,
    /// Outbound half of the transport boundary.
    pub writer: ResponseWriter,
    /// Largest request body read before decoding.
    pub max_body_bytes: usize,
    encryption_ready: bool,
}

impl AppState {
    /// Build the decoder and writer around one codec.
    pub fn new(codec: PayloadCodec, max_body_bytes: usize) -> Self {
        Self {
            encryption_ready: codec.is_ready(),
            decoder: RequestDecoder::new(codec.clone()),
            writer: ResponseWriter::new(codec),
            max_body_bytes,
        }
    }

    /// Whether responses are being encrypted.
    pub fn encryption_ready(&self) -> bool {
        self.encryption_ready
    }

    /// Render `body` through the writer.
    pub fn respond<T: Serialize + ?Sized>(&self, status: StatusCode, body: &T) -> Wire {
        Wire(status, self.writer.render(body))
    }

    /// Render `err` as an [`ErrorResponse`] through the writer.
    pub fn error(&self, err: &ServiceError) -> Wire {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.respond(status, &ErrorResponse::from(err))
    }
}

impl Default for AppState {
    /// State without a payload secret, suitable for tests.
    fn default() -> Self {
        Self::new(PayloadCodec::default(), DEFAULT_MAX_BODY_BYTES)
    }
}
