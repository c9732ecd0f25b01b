//! Response-side adapter from [`Rendered`] bodies to Axum responses.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use codec::Rendered;
use tracing::debug;

/// A status code and a body produced by [`codec::ResponseWriter`].
///
/// Every variant is labelled `application/json`: encryption is applied to
/// the payload, not to the transport, and clients decide by body shape.
#[derive(Debug)]
pub struct Wire(pub StatusCode, pub Rendered);

impl IntoResponse for Wire {
    fn into_response(self) -> Response {
        let Wire(status, rendered) = self;
        debug!(status = status.as_u16(), mode = rendered.mode(), "response rendered");
        (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            rendered.into_body(),
        )
            .into_response()
    }
}
