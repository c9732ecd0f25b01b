//! Request-side extractor: the whole body through the best-effort decoder.

use std::convert::Infallible;

use axum::{async_trait, extract::FromRequest, extract::Request};
use codec::protocol::{self, Payload, PARSE_ERROR_KEY};
use tracing::{debug, warn};

use super::state::AppState;

/// The request body decoded into a [`Payload`].
///
/// Extraction never fails. A body that cannot even be read (too large,
/// broken connection) becomes `{"_parse_error": ...}`; anything else goes
/// through [`codec::RequestDecoder`]. Handlers must check for sentinel keys
/// with [`protocol::sentinel`] or [`protocol::require_fields`].
#[derive(Debug)]
pub struct DecodedBody(pub Payload);

#[async_trait]
impl FromRequest<AppState> for DecodedBody {
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let bytes = match axum::body::to_bytes(req.into_body(), state.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, limit = state.max_body_bytes, "failed to read request body");
                return Ok(Self(protocol::single(PARSE_ERROR_KEY, e.to_string())));
            }
        };

        let decoded = state.decoder.decode_detailed(&bytes);
        debug!(
            strategy = %decoded.strategy,
            body_len = bytes.len(),
            keys = decoded.payload.len(),
            "request body decoded"
        );
        Ok(Self(decoded.payload))
    }
}
