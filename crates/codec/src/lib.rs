//! Payload codec, transport boundary, and wire types shared by the
//! registration gateway and `payload-tool`.

pub mod crypto;
pub mod error;
pub mod protocol;
pub mod secret;
pub mod transport;

pub use error::{CodecError, ServiceError};
pub use protocol::Payload;
pub use secret::{PayloadCodec, PayloadSecret};
pub use transport::{Decoded, Rendered, RequestDecoder, ResponseWriter, Strategy};
