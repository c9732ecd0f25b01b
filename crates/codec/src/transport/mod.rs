//! The HTTP-body boundary: what comes in is decoded, what goes out is encrypted.
//!
//! Both halves are total. [`RequestDecoder`] always returns a payload and
//! [`ResponseWriter`] always returns a body; codec failures become fallbacks
//! or sentinel payloads instead of errors.

pub mod decoder;
pub mod writer;

pub use decoder::{Decoded, RequestDecoder, Strategy};
pub use writer::{Rendered, ResponseWriter, RENDER_ERROR_BODY};
