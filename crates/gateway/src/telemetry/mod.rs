//! Structured logging and optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No passphrase, derived key, IV, or decrypted payload content** may
//!   appear in any span attribute or log field. Log lengths, strategy names,
//!   and error kinds instead.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`).

pub mod init;

pub use init::{init_telemetry, shutdown};
