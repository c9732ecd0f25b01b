//! Subcommand implementations.

use anyhow::{anyhow, Context, Result};
use codec::{CodecError, RequestDecoder};
use tracing::{debug, info};

use crate::config::{Cli, Command};

/// Run the selected subcommand over `input` and return the bytes to print.
pub fn run(cli: &Cli, input: &[u8]) -> Result<Vec<u8>> {
    let codec = cli.codec();
    match &cli.command {
        Command::Encrypt { raw, .. } => {
            if !raw {
                serde_json::from_slice::<serde_json::Value>(input)
                    .context("input is not JSON (pass --raw to encrypt it anyway)")?;
            }
            let out = codec.encrypt(input).map_err(typed)?;
            info!(input_len = input.len(), output_len = out.len(), "encrypted");
            Ok(out)
        }
        Command::Decrypt { .. } => {
            let out = codec.decrypt(input).map_err(typed)?;
            info!(input_len = input.len(), output_len = out.len(), "decrypted");
            Ok(out)
        }
        Command::Decode { .. } => {
            let decoded = RequestDecoder::new(codec).decode_detailed(input);
            debug!(strategy = %decoded.strategy, "decoded");
            serde_json::to_vec_pretty(&decoded).context("failed to render decoded payload")
        }
    }
}

/// Prefix a codec error with its kind, e.g. `PaddingError: ...`.
fn typed(err: CodecError) -> anyhow::Error {
    anyhow!("{}: {err}", err.kind())
}
