//! Command-line configuration for `payload-tool`.
//!
//! ```bash
//! echo '{"username":"aman1808"}' | payload-tool --secret s3cr3t encrypt
//! PAYLOAD_SECRET=s3cr3t payload-tool decrypt body.txt
//! payload-tool decode captured-request.txt
//! ```

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codec::{PayloadCodec, PayloadSecret};

/// Encrypt, decrypt, and decode gateway payloads.
#[derive(Clone, Parser)]
#[command(name = "payload-tool")]
#[command(about = "Encrypt, decrypt, and decode gateway payloads")]
#[command(version)]
pub struct Cli {
    /// Shared payload passphrase.
    #[arg(long, env = "PAYLOAD_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Log level for diagnostics written to stderr.
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

impl std::fmt::Debug for Cli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cli")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("log_level", &self.log_level)
            .field("command", &self.command)
            .finish()
    }
}

impl Cli {
    /// A codec bound to `--secret`, which may be absent.
    pub fn codec(&self) -> PayloadCodec {
        PayloadCodec::new(self.secret.as_deref().and_then(PayloadSecret::new))
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Encrypt the input into a base64 `Salted__` container.
    Encrypt {
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,
        /// Accept input that is not JSON.
        #[arg(long)]
        raw: bool,
    },
    /// Strictly decrypt a base64 container and print the plaintext.
    Decrypt {
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Run a request body through the gateway's best-effort decoder.
    Decode {
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,
    },
}

impl Command {
    fn file(&self) -> Option<&PathBuf> {
        match self {
            Command::Encrypt { file, .. } | Command::Decrypt { file } | Command::Decode { file } => {
                file.as_ref()
            }
        }
    }

    /// Read the command's input from its file argument or stdin.
    pub fn read_input(&self) -> Result<Vec<u8>> {
        match self.file() {
            Some(path) => std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display())),
            None => {
                let mut buf = Vec::new();
                std::io::stdin()
                    .read_to_end(&mut buf)
                    .context("failed to read stdin")?;
                Ok(buf)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_encrypt_with_raw_flag() {
        let cli = Cli::try_parse_from(["payload-tool", "--secret", "s", "encrypt", "--raw", "in.txt"])
            .unwrap();
        match cli.command.clone() {
            Command::Encrypt { file, raw } => {
                assert!(raw);
                assert_eq!(file, Some(PathBuf::from("in.txt")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(cli.codec().is_ready());
    }

    #[test]
    fn blank_secret_leaves_codec_unready() {
        let cli = Cli::try_parse_from(["payload-tool", "--secret", " ", "decode"]).unwrap();
        assert!(!cli.codec().is_ready());
    }

    #[test]
    fn debug_redacts_secret() {
        let cli = Cli::try_parse_from(["payload-tool", "--secret", "hunter2", "decode"]).unwrap();
        let printed = format!("{cli:?}");
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["payload-tool"]).is_err());
    }
}
