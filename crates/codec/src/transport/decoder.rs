//! Best-effort request decoder.
//!
//! Clients send one of three body generations: legacy plaintext JSON, base64
//! `Salted__` containers, and malformed bodies from the migration between the
//! two. [`RequestDecoder`] recovers a [`Payload`] from any of them and never
//! fails; unrecoverable input becomes a payload carrying a sentinel key (see
//! [`crate::protocol`]).
//!
//! Order of attempts:
//!
//! ```text
//! empty body ─────────────────────────────────────────────▶ {}
//! leading '{' ─▶ JSON
//! not a container ─▶ JSON ─▶ brace scan ─────────────────▶ {"_error": ..}
//! container, no secret ──────────────────────────────────▶ {"_error": ..}
//! container ─▶ decrypt ─▶ JSON ─▶ brace scan ────────────▶ {"message": ..}
//!                 │
//!                 └ fails ─▶ repad+decrypt ─▶ JSON ─▶ brace scan ─▶ form
//!                                                          ─────▶ {"_raw_data": ..}
//! ```

use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::crypto::container::container_shape;
use crate::protocol::{self, Payload, ERROR_KEY, RAW_DATA_KEY};
use crate::secret::PayloadCodec;

/// Characters of the input kept in `message` / `_raw_data` fallbacks.
const PREVIEW_CHARS: usize = 100;

/// Which strategy produced a [`Decoded`] payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Zero-length body.
    Empty,
    /// Body was plaintext JSON starting with `{`.
    PlainJson,
    /// Body decrypted; the plaintext was JSON, brace-scanned or wrapped.
    Decrypted,
    /// Body decrypted after appending missing base64 padding.
    RepairedPadding,
    /// The whole body parsed as JSON on a second attempt.
    WholeJson,
    /// The first `{...}` without nested braces parsed as JSON.
    BraceScan,
    /// Body split as `key=value&key=value`.
    FormFields,
    /// Nothing worked; the payload carries a sentinel key.
    Sentinel,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strategy::Empty => "empty",
            Strategy::PlainJson => "plain_json",
            Strategy::Decrypted => "decrypted",
            Strategy::RepairedPadding => "repaired_padding",
            Strategy::WholeJson => "whole_json",
            Strategy::BraceScan => "brace_scan",
            Strategy::FormFields => "form_fields",
            Strategy::Sentinel => "sentinel",
        };
        f.write_str(s)
    }
}

/// A decoded payload together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decoded {
    pub strategy: Strategy,
    pub payload: Payload,
}

impl Decoded {
    fn new(strategy: Strategy, payload: Payload) -> Self {
        Self { strategy, payload }
    }

    fn sentinel(key: &str, value: String) -> Self {
        Self::new(Strategy::Sentinel, protocol::single(key, value))
    }
}

/// Why a stage produced nothing.
#[derive(Debug)]
enum Miss {
    /// The stage does not apply to this input.
    Skipped(&'static str),
    /// The stage applied but failed.
    Failed(String),
}

impl fmt::Display for Miss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Miss::Skipped(why) => write!(f, "skipped: {why}"),
            Miss::Failed(why) => write!(f, "failed: {why}"),
        }
    }
}

/// One fallback step of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    LeadingBrace,
    RepairPadding,
    WholeJson,
    BraceScan,
    FormFields,
}

impl Stage {
    fn strategy(self) -> Strategy {
        match self {
            Stage::LeadingBrace => Strategy::PlainJson,
            Stage::RepairPadding => Strategy::RepairedPadding,
            Stage::WholeJson => Strategy::WholeJson,
            Stage::BraceScan => Strategy::BraceScan,
            Stage::FormFields => Strategy::FormFields,
        }
    }
}

/// Tried before looking for a container.
const PLAINTEXT_FIRST: &[Stage] = &[Stage::LeadingBrace];

/// Tried when the body is not base64 for a `Salted__` container.
const NOT_A_CONTAINER: &[Stage] = &[Stage::WholeJson, Stage::BraceScan];

/// Tried when the body is container-shaped but does not decrypt.
const UNDECRYPTABLE: &[Stage] = &[
    Stage::RepairPadding,
    Stage::WholeJson,
    Stage::BraceScan,
    Stage::FormFields,
];

/// The raw body and its lossy UTF-8 text view.
struct RawBody<'a> {
    bytes: &'a [u8],
    text: Cow<'a, str>,
}

impl<'a> RawBody<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            text: String::from_utf8_lossy(bytes),
        }
    }
}

/// Recovers a [`Payload`] from any request body.
#[derive(Clone, Debug, Default)]
pub struct RequestDecoder {
    codec: PayloadCodec,
}

impl RequestDecoder {
    pub fn new(codec: PayloadCodec) -> Self {
        Self { codec }
    }

    /// Decode `raw` into a payload. Never fails.
    pub fn decode(&self, raw: &[u8]) -> Payload {
        self.decode_detailed(raw).payload
    }

    /// Decode `raw` and report which strategy succeeded.
    pub fn decode_detailed(&self, raw: &[u8]) -> Decoded {
        if raw.is_empty() {
            return Decoded::new(Strategy::Empty, Payload::new());
        }
        let body = RawBody::new(raw);

        if let Some(decoded) = self.run(PLAINTEXT_FIRST, &body) {
            return decoded;
        }

        if let Err(e) = container_shape(raw) {
            debug!(reason = %e, "body is not a Salted__ container");
            return self.run(NOT_A_CONTAINER, &body).unwrap_or_else(|| {
                warn!(kind = e.kind(), body_len = raw.len(), "request body is neither JSON nor a container");
                Decoded::sentinel(ERROR_KEY, e.to_string())
            });
        }

        if let Err(e) = self.codec.ensure_ready() {
            warn!(kind = e.kind(), "encrypted request body but no payload secret configured");
            return Decoded::sentinel(ERROR_KEY, e.to_string());
        }

        match self.codec.decrypt(raw) {
            Ok(plaintext) => {
                debug!(plaintext_len = plaintext.len(), "request body decrypted");
                Decoded::new(Strategy::Decrypted, payload_from_plaintext(&plaintext))
            }
            Err(e) => {
                debug!(kind = e.kind(), reason = %e, "request body did not decrypt");
                self.run(UNDECRYPTABLE, &body).unwrap_or_else(|| {
                    warn!(kind = e.kind(), body_len = raw.len(), "request body could not be decoded");
                    Decoded::sentinel(RAW_DATA_KEY, preview(&body.text))
                })
            }
        }
    }

    /// Try `stages` in order and return the first success.
    fn run(&self, stages: &[Stage], body: &RawBody<'_>) -> Option<Decoded> {
        for &stage in stages {
            match self.attempt(stage, body) {
                Ok(payload) => {
                    debug!(strategy = %stage.strategy(), "request body decoded");
                    return Some(Decoded::new(stage.strategy(), payload));
                }
                Err(miss) => debug!(stage = ?stage, %miss, "decode strategy missed"),
            }
        }
        None
    }

    fn attempt(&self, stage: Stage, body: &RawBody<'_>) -> Result<Payload, Miss> {
        match stage {
            Stage::LeadingBrace => {
                if body.text.trim_start().starts_with('{') {
                    parse_object(&body.text)
                } else {
                    Err(Miss::Skipped("body does not start with '{'"))
                }
            }
            Stage::RepairPadding => self.repair_padding(body.bytes),
            Stage::WholeJson => parse_object(&body.text),
            Stage::BraceScan => brace_scan(&body.text),
            Stage::FormFields => form_fields(&body.text),
        }
    }

    /// Append `=` up to a multiple of four and decrypt once more.
    ///
    /// ASCII whitespace is dropped first, as the base64 decoder ignores it.
    fn repair_padding(&self, raw: &[u8]) -> Result<Payload, Miss> {
        let mut padded: Vec<u8> = raw
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        let rem = padded.len() % 4;
        if rem == 0 {
            return Err(Miss::Skipped("base64 length already a multiple of 4"));
        }
        padded.resize(padded.len() + 4 - rem, b'=');
        let plaintext = self
            .codec
            .decrypt(&padded)
            .map_err(|e| Miss::Failed(e.to_string()))?;
        Ok(payload_from_plaintext(&plaintext))
    }
}

/// Turn decrypted bytes into a payload. Never fails.
fn payload_from_plaintext(plaintext: &[u8]) -> Payload {
    let text = match std::str::from_utf8(plaintext) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => {
            debug!("decrypted body is not UTF-8; reading it as Latin-1");
            Cow::Owned(latin1(plaintext))
        }
    };
    parse_object(&text)
        .or_else(|_| brace_scan(&text))
        .unwrap_or_else(|miss| {
            debug!(%miss, "decrypted body is not JSON; wrapping as message");
            protocol::single("message", preview(&text))
        })
}

/// One char per byte, so no byte sequence is unrepresentable.
fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn parse_object(text: &str) -> Result<Payload, Miss> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Miss::Failed("JSON document is not an object".into())),
        Err(e) => Err(Miss::Failed(e.to_string())),
    }
}

fn brace_object() -> &'static Regex {
    static BRACE_OBJECT: OnceLock<Regex> = OnceLock::new();
    BRACE_OBJECT.get_or_init(|| Regex::new(r"\{[^{}]*\}").expect("brace pattern is a valid regex"))
}

/// Parse the first brace-delimited substring that contains no nested braces.
fn brace_scan(text: &str) -> Result<Payload, Miss> {
    let found = brace_object()
        .find(text)
        .ok_or(Miss::Skipped("no brace-delimited substring"))?;
    parse_object(found.as_str())
}

/// Split `a=1&b=2` into `{"a": "1", "b": "2"}`. Values are kept verbatim.
fn form_fields(text: &str) -> Result<Payload, Miss> {
    if !(text.contains('=') && text.contains('&')) {
        return Err(Miss::Skipped("no '=' and '&' in body"));
    }
    let mut map = Payload::new();
    for pair in text.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            map.insert(key.to_owned(), Value::String(value.to_owned()));
        }
    }
    Ok(map)
}

/// First [`PREVIEW_CHARS`] characters followed by `...`.
fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::container;
    use crate::secret::PayloadSecret;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use serde_json::json;

    // "secret", salt 0102030405060708, plaintext {"x":42}
    const X42_SECRET: &str = "U2FsdGVkX18BAgMEBQYHCFMetIo7eQAFc51SyftPh1I=";
    // "secret", salt 0102030405060708, plaintext `hello world, not json`
    const NOT_JSON_SECRET: &str = "U2FsdGVkX18BAgMEBQYHCJsMYlseXKbo4PwBdX2FkkkuPRiHFySH8PvpKk183BES";
    // "secret", salt 0102030405060708, plaintext ff fe 7b 7d
    const LATIN1_SECRET: &str = "U2FsdGVkX18BAgMEBQYHCCgqZGROOpWxG+uUfIy9BfA=";

    fn decoder(secret: &str) -> RequestDecoder {
        RequestDecoder::new(PayloadCodec::new(PayloadSecret::new(secret)))
    }

    fn object(v: Value) -> Payload {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_body_is_empty_mapping() {
        let d = decoder("secret").decode_detailed(b"");
        assert_eq!(d.strategy, Strategy::Empty);
        assert!(d.payload.is_empty());
    }

    #[test]
    fn plaintext_json_passes_through() {
        let d = decoder("secret").decode_detailed(br#"{"a":1}"#);
        assert_eq!(d.strategy, Strategy::PlainJson);
        assert_eq!(d.payload, object(json!({"a": 1})));
    }

    #[test]
    fn plaintext_json_with_leading_whitespace() {
        let p = decoder("secret").decode(b"\n  {\"contest_id\": 12}\n");
        assert_eq!(p["contest_id"], 12);
    }

    #[test]
    fn encrypted_body_decrypts() {
        let body = container::encrypt(br#"{"x":42}"#, b"secret");
        let d = decoder("secret").decode_detailed(&body);
        assert_eq!(d.strategy, Strategy::Decrypted);
        assert_eq!(d.payload, object(json!({"x": 42})));
    }

    #[test]
    fn known_vector_decrypts() {
        assert_eq!(decoder("secret").decode(X42_SECRET.as_bytes()), object(json!({"x": 42})));
    }

    #[test]
    fn missing_padding_is_repaired() {
        let unpadded = X42_SECRET.trim_end_matches('=');
        let d = decoder("secret").decode_detailed(unpadded.as_bytes());
        assert_eq!(d.strategy, Strategy::RepairedPadding);
        assert_eq!(d.payload, object(json!({"x": 42})));
    }

    #[test]
    fn missing_padding_with_trailing_newline_is_repaired() {
        let body = format!("{}\n", X42_SECRET.trim_end_matches('='));
        let d = decoder("secret").decode_detailed(body.as_bytes());
        assert_eq!(d.strategy, Strategy::RepairedPadding);
        assert_eq!(d.payload, object(json!({"x": 42})));

        let wrapped = format!("{}\r\n{}", &X42_SECRET[..20], X42_SECRET[20..].trim_end_matches('='));
        let d = decoder("secret").decode_detailed(wrapped.as_bytes());
        assert_eq!(d.strategy, Strategy::RepairedPadding);
    }

    #[test]
    fn garbage_yields_error_sentinel() {
        let d = decoder("secret").decode_detailed(b"not base64 !!!");
        assert_eq!(d.strategy, Strategy::Sentinel);
        assert_eq!(
            d.payload[ERROR_KEY],
            "format error: input is not valid base64"
        );
    }

    #[test]
    fn base64_without_container_prefix_yields_error_sentinel() {
        // base64 of {"a":1}: valid base64, no Salted__ prefix
        let p = decoder("secret").decode(b"eyJhIjoxfQ==");
        assert!(p.contains_key(ERROR_KEY));
    }

    #[test]
    fn wrong_passphrase_yields_raw_data() {
        let d = decoder("wrong").decode_detailed(X42_SECRET.as_bytes());
        assert_eq!(d.strategy, Strategy::Sentinel);
        assert_eq!(d.payload[RAW_DATA_KEY], format!("{X42_SECRET}..."));
    }

    #[test]
    fn missing_secret_yields_error_sentinel() {
        let d = RequestDecoder::default().decode_detailed(X42_SECRET.as_bytes());
        assert_eq!(d.strategy, Strategy::Sentinel);
        assert!(d.payload[ERROR_KEY].as_str().unwrap().starts_with("config error"));
    }

    #[test]
    fn missing_secret_wins_over_padding_repair() {
        let unpadded = X42_SECRET.trim_end_matches('=');
        let p = RequestDecoder::default().decode(unpadded.as_bytes());
        assert!(p.contains_key(ERROR_KEY));
    }

    #[test]
    fn missing_secret_still_reads_plaintext() {
        let p = RequestDecoder::default().decode(br#"{"username":"aman"}"#);
        assert_eq!(p["username"], "aman");
    }

    #[test]
    fn decrypted_non_json_is_wrapped_as_message() {
        let d = decoder("secret").decode_detailed(NOT_JSON_SECRET.as_bytes());
        assert_eq!(d.strategy, Strategy::Decrypted);
        assert_eq!(d.payload["message"], "hello world, not json...");
    }

    #[test]
    fn decrypted_non_utf8_falls_back_to_latin1() {
        // ÿþ{} -> brace scan finds {}
        let d = decoder("secret").decode_detailed(LATIN1_SECRET.as_bytes());
        assert_eq!(d.strategy, Strategy::Decrypted);
        assert!(d.payload.is_empty());
    }

    #[test]
    fn decrypted_json_embedded_in_text_is_brace_scanned() {
        let body = container::encrypt(br#"prefix {"team":"a"} suffix"#, b"secret");
        assert_eq!(decoder("secret").decode(&body), object(json!({"team": "a"})));
    }

    #[test]
    fn decrypted_long_text_message_is_truncated() {
        let body = container::encrypt("é".repeat(300).as_bytes(), b"secret");
        let p = decoder("secret").decode(&body);
        let msg = p["message"].as_str().unwrap();
        assert_eq!(msg.chars().count(), PREVIEW_CHARS + 3);
        assert!(msg.ends_with("..."));
    }

    #[test]
    fn malformed_leading_brace_falls_through_to_brace_scan() {
        let d = decoder("secret").decode_detailed(br#"{"broken": {"inner": 1}"#);
        assert_eq!(d.strategy, Strategy::BraceScan);
        assert_eq!(d.payload, object(json!({"inner": 1})));
    }

    #[test]
    fn json_array_is_not_a_mapping() {
        let p = decoder("secret").decode(b"[1, 2, 3]");
        assert!(p.contains_key(ERROR_KEY));
    }

    #[test]
    fn form_fields_split_pairs() {
        let p = form_fields("contest_id=5&team=rust&flag&note=a=b").unwrap();
        assert_eq!(
            p,
            object(json!({"contest_id": "5", "team": "rust", "note": "a=b"}))
        );
        assert!(matches!(form_fields("a=1"), Err(Miss::Skipped(_))));
    }

    #[test]
    fn undecryptable_cascade_reaches_form_fields() {
        let body = RawBody::new(b"a=1&b=2");
        let d = decoder("secret").run(UNDECRYPTABLE, &body).unwrap();
        assert_eq!(d.strategy, Strategy::FormFields);
        assert_eq!(d.payload, object(json!({"a": "1", "b": "2"})));
    }

    #[test]
    fn repair_padding_skips_aligned_input() {
        let miss = decoder("secret").repair_padding(X42_SECRET.as_bytes()).unwrap_err();
        assert!(matches!(miss, Miss::Skipped(_)));
    }

    #[test]
    fn raw_data_preview_is_truncated() {
        let long = container::encrypt_with_salt(&[b'{'; 400], b"secret", [1, 2, 3, 4, 5, 6, 7, 8]);
        let p = decoder("wrong").decode(&long);
        let raw = p[RAW_DATA_KEY].as_str().unwrap();
        assert_eq!(raw.len(), PREVIEW_CHARS + 3);
        assert!(raw.starts_with("U2FsdGVkX1"));
    }

    #[test]
    fn latin1_maps_every_byte() {
        let all: Vec<u8> = (0..=255).collect();
        assert_eq!(latin1(&all).chars().count(), 256);
    }

    #[test]
    fn never_fails_on_arbitrary_input() {
        let d = decoder("secret");
        let mut rng = StdRng::seed_from_u64(0x5a17ed);
        let valid = container::encrypt(br#"{"ok":true}"#, b"secret");
        let mut inputs: Vec<Vec<u8>> = vec![
            b" ".to_vec(),
            b"{".to_vec(),
            b"}{".to_vec(),
            b"=&".to_vec(),
            b"U2FsdGVkX1".to_vec(),
            vec![0xff; 64],
            valid.clone(),
        ];
        for _ in 0..256 {
            let len = rng.gen_range(0..96);
            inputs.push((0..len).map(|_| rng.gen::<u8>()).collect());
        }
        for _ in 0..64 {
            let mut mutated = valid.clone();
            let i = rng.gen_range(0..mutated.len());
            mutated[i] = rng.gen();
            inputs.push(mutated);
        }
        for input in &inputs {
            let decoded = d.decode_detailed(input);
            if decoded.strategy == Strategy::Sentinel {
                assert!(protocol::sentinel(&decoded.payload).is_some());
            }
        }
    }

    #[test]
    fn round_trips_arbitrary_payloads() {
        let d = decoder("p@ss");
        let payloads = [
            json!({}),
            json!({"email": "a@b.c", "avatar_idx": 2, "phone_no": "9832776728"}),
            json!({"nested": {"list": [1, "two", null, 3.5]}, "unicode": "日本"}),
        ];
        for p in payloads {
            let body = container::encrypt(&serde_json::to_vec(&p).unwrap(), b"p@ss");
            assert_eq!(Value::Object(d.decode(&body)), p);
        }
    }
}
