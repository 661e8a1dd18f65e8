//! Logic behind the `bo-pack` and `bo-unpack` binaries.
//!
//! - `bo-pack`: encode JSON (stdin) to binary (stdout)
//! - `bo-unpack`: decode binary (stdin) to JSON (stdout)

use serde_json::Value as JsonValue;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use crate::{decode, encode, CodecError, Value};

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum CliError {
    Json(serde_json::Error),
    Codec(CodecError),
    Io(std::io::Error),
    /// Decoded tree nests deeper than JSON output allows.
    TooDeep { depth: usize, limit: usize },
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Json(e) => write!(f, "invalid JSON: {e}"),
            CliError::Codec(e) => write!(f, "{e}"),
            CliError::Io(e) => write!(f, "{e}"),
            CliError::TooDeep { depth, limit } => write!(
                f,
                "value nests {depth} containers deep; JSON output allows at most {limit}"
            ),
        }
    }
}

impl std::error::Error for CliError {}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

impl From<CodecError> for CliError {
    fn from(e: CodecError) -> Self {
        CliError::Codec(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

// ── Flags ─────────────────────────────────────────────────────────────────

/// Flags shared by both binaries.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CliFlags {
    pub pretty: bool,
    pub verbose: bool,
}

impl CliFlags {
    /// Parses flags, ignoring anything unrecognised.
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = CliFlags::default();
        for arg in args {
            match arg.as_ref() {
                "--pretty" => flags.pretty = true,
                "--verbose" | "-v" => flags.verbose = true,
                _ => {}
            }
        }
        flags
    }
}

/// Sends `tracing` output to stderr; `--verbose` lowers the level to DEBUG.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    // Already installed (e.g. by a test harness) is fine.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

// ── bo-pack ───────────────────────────────────────────────────────────────

/// Encodes a JSON document.
pub fn pack(json: &str) -> Result<Vec<u8>, CliError> {
    let json: JsonValue = serde_json::from_str(json)?;
    Ok(encode(&Value::from(json))?)
}

// ── bo-unpack ─────────────────────────────────────────────────────────────

/// Deepest container nesting `unpack` will serialize. Matches the recursion
/// limit `serde_json` applies when parsing, so anything `pack` accepts can be
/// unpacked again.
pub const MAX_JSON_DEPTH: usize = 128;

/// Decodes binary input to a JSON string.
///
/// Trees nested deeper than [`MAX_JSON_DEPTH`] fail with
/// [`CliError::TooDeep`].
pub fn unpack(bytes: &[u8], pretty: bool) -> Result<String, CliError> {
    let value = decode(bytes)?;
    let depth = value.depth();
    if depth > MAX_JSON_DEPTH {
        debug!(depth, limit = MAX_JSON_DEPTH, "refusing to serialize deep tree");
        return Err(CliError::TooDeep {
            depth,
            limit: MAX_JSON_DEPTH,
        });
    }
    let json = JsonValue::from(&value);
    let out = if pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    Ok(out)
}
