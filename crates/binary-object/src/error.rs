use binary_object_buffers::BufferError;
use thiserror::Error;

/// Errors produced while building a processor chain, encoding or decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The processor configuration was rejected at construction time.
    #[error("invalid instructions: {0}")]
    InvalidInstructions(String),
    /// No built-in rule or processor accepts the value.
    #[error("unencodable value: {0}")]
    UnencodableValue(String),
    #[error("unexpected end of buffer")]
    UnexpectedEndOfBuffer,
    /// A string payload is not valid UTF-8.
    #[error("invalid UTF-8 encoding")]
    InvalidEncoding,
    #[error("unknown tag: 0x{0:02x}")]
    UnknownTag(u8),
    /// A caller-supplied processor failed to encode or decode.
    #[error("custom type processor for tag {tag} failed: {reason}")]
    CustomType { tag: u8, reason: String },
}

impl From<BufferError> for CodecError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::EndOfBuffer => CodecError::UnexpectedEndOfBuffer,
            BufferError::InvalidUtf8 => CodecError::InvalidEncoding,
            BufferError::LengthOverflow(len) => CodecError::UnencodableValue(format!(
                "run of {len} bytes exceeds the u32 length prefix"
            )),
        }
    }
}
