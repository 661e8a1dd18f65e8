//! Tagged binary encoding for value trees, with pluggable custom types.
//!
//! Every value on the wire is a one-byte tag followed by its payload:
//!
//! | Tag | Shape | Payload |
//! |-----|-------|---------|
//! | 0 | undefined | none |
//! | 1 | null | none |
//! | 2 / 3 | false / true | none |
//! | 4 | number | `f64` LE |
//! | 5 | string | `u32` LE length + UTF-8 |
//! | 6 | bytes | `u32` LE length + raw bytes |
//! | 7 | timestamp | `f64` LE, ms since epoch |
//! | 8 | array | `u32` LE count + values |
//! | 9 | object | `u32` LE count + (framed key, value) pairs |
//! | ≥ 10 | custom | `u32` LE length + processor payload |
//!
//! Custom tags are owned by [`TypeProcessor`]s registered in a
//! [`ProcessorChain`].
//!
//! # Example
//!
//! ```
//! use binary_object::{decode, encode, Value};
//!
//! let value = Value::object([
//!     ("name", Value::from("Cristóvão Galvão")),
//!     ("createdAt", Value::Timestamp(1_577_836_800_000.0)),
//!     ("tags", Value::Array(vec![Value::from("a"), Value::Null])),
//! ]);
//! let bytes = encode(&value).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), value);
//! ```

pub mod cli;
pub mod constants;
mod decoder;
mod encoder;
mod error;
mod processor;
mod value;

pub use constants::BoTag;
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::CodecError;
pub use processor::{
    ProcessorChain, ProcessorEntry, ProcessorEntryBuilder, ProcessorResult, TypeProcessor,
};
pub use value::{CustomValue, Value};

/// Encodes `value` using built-in shapes only.
pub fn encode(value: &Value) -> Result<Vec<u8>, CodecError> {
    Encoder::new().encode(value)
}

/// Decodes `bytes` using built-in tags only.
pub fn decode(bytes: &[u8]) -> Result<Value, CodecError> {
    Decoder::without_processors(bytes).decode()
}
