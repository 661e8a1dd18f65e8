//! Byte buffers for the binary-object wire format.
//!
//! [`Writer`] is an append-only sink that grows as needed, [`Reader`] is a
//! forward-only cursor over a borrowed slice. Every multi-byte number is
//! little-endian and every variable-length run is framed by a `u32` length.

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

use thiserror::Error;

/// Errors raised by [`Reader`] and by framed writes on [`Writer`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// Fewer bytes remain than the read requires.
    #[error("unexpected end of buffer")]
    EndOfBuffer,
    /// A framed text run is not valid UTF-8.
    #[error("invalid UTF-8")]
    InvalidUtf8,
    /// A run is too long for its `u32` length prefix.
    #[error("run of {0} bytes does not fit a u32 length prefix")]
    LengthOverflow(usize),
}
