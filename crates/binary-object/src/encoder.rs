//! Writes a [`Value`] tree as tagged binary.

use binary_object_buffers::Writer;
use tracing::{debug, trace};

use crate::constants::BoTag;
use crate::{CodecError, ProcessorChain, ProcessorEntry, Value};

/// Pending work for the traversal stack.
enum Task<'v> {
    Value(&'v Value),
    Key(&'v str),
}

/// Encodes values with an optional chain of custom type processors.
///
/// An encoder owns its output buffer, so one instance serves one caller at a
/// time; share the [`ProcessorChain`] instead of the encoder.
///
/// # Example
///
/// ```
/// use binary_object::{Decoder, Encoder, Value};
///
/// let value = Value::object([("wellTested", Value::Bool(true))]);
/// let bytes = Encoder::new().encode(&value).unwrap();
/// assert_eq!(Decoder::without_processors(&bytes).decode().unwrap(), value);
/// ```
pub struct Encoder {
    writer: Writer,
    chain: ProcessorChain,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// An encoder that only handles built-in shapes.
    pub fn new() -> Self {
        Self::with_chain(ProcessorChain::empty())
    }

    pub fn with_chain(chain: ProcessorChain) -> Self {
        Self {
            writer: Writer::new(),
            chain,
        }
    }

    /// Validates `entries` into a chain and builds an encoder around it.
    pub fn with_processors(
        entries: impl IntoIterator<Item = ProcessorEntry>,
    ) -> Result<Self, CodecError> {
        Ok(Self::with_chain(ProcessorChain::new(entries)?))
    }

    /// Like [`with_chain`](Self::with_chain), with a custom initial buffer
    /// size for the output writer.
    pub fn with_alloc_size(chain: ProcessorChain, alloc_size: usize) -> Self {
        Self {
            writer: Writer::with_alloc_size(alloc_size),
            chain,
        }
    }

    pub fn chain(&self) -> &ProcessorChain {
        &self.chain
    }

    /// Encodes `value` into a fresh byte vector.
    ///
    /// On error nothing is kept in the internal buffer.
    pub fn encode(&mut self, value: &Value) -> Result<Vec<u8>, CodecError> {
        self.writer.reset();
        match self.write_any(value) {
            Ok(()) => {
                let bytes = self.writer.flush();
                trace!(len = bytes.len(), "encoded value");
                Ok(bytes)
            }
            Err(err) => {
                self.writer.reset();
                debug!(error = %err, "encode failed");
                Err(err)
            }
        }
    }

    /// Appends `value` to the internal buffer without flushing.
    ///
    /// Walks the tree depth-first, pre-order, with an explicit stack.
    pub fn write_any(&mut self, value: &Value) -> Result<(), CodecError> {
        let mut stack = vec![Task::Value(value)];
        while let Some(task) = stack.pop() {
            let value = match task {
                Task::Key(key) => {
                    self.writer.utf8(key)?;
                    continue;
                }
                Task::Value(value) => value,
            };
            match value {
                Value::Undefined => self.writer.u8(BoTag::Undefined as u8),
                Value::Null => self.writer.u8(BoTag::Null as u8),
                Value::Bool(true) => self.writer.u8(BoTag::True as u8),
                Value::Bool(false) => self.writer.u8(BoTag::False as u8),
                // NaN has no wire form.
                Value::Number(n) if n.is_nan() => self.writer.u8(BoTag::Null as u8),
                Value::Number(n) => self.writer.u8f64_le(BoTag::Number as u8, *n),
                Value::Str(s) => {
                    self.writer.u8(BoTag::String as u8);
                    self.writer.utf8(s)?;
                }
                Value::Bytes(b) => {
                    self.writer.u8(BoTag::Bytes as u8);
                    self.writer.framed(b)?;
                }
                Value::Timestamp(ms) => self.writer.u8f64_le(BoTag::Timestamp as u8, *ms),
                Value::Array(items) => {
                    let count = count_of(items.len(), "array")?;
                    self.writer.u8u32_le(BoTag::Array as u8, count);
                    stack.extend(items.iter().rev().map(Task::Value));
                }
                Value::Object(entries) => {
                    let count = count_of(entries.len(), "object")?;
                    self.writer.u8u32_le(BoTag::Object as u8, count);
                    for (key, value) in entries.iter().rev() {
                        stack.push(Task::Value(value));
                        stack.push(Task::Key(key));
                    }
                }
                Value::Custom(_) => self.write_custom(value)?,
            }
        }
        Ok(())
    }

    fn write_custom(&mut self, value: &Value) -> Result<(), CodecError> {
        let Some(entry) = self.chain.find_for(value) else {
            debug!(kind = value.kind(), "no processor accepts value");
            return Err(CodecError::UnencodableValue(format!(
                "no processor accepts a value of type {}",
                value.kind()
            )));
        };
        let tag = entry.tag();
        let payload = entry
            .processor()
            .encode(value)
            .map_err(|err| CodecError::CustomType {
                tag,
                reason: err.to_string(),
            })?;
        self.writer.u8(tag);
        self.writer.framed(&payload)?;
        Ok(())
    }
}

fn count_of(len: usize, kind: &str) -> Result<u32, CodecError> {
    u32::try_from(len).map_err(|_| {
        CodecError::UnencodableValue(format!("{kind} with {len} entries exceeds the u32 count"))
    })
}
