//! Rebuilds a [`Value`] tree from tagged binary.

use binary_object_buffers::Reader;
use tracing::{debug, trace};

use crate::constants::BoTag;
use crate::{CodecError, ProcessorChain, ProcessorEntry, Value};

/// A container whose children are still being read.
enum Frame {
    Array {
        items: Vec<Value>,
        remaining: u32,
    },
    Object {
        entries: Vec<(String, Value)>,
        remaining: u32,
        key: Option<String>,
    },
}

impl Frame {
    fn push(&mut self, value: Value) {
        match self {
            Frame::Array { items, remaining } => {
                items.push(value);
                *remaining -= 1;
            }
            Frame::Object {
                entries,
                remaining,
                key,
            } => {
                entries.push((key.take().unwrap_or_default(), value));
                *remaining -= 1;
            }
        }
    }

    fn is_complete(&self) -> bool {
        match self {
            Frame::Array { remaining, .. } | Frame::Object { remaining, .. } => *remaining == 0,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Frame::Array { items, .. } => Value::Array(items),
            Frame::Object { entries, .. } => Value::Object(entries),
        }
    }
}

/// Hands a finished value to the innermost open container, closing every
/// container it completes. Returns the root once the stack is empty.
fn attach(stack: &mut Vec<Frame>, mut value: Value) -> Option<Value> {
    while let Some(frame) = stack.last_mut() {
        frame.push(value);
        if !frame.is_complete() {
            return None;
        }
        value = stack.pop()?.into_value();
    }
    Some(value)
}

/// Decodes one value from a borrowed buffer.
///
/// [`decode`](Self::decode) always starts from offset zero, so calling it
/// again on the same instance yields an equal value. Bytes after the root
/// value are ignored.
pub struct Decoder<'a> {
    input: &'a [u8],
    reader: Reader<'a>,
    chain: ProcessorChain,
}

impl<'a> Decoder<'a> {
    pub fn new(input: &'a [u8], chain: ProcessorChain) -> Self {
        Self {
            input,
            reader: Reader::new(input),
            chain,
        }
    }

    /// A decoder that only understands built-in tags.
    pub fn without_processors(input: &'a [u8]) -> Self {
        Self::new(input, ProcessorChain::empty())
    }

    /// Validates `entries` into a chain and builds a decoder around it.
    pub fn with_processors(
        input: &'a [u8],
        entries: impl IntoIterator<Item = ProcessorEntry>,
    ) -> Result<Self, CodecError> {
        Ok(Self::new(input, ProcessorChain::new(entries)?))
    }

    pub fn chain(&self) -> &ProcessorChain {
        &self.chain
    }

    pub fn decode(&mut self) -> Result<Value, CodecError> {
        self.reader = Reader::new(self.input);
        let result = self.read_any();
        match &result {
            Ok(_) => trace!(len = self.input.len(), "decoded value"),
            Err(err) => debug!(
                error = %err,
                offset = self.reader.position(),
                "decode failed"
            ),
        }
        result
    }

    /// Reads one complete value at the cursor, walking containers with an
    /// explicit stack.
    pub fn read_any(&mut self) -> Result<Value, CodecError> {
        let mut stack: Vec<Frame> = Vec::new();
        loop {
            if let Some(Frame::Object { key, .. }) = stack.last_mut() {
                *key = Some(self.reader.utf8()?.to_owned());
            }
            let tag = self.reader.u8()?;
            let value = match BoTag::from_u8(tag) {
                Some(BoTag::Undefined) => Value::Undefined,
                Some(BoTag::Null) => Value::Null,
                Some(BoTag::False) => Value::Bool(false),
                Some(BoTag::True) => Value::Bool(true),
                Some(BoTag::Number) => Value::Number(self.reader.f64_le()?),
                Some(BoTag::String) => Value::Str(self.reader.utf8()?.to_owned()),
                Some(BoTag::Bytes) => Value::Bytes(self.reader.framed()?.to_vec()),
                Some(BoTag::Timestamp) => Value::Timestamp(self.reader.f64_le()?),
                Some(BoTag::Array) => {
                    let count = self.reader.u32_le()?;
                    if count == 0 {
                        Value::Array(Vec::new())
                    } else {
                        stack.push(Frame::Array {
                            items: Vec::with_capacity(self.capacity_for(count)),
                            remaining: count,
                        });
                        continue;
                    }
                }
                Some(BoTag::Object) => {
                    let count = self.reader.u32_le()?;
                    if count == 0 {
                        Value::Object(Vec::new())
                    } else {
                        stack.push(Frame::Object {
                            entries: Vec::with_capacity(self.capacity_for(count)),
                            remaining: count,
                            key: None,
                        });
                        continue;
                    }
                }
                None => self.read_custom(tag)?,
            };
            if let Some(root) = attach(&mut stack, value) {
                return Ok(root);
            }
        }
    }

    // Every child takes at least one byte, so the remaining input bounds how
    // many can follow whatever the count claims.
    fn capacity_for(&self, count: u32) -> usize {
        (count as usize).min(self.reader.remaining())
    }

    fn read_custom(&mut self, tag: u8) -> Result<Value, CodecError> {
        let Some(entry) = self.chain.get(tag) else {
            debug!(tag, "unknown tag");
            return Err(CodecError::UnknownTag(tag));
        };
        let payload = self.reader.framed()?;
        entry
            .processor()
            .decode(payload)
            .map_err(|err| CodecError::CustomType {
                tag,
                reason: err.to_string(),
            })
    }
}
