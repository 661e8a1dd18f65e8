//! Custom type processors and the chain that dispatches to them.
//!
//! A [`ProcessorChain`] is built once from an ordered list of
//! [`ProcessorEntry`] values and then shared, read-only, by any number of
//! encoders and decoders. Encoding scans the entries in declaration order and
//! the first validator that accepts a value wins. Decoding looks the tag up
//! directly.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::constants::{FIRST_CUSTOM_TAG, RESERVED_TAG_MAX};
use crate::{CodecError, Value};

/// Result type returned by processor callbacks. Any error type converts into
/// it with `?`, and plain strings convert with `.into()`.
pub type ProcessorResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Handles one custom value type.
///
/// # Example
///
/// ```
/// use binary_object::{ProcessorResult, TypeProcessor, Value};
///
/// #[derive(Debug, PartialEq)]
/// struct Celsius(f64);
///
/// struct CelsiusProcessor;
///
/// impl TypeProcessor for CelsiusProcessor {
///     fn validate(&self, value: &Value) -> bool {
///         value.is::<Celsius>()
///     }
///
///     fn encode(&self, value: &Value) -> ProcessorResult<Vec<u8>> {
///         let c = value.downcast_ref::<Celsius>().ok_or("not a Celsius")?;
///         Ok(c.0.to_le_bytes().to_vec())
///     }
///
///     fn decode(&self, payload: &[u8]) -> ProcessorResult<Value> {
///         let bytes: [u8; 8] = payload.try_into()?;
///         Ok(Value::custom(Celsius(f64::from_le_bytes(bytes))))
///     }
/// }
/// ```
pub trait TypeProcessor: Send + Sync {
    /// Returns `true` if this processor should encode `value`.
    fn validate(&self, value: &Value) -> bool;
    /// Produces the payload written after the tag and length prefix.
    fn encode(&self, value: &Value) -> ProcessorResult<Vec<u8>>;
    /// Rebuilds a value from a payload produced by [`encode`](Self::encode).
    fn decode(&self, payload: &[u8]) -> ProcessorResult<Value>;
}

type ValidateFn = Box<dyn Fn(&Value) -> bool + Send + Sync>;
type EncodeFn = Box<dyn Fn(&Value) -> ProcessorResult<Vec<u8>> + Send + Sync>;
type DecodeFn = Box<dyn Fn(&[u8]) -> ProcessorResult<Value> + Send + Sync>;

struct FnProcessor {
    validate: ValidateFn,
    encode: EncodeFn,
    decode: DecodeFn,
}

impl TypeProcessor for FnProcessor {
    fn validate(&self, value: &Value) -> bool {
        (self.validate)(value)
    }

    fn encode(&self, value: &Value) -> ProcessorResult<Vec<u8>> {
        (self.encode)(value)
    }

    fn decode(&self, payload: &[u8]) -> ProcessorResult<Value> {
        (self.decode)(payload)
    }
}

/// A processor bound to the tag it owns on the wire.
#[derive(Clone)]
pub struct ProcessorEntry {
    tag: u8,
    processor: Arc<dyn TypeProcessor>,
}

impl ProcessorEntry {
    pub fn new(tag: u8, processor: impl TypeProcessor + 'static) -> Self {
        Self {
            tag,
            processor: Arc::new(processor),
        }
    }

    /// Binds an already shared processor, e.g. one registered under
    /// several chains.
    pub fn from_arc(tag: u8, processor: Arc<dyn TypeProcessor>) -> Self {
        Self { tag, processor }
    }

    /// Starts a closure-based entry. All three callbacks are required.
    pub fn builder(tag: u8) -> ProcessorEntryBuilder {
        ProcessorEntryBuilder {
            tag,
            validate: None,
            encode: None,
            decode: None,
        }
    }

    pub fn tag(&self) -> u8 {
        self.tag
    }

    pub fn processor(&self) -> &dyn TypeProcessor {
        self.processor.as_ref()
    }
}

impl fmt::Debug for ProcessorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorEntry")
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`ProcessorEntry`] from closures.
pub struct ProcessorEntryBuilder {
    tag: u8,
    validate: Option<ValidateFn>,
    encode: Option<EncodeFn>,
    decode: Option<DecodeFn>,
}

impl ProcessorEntryBuilder {
    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validate = Some(Box::new(f));
        self
    }

    pub fn encode<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> ProcessorResult<Vec<u8>> + Send + Sync + 'static,
    {
        self.encode = Some(Box::new(f));
        self
    }

    pub fn decode<F>(mut self, f: F) -> Self
    where
        F: Fn(&[u8]) -> ProcessorResult<Value> + Send + Sync + 'static,
    {
        self.decode = Some(Box::new(f));
        self
    }

    /// Fails with [`CodecError::InvalidInstructions`] if any callback is
    /// missing.
    pub fn build(self) -> Result<ProcessorEntry, CodecError> {
        let tag = self.tag;
        let missing = |field: &str| {
            debug!(tag, field, "processor entry is missing a callback");
            CodecError::InvalidInstructions(format!(
                "processor entry for tag {tag} is missing `{field}`"
            ))
        };
        let processor = FnProcessor {
            validate: self.validate.ok_or_else(|| missing("validate"))?,
            encode: self.encode.ok_or_else(|| missing("encode"))?,
            decode: self.decode.ok_or_else(|| missing("decode"))?,
        };
        Ok(ProcessorEntry::new(tag, processor))
    }
}

struct ChainInner {
    entries: Vec<ProcessorEntry>,
    /// Position in `entries` for each tag byte.
    by_tag: [Option<usize>; 256],
}

/// An immutable, validated, ordered list of processors.
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone)]
pub struct ProcessorChain {
    inner: Arc<ChainInner>,
}

impl Default for ProcessorChain {
    fn default() -> Self {
        Self::empty()
    }
}

impl ProcessorChain {
    /// A chain with no processors; only built-in shapes are encodable.
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(ChainInner {
                entries: Vec::new(),
                by_tag: [None; 256],
            }),
        }
    }

    /// Validates `entries` and builds the chain.
    ///
    /// Fails with [`CodecError::InvalidInstructions`] when a tag falls in the
    /// reserved built-in range or two entries share a tag.
    pub fn new(entries: impl IntoIterator<Item = ProcessorEntry>) -> Result<Self, CodecError> {
        let entries: Vec<ProcessorEntry> = entries.into_iter().collect();
        let mut by_tag = [None; 256];
        for (i, entry) in entries.iter().enumerate() {
            let tag = entry.tag;
            if tag <= RESERVED_TAG_MAX {
                debug!(tag, "processor tag collides with a built-in tag");
                return Err(CodecError::InvalidInstructions(format!(
                    "tag {tag} is reserved for built-in types; custom tags start at {FIRST_CUSTOM_TAG}"
                )));
            }
            let slot = &mut by_tag[tag as usize];
            if slot.is_some() {
                debug!(tag, "processor tag registered twice");
                return Err(CodecError::InvalidInstructions(format!(
                    "tag {tag} is registered more than once"
                )));
            }
            *slot = Some(i);
        }
        debug!(
            entries = entries.len(),
            tags = ?entries.iter().map(|e| e.tag).collect::<Vec<_>>(),
            "processor chain built"
        );
        Ok(Self {
            inner: Arc::new(ChainInner { entries, by_tag }),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[ProcessorEntry] {
        &self.inner.entries
    }

    /// First entry, in declaration order, whose validator accepts `value`.
    pub fn find_for(&self, value: &Value) -> Option<&ProcessorEntry> {
        self.inner
            .entries
            .iter()
            .find(|entry| entry.processor.validate(value))
    }

    /// Entry registered for `tag`.
    #[inline]
    pub fn get(&self, tag: u8) -> Option<&ProcessorEntry> {
        self.inner.by_tag[tag as usize].map(|i| &self.inner.entries[i])
    }
}

impl fmt::Debug for ProcessorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.entries.iter()).finish()
    }
}
