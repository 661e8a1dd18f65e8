//! Binary buffer writer with auto-growing capacity.

use crate::BufferError;

/// A little-endian byte writer that grows automatically as needed.
///
/// # Example
///
/// ```
/// use binary_object_buffers::Writer;
///
/// let mut writer = Writer::new();
/// writer.u8(0x05);
/// writer.utf8("hi").unwrap();
/// assert_eq!(writer.flush(), [0x05, 0x02, 0x00, 0x00, 0x00, b'h', b'i']);
/// ```
pub struct Writer {
    uint8: Vec<u8>,
    /// Position where last flush happened.
    x0: usize,
    /// Current cursor position.
    x: usize,
    /// Allocation size when buffer needs to grow.
    alloc_size: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    /// Creates a new writer with the default allocation size (16KB).
    pub fn new() -> Self {
        Self::with_alloc_size(16 * 1024)
    }

    /// Creates a new writer with a custom allocation size.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        let alloc_size = alloc_size.max(1);
        Self {
            uint8: vec![0u8; alloc_size],
            x0: 0,
            x: 0,
            alloc_size,
        }
    }

    /// Number of bytes written since the last flush.
    pub fn len(&self) -> usize {
        self.x - self.x0
    }

    /// Returns `true` if nothing was written since the last flush.
    pub fn is_empty(&self) -> bool {
        self.x == self.x0
    }

    /// Ensures at least `capacity` bytes can be written without growing.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        let remaining = self.uint8.len() - self.x;
        if remaining >= capacity {
            return;
        }
        let pending = self.x - self.x0;
        let required = pending + capacity;
        let new_size = if required <= self.alloc_size {
            self.alloc_size
        } else {
            required * 2
        };
        self.grow(new_size);
    }

    // Compacts unflushed bytes to the front of a fresh buffer.
    fn grow(&mut self, new_size: usize) {
        let pending = self.x - self.x0;
        let mut next = vec![0u8; new_size];
        next[..pending].copy_from_slice(&self.uint8[self.x0..self.x]);
        self.uint8 = next;
        self.x0 = 0;
        self.x = pending;
    }

    /// Drops everything written since the last flush.
    pub fn reset(&mut self) {
        self.x = self.x0;
    }

    /// Returns the bytes written since the last flush and advances the flush
    /// position.
    pub fn flush(&mut self) -> Vec<u8> {
        let out = self.uint8[self.x0..self.x].to_vec();
        self.x0 = self.x;
        out
    }

    /// Writes an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self, val: u8) {
        self.ensure_capacity(1);
        self.uint8[self.x] = val;
        self.x += 1;
    }

    /// Writes an unsigned 32-bit integer (little-endian).
    #[inline]
    pub fn u32_le(&mut self, val: u32) {
        self.ensure_capacity(4);
        self.uint8[self.x..self.x + 4].copy_from_slice(&val.to_le_bytes());
        self.x += 4;
    }

    /// Writes a 64-bit floating point number (little-endian).
    #[inline]
    pub fn f64_le(&mut self, val: f64) {
        self.ensure_capacity(8);
        self.uint8[self.x..self.x + 8].copy_from_slice(&val.to_le_bytes());
        self.x += 8;
    }

    /// Writes a tag byte followed by a little-endian `u32`.
    pub fn u8u32_le(&mut self, tag: u8, val: u32) {
        self.ensure_capacity(5);
        self.uint8[self.x] = tag;
        self.uint8[self.x + 1..self.x + 5].copy_from_slice(&val.to_le_bytes());
        self.x += 5;
    }

    /// Writes a tag byte followed by a little-endian `f64`.
    pub fn u8f64_le(&mut self, tag: u8, val: f64) {
        self.ensure_capacity(9);
        self.uint8[self.x] = tag;
        self.uint8[self.x + 1..self.x + 9].copy_from_slice(&val.to_le_bytes());
        self.x += 9;
    }

    /// Writes a byte slice with no framing.
    pub fn buf(&mut self, buf: &[u8]) {
        let length = buf.len();
        self.ensure_capacity(length);
        self.uint8[self.x..self.x + length].copy_from_slice(buf);
        self.x += length;
    }

    /// Writes a `u32` length prefix followed by `raw`.
    pub fn framed(&mut self, raw: &[u8]) -> Result<(), BufferError> {
        let length = u32::try_from(raw.len()).map_err(|_| BufferError::LengthOverflow(raw.len()))?;
        self.ensure_capacity(4 + raw.len());
        self.u32_le(length);
        self.buf(raw);
        Ok(())
    }

    /// Writes a framed UTF-8 string.
    pub fn utf8(&mut self, s: &str) -> Result<(), BufferError> {
        self.framed(s.as_bytes())
    }
}
