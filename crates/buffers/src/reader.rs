//! Binary buffer reader with cursor tracking.

use std::str;

use crate::BufferError;

/// A forward-only, bounds-checked reader over a byte slice.
///
/// Every read checks its whole run before consuming anything, so the cursor
/// only moves forward and stays where it was on failure.
///
/// # Example
///
/// ```
/// use binary_object_buffers::Reader;
///
/// let data = [0x05, 0x02, 0x00, 0x00, 0x00, b'h', b'i'];
/// let mut reader = Reader::new(&data);
///
/// assert_eq!(reader.u8(), Ok(0x05));
/// assert_eq!(reader.utf8(), Ok("hi"));
/// assert_eq!(reader.remaining(), 0);
/// ```
pub struct Reader<'a> {
    uint8: &'a [u8],
    x: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader positioned at offset zero.
    pub fn new(uint8: &'a [u8]) -> Self {
        Self { uint8, x: 0 }
    }

    /// Returns the number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.uint8.len() - self.x
    }

    /// Returns how many bytes have been consumed so far.
    pub fn position(&self) -> usize {
        self.x
    }

    #[inline]
    fn check(&self, n: usize) -> Result<(), BufferError> {
        if n > self.remaining() {
            Err(BufferError::EndOfBuffer)
        } else {
            Ok(())
        }
    }

    #[inline]
    fn take<const N: usize>(&mut self) -> Result<[u8; N], BufferError> {
        self.check(N)?;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.uint8[self.x..self.x + N]);
        self.x += N;
        Ok(bytes)
    }

    /// Reads an unsigned 8-bit integer.
    #[inline]
    pub fn u8(&mut self) -> Result<u8, BufferError> {
        self.check(1)?;
        let val = self.uint8[self.x];
        self.x += 1;
        Ok(val)
    }

    /// Reads an unsigned 32-bit little-endian integer.
    #[inline]
    pub fn u32_le(&mut self) -> Result<u32, BufferError> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    /// Reads a 64-bit little-endian float.
    #[inline]
    pub fn f64_le(&mut self) -> Result<f64, BufferError> {
        self.take::<8>().map(f64::from_le_bytes)
    }

    /// Reads `size` raw bytes with no framing.
    pub fn buf(&mut self, size: usize) -> Result<&'a [u8], BufferError> {
        self.check(size)?;
        let start = self.x;
        self.x += size;
        Ok(&self.uint8[start..self.x])
    }

    /// Total size of the framed run at the cursor, prefix included, once
    /// the whole run is known to be in bounds.
    fn framed_size(&self) -> Result<usize, BufferError> {
        self.check(4)?;
        let mut prefix = [0u8; 4];
        prefix.copy_from_slice(&self.uint8[self.x..self.x + 4]);
        let size = (u32::from_le_bytes(prefix) as usize)
            .checked_add(4)
            .ok_or(BufferError::EndOfBuffer)?;
        self.check(size)?;
        Ok(size)
    }

    /// Reads a `u32` length prefix and then that many raw bytes.
    ///
    /// The cursor stays put when the prefix or the run is truncated.
    pub fn framed(&mut self) -> Result<&'a [u8], BufferError> {
        let size = self.framed_size()?;
        let uint8 = self.uint8;
        let raw = &uint8[self.x + 4..self.x + size];
        self.x += size;
        Ok(raw)
    }

    /// Reads a framed run and validates it as UTF-8.
    ///
    /// The cursor stays put when the run is truncated or not UTF-8.
    pub fn utf8(&mut self) -> Result<&'a str, BufferError> {
        let size = self.framed_size()?;
        let uint8 = self.uint8;
        let text = str::from_utf8(&uint8[self.x + 4..self.x + size])
            .map_err(|_| BufferError::InvalidUtf8)?;
        self.x += size;
        Ok(text)
    }
}
