//! Page - the in-memory image of one block.
//!
//! A [`Page`] is a fixed-size byte buffer with typed field accessors.
//! Fields are laid out by the caller at arbitrary offsets:
//!
//! ```text
//! int:    [i32 LE]
//! bytes:  [len: u32 LE][raw bytes ...]
//! string: [len: u32 LE][UTF-8 bytes ...]
//! ```

use crate::common::{Error, Result};

/// Size of the integer field and of the length prefix.
const INT_SIZE: usize = 4;

/// A mutable fixed-size byte buffer holding one block.
///
/// The size is the block store's block size. A frame being decommissioned
/// holds a zero-length page until it is reassigned.
///
/// # Clone Implementation
/// `Page` does NOT implement `Clone` in production code (copying a block
/// should be explicit). A `#[cfg(test)]` Clone is provided for tests.
///
/// # Example
/// ```
/// use simpledb::storage::Page;
///
/// let mut page = Page::new(64);
/// page.put_int(0, 17).unwrap();
/// page.put_string(4, "lintang").unwrap();
///
/// assert_eq!(page.get_int(0).unwrap(), 17);
/// assert_eq!(page.get_string(4).unwrap(), "lintang");
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct Page {
    data: Vec<u8>,
}

impl Page {
    /// Create a new zeroed page of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size],
        }
    }

    /// Wrap existing bytes as a page.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Bytes needed to store a string or byte field of `len` bytes.
    #[inline]
    pub const fn max_length(len: usize) -> usize {
        INT_SIZE + len
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Zero the page and resize it to `size` bytes.
    pub(crate) fn reset_to(&mut self, size: usize) {
        self.data.clear();
        self.data.resize(size, 0);
    }

    /// Read a 4-byte little-endian integer at `offset`.
    pub fn get_int(&self, offset: usize) -> Result<i32> {
        let bytes = self.range(offset, INT_SIZE)?;
        let mut raw = [0u8; INT_SIZE];
        raw.copy_from_slice(bytes);
        Ok(i32::from_le_bytes(raw))
    }

    /// Write a 4-byte little-endian integer at `offset`.
    pub fn put_int(&mut self, offset: usize, value: i32) -> Result<()> {
        self.range_mut(offset, INT_SIZE)?
            .copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Read a length-prefixed byte field at `offset`.
    pub fn get_bytes(&self, offset: usize) -> Result<Vec<u8>> {
        let len = self.get_len(offset)?;
        Ok(self.range(offset + INT_SIZE, len)?.to_vec())
    }

    /// Write `bytes` as a length-prefixed field at `offset`.
    ///
    /// Nothing is written if the field does not fit.
    pub fn put_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let len = u32::try_from(bytes.len()).map_err(|_| self.out_of_bounds(offset, bytes.len()))?;
        // Check the whole field up front so a failed write leaves no prefix behind.
        self.range(offset, Self::max_length(bytes.len()))?;

        self.range_mut(offset, INT_SIZE)?
            .copy_from_slice(&len.to_le_bytes());
        self.range_mut(offset + INT_SIZE, bytes.len())?
            .copy_from_slice(bytes);
        Ok(())
    }

    /// Read a UTF-8 string field at `offset`.
    pub fn get_string(&self, offset: usize) -> Result<String> {
        Ok(String::from_utf8(self.get_bytes(offset)?)?)
    }

    /// Write `s` as a UTF-8 string field at `offset`.
    pub fn put_string(&mut self, offset: usize, s: &str) -> Result<()> {
        self.put_bytes(offset, s.as_bytes())
    }

    fn get_len(&self, offset: usize) -> Result<usize> {
        let bytes = self.range(offset, INT_SIZE)?;
        let mut raw = [0u8; INT_SIZE];
        raw.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(raw) as usize)
    }

    fn range(&self, offset: usize, len: usize) -> Result<&[u8]> {
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(&self.data[offset..end]),
            _ => Err(self.out_of_bounds(offset, len)),
        }
    }

    fn range_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8]> {
        match offset.checked_add(len) {
            Some(end) if end <= self.data.len() => Ok(&mut self.data[offset..end]),
            _ => Err(self.out_of_bounds(offset, len)),
        }
    }

    fn out_of_bounds(&self, offset: usize, len: usize) -> Error {
        Error::PageOutOfBounds {
            offset,
            len,
            size: self.data.len(),
        }
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        Page::from_bytes(self.data.clone())
    }
}
