//! Configuration for the buffer pool and its block store.

use std::time::Duration;

/// Default size of a block (and therefore of a page) in bytes.
///
/// Matches the OS page size on most systems, so a block read or write maps
/// to a single aligned I/O.
pub const BLOCK_SIZE: usize = 4096;

/// Longest a write-back waits for the page latch before giving up.
///
/// Write-back runs under the pool lock; a caller holding a page's write
/// latch while calling into the pool would otherwise block it forever.
pub const LATCH_TIMEOUT: Duration = Duration::from_millis(200);

/// Number of frames used when no pool size is given.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// File under which `new_page` allocates fresh blocks.
pub const DB_FILE_NAME: &str = "simpledb.db";

/// Settings for a [`BufferPoolManager`](crate::buffer::BufferPoolManager).
///
/// # Example
/// ```
/// use simpledb::common::config::BufferPoolConfig;
///
/// let config = BufferPoolConfig::new(16).with_file_name("orders.tbl");
/// assert_eq!(config.pool_size, 16);
/// assert_eq!(config.file_name, "orders.tbl");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Number of frames allocated at construction.
    pub pool_size: usize,
    /// File that `new_page` appends blocks to.
    pub file_name: String,
}

impl BufferPoolConfig {
    /// Config with `pool_size` frames and the default file name.
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            file_name: DB_FILE_NAME.to_string(),
        }
    }

    /// Use `file_name` for newly allocated blocks.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}
