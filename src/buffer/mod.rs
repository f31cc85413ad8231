//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache layer between the record and
//! transaction layers and disk. It manages a fixed pool of buffers, each
//! holding at most one block.
//!
//! # Components
//! - [`BufferPoolManager`] - The main block cache
//! - [`Buffer`] - A slot in the pool holding a page + pin/dirty metadata
//! - [`PageGuard`] - RAII guard holding one pin
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - Eviction policy implementations

#[allow(clippy::module_inception)]
mod buffer;
mod buffer_pool_manager;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer::Buffer;
pub use buffer_pool_manager::BufferPoolManager;
pub use page_guard::PageGuard;
pub use stats::{BufferPoolStats, StatsSnapshot};
