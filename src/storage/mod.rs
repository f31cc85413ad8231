//! Storage layer - disk I/O and the page format.
//!
//! This module handles persistent storage:
//! - [`BlockStore`] - Interface the buffer pool reads and writes through
//! - [`DiskManager`] - File-backed block store
//! - [`Page`] - In-memory image of one block

mod block_store;
mod disk_manager;
mod page;

pub use block_store::BlockStore;
pub use disk_manager::DiskManager;
pub use page::Page;
