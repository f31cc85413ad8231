//! Common types and utilities shared across the engine.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`BufferPoolConfig`](config::BufferPoolConfig)
//! - Error types
//! - Identifiers (BlockId, FrameId, TxnId, Lsn)

mod block_id;
pub mod config;
pub mod error;
mod frame_id;

pub use block_id::BlockId;
pub use error::{Error, Result};
pub use frame_id::FrameId;

/// Transaction identifier attached to a buffer's pending write.
pub type TxnId = u64;

/// Log sequence number. Monotonically increasing per log record.
pub type Lsn = u64;
