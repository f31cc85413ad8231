//! Error types for the storage engine.

use thiserror::Error;

use crate::common::{BlockId, Lsn};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the buffer pool and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the block store, wrapped with what was being attempted.
    #[error("I/O error while {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The log authority could not make records durable up to `lsn`.
    #[error("failed to flush log up to LSN {lsn}: {source}")]
    Log {
        lsn: Lsn,
        #[source]
        source: std::io::Error,
    },

    /// Free list is empty and the replacer has no eviction candidate.
    #[error("no available frame")]
    NoAvailableFrame,

    /// Every frame has a pin count above zero.
    #[error("all pages are pinned")]
    AllPinned,

    /// Unpin without a matching pin.
    #[error("protocol violation: {0} unpinned more times than it was pinned")]
    ProtocolViolation(BlockId),

    /// A page field access fell outside the page.
    #[error("page access out of bounds: offset {offset} + {len} bytes exceeds page size {size}")]
    PageOutOfBounds {
        offset: usize,
        len: usize,
        size: usize,
    },

    /// A string field did not hold valid UTF-8.
    #[error("invalid UTF-8 in page string field: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// A write-back could not take the page latch in time.
    #[error("timed out waiting for the latch on {0}")]
    LatchTimeout(BlockId),

    /// Buffer pool was configured with zero frames.
    #[error("buffer pool size must be greater than zero")]
    InvalidPoolSize,

    /// On-disk data failed validation.
    #[error("corrupted data: {0}")]
    Corrupted(String),
}

impl Error {
    /// Wrap an I/O error with context describing the failed operation.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    /// Whether the pool ran out of frames (either the full-scan guard or
    /// an exhausted free list and replacer).
    pub fn is_no_available_frame(&self) -> bool {
        matches!(self, Error::NoAvailableFrame | Error::AllPinned)
    }
}
