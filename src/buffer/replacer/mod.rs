//! Eviction policy implementations (replacers).
//!
//! A replacer tracks the frames whose pin count is zero and picks one to
//! evict when the free list is empty.
//!
//! Currently implements:
//! - [`LruReplacer`] - Least-recently-unpinned first

mod lru;

pub use lru::LruReplacer;

use crate::common::FrameId;

/// Victim-selection policy over unpinned frames.
///
/// Every operation is a no-op on frames in the wrong state (unpinning a
/// tracked frame, pinning or removing an untracked one).
pub trait Replacer: Send {
    /// Frame became an eviction candidate.
    fn unpin(&mut self, frame_id: FrameId);

    /// Frame is in use and must not be evicted.
    fn pin(&mut self, frame_id: FrameId);

    /// Remove and return the next frame to evict.
    fn victim(&mut self) -> Option<FrameId>;

    /// The frame `victim` would return, left in place.
    fn peek_victim(&self) -> Option<FrameId>;

    /// Drop a frame from candidacy without evicting it (page deleted).
    fn remove(&mut self, frame_id: FrameId);

    /// Number of eviction candidates.
    fn size(&self) -> usize;
}
