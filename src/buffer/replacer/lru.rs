//! LRU (Least-Recently-Unpinned) replacement policy.

use linked_hash_map::LinkedHashMap;

use crate::buffer::replacer::Replacer;
use crate::common::FrameId;

/// Evicts the frame that became unpinned longest ago.
///
/// Candidates are kept in a linked hash map in unpin order (front = oldest),
/// so pin, unpin, remove and victim are all O(1).
pub struct LruReplacer {
    candidates: LinkedHashMap<FrameId, ()>,
}

impl LruReplacer {
    /// Create a replacer sized for `pool_size` frames.
    pub fn new(pool_size: usize) -> Self {
        Self {
            candidates: LinkedHashMap::with_capacity(pool_size),
        }
    }
}

impl Replacer for LruReplacer {
    fn unpin(&mut self, frame_id: FrameId) {
        // Re-unpinning must not refresh recency
        if !self.candidates.contains_key(&frame_id) {
            self.candidates.insert(frame_id, ());
        }
    }

    fn pin(&mut self, frame_id: FrameId) {
        self.candidates.remove(&frame_id);
    }

    fn victim(&mut self) -> Option<FrameId> {
        self.candidates.pop_front().map(|(frame_id, ())| frame_id)
    }

    fn peek_victim(&self) -> Option<FrameId> {
        self.candidates.front().map(|(&frame_id, ())| frame_id)
    }

    fn remove(&mut self, frame_id: FrameId) {
        self.candidates.remove(&frame_id);
    }

    fn size(&self) -> usize {
        self.candidates.len()
    }
}
