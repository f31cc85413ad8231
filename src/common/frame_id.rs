//! Frame identifier type.

use std::fmt;

/// Index of a frame (buffer slot) in the pool.
///
/// Frames live in a `Vec<Buffer>` sized at construction, so a `FrameId`
/// is always a valid index into that vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub usize);

impl FrameId {
    #[inline]
    pub fn new(id: usize) -> Self {
        FrameId(id)
    }

    /// The frame's position in the frame array.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}
