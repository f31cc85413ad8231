//! Block identifier type.

use std::fmt;

/// Identifies one fixed-size block on disk: a file name plus the block's
/// position within that file.
///
/// Block `n` of a file lives at byte offset `n × block_size`. Block numbers
/// are handed out sequentially per file by the block store.
///
/// # Example
/// ```
/// use simpledb::BlockId;
///
/// let block = BlockId::new("students.tbl", 7);
/// assert_eq!(block.file_name(), "students.tbl");
/// assert_eq!(block.block_num(), 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    file_name: String,
    block_num: u32,
}

impl BlockId {
    /// Create a new BlockId.
    pub fn new(file_name: impl Into<String>, block_num: u32) -> Self {
        Self {
            file_name: file_name.into(),
            block_num,
        }
    }

    /// Name of the file holding this block.
    #[inline]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Position of this block within its file.
    #[inline]
    pub fn block_num(&self) -> u32 {
        self.block_num
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[file {}, block {}]", self.file_name, self.block_num)
    }
}
