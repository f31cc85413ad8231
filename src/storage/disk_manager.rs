//! Disk Manager - file-backed [`BlockStore`].
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing blocks
//! - Appending new blocks
//! - Caching open file handles

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::common::{BlockId, Error, Result};
use crate::storage::{BlockStore, Page};

/// Manages block I/O for every file inside one database directory.
///
/// # File Layout
/// Each file is a sequence of equally sized blocks:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │ Block 0 │ Block 1 │ Block 2 │  ...    │
/// └─────────┴─────────┴─────────┴─────────┘
/// Offset:  0    B        2B
/// ```
///
/// Block N is located at file offset `N × block_size`.
///
/// # Durability
/// Writes and appends are followed by `sync_data()`.
pub struct DiskManager {
    db_dir: PathBuf,
    block_size: usize,
    is_new: bool,
    open_files: Mutex<HashMap<String, File>>,
}

impl DiskManager {
    /// Open the database directory, creating it if it does not exist.
    pub fn new<P: AsRef<Path>>(db_dir: P, block_size: usize) -> Result<Self> {
        let db_dir = db_dir.as_ref().to_path_buf();
        let is_new = !db_dir.exists();
        if is_new {
            fs::create_dir_all(&db_dir)
                .map_err(|e| Error::io(format!("creating {}", db_dir.display()), e))?;
        }

        Ok(Self {
            db_dir,
            block_size,
            is_new,
            open_files: Mutex::new(HashMap::new()),
        })
    }

    /// Whether the directory was created by this manager.
    #[inline]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Directory holding the database files.
    pub fn db_dir(&self) -> &Path {
        &self.db_dir
    }

    /// Run `f` on the cached handle for `file_name`, opening it on first use.
    fn with_file<T>(
        &self,
        file_name: &str,
        f: impl FnOnce(&mut File) -> std::io::Result<T>,
    ) -> std::io::Result<T> {
        let mut files = self.open_files.lock();
        if !files.contains_key(file_name) {
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(self.db_dir.join(file_name))?;
            files.insert(file_name.to_string(), file);
        }
        let file = files
            .get_mut(file_name)
            .ok_or_else(|| std::io::Error::other("file handle missing after open"))?;
        f(file)
    }

    #[inline]
    fn offset(&self, block_num: u32) -> u64 {
        u64::from(block_num) * self.block_size as u64
    }
}

impl BlockStore for DiskManager {
    /// Reading at or past end-of-file yields zeros.
    fn read(&self, block: &BlockId, page: &mut Page) -> Result<()> {
        let offset = self.offset(block.block_num());
        let buf = page.as_mut_slice();

        self.with_file(block.file_name(), |file| {
            let len = file.metadata()?.len();
            let available = len.saturating_sub(offset).min(buf.len() as u64) as usize;

            if available > 0 {
                file.seek(SeekFrom::Start(offset))?;
                file.read_exact(&mut buf[..available])?;
            }
            buf[available..].fill(0);
            Ok(())
        })
        .map_err(|e| Error::io(format!("reading {}", block), e))
    }

    fn write(&self, block: &BlockId, page: &Page) -> Result<()> {
        let offset = self.offset(block.block_num());

        self.with_file(block.file_name(), |file| {
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(page.as_slice())?;
            file.sync_data()
        })
        .map_err(|e| Error::io(format!("writing {}", block), e))
    }

    fn append(&self, file_name: &str) -> Result<BlockId> {
        let block_size = self.block_size as u64;

        let block_num = self
            .with_file(file_name, |file| {
                let block_num = file.metadata()?.len() / block_size;
                file.seek(SeekFrom::Start(block_num * block_size))?;
                file.write_all(&vec![0u8; block_size as usize])?;
                file.sync_data()?;
                Ok(block_num)
            })
            .map_err(|e| Error::io(format!("appending to {}", file_name), e))?;

        let block_num = u32::try_from(block_num)
            .map_err(|_| Error::Corrupted(format!("{} exceeds the block limit", file_name)))?;
        Ok(BlockId::new(file_name, block_num))
    }

    fn block_count(&self, file_name: &str) -> Result<u32> {
        let len = self
            .with_file(file_name, |file| Ok(file.metadata()?.len()))
            .map_err(|e| Error::io(format!("reading length of {}", file_name), e))?;

        u32::try_from(len / self.block_size as u64)
            .map_err(|_| Error::Corrupted(format!("{} exceeds the block limit", file_name)))
    }

    #[inline]
    fn block_size(&self) -> usize {
        self.block_size
    }
}
