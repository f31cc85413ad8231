//! Write-ahead log authority.
//!
//! Buffers only need one guarantee from the log: every record up to a given
//! LSN is durable before a modified block reaches disk. [`LogManager`] is
//! that contract; [`FileLogManager`] is an append-only file implementing it.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;

use crate::common::{Error, Lsn, Result};

/// Guarantees durability of log records.
pub trait LogManager: Send + Sync {
    /// Return only once every record with LSN `<= lsn` is durable.
    fn flush(&self, lsn: Lsn) -> Result<()>;
}

/// Frame header: payload length + CRC32 of the payload.
const FRAME_HEADER_SIZE: usize = 8;

/// Append-only log file.
///
/// # Record Framing
/// ```text
/// ┌──────────────┬────────────────┬─────────────────┐
/// │ len: u32 LE  │ crc32: u32 LE  │ payload (len B) │
/// └──────────────┴────────────────┴─────────────────┘
/// ```
///
/// Records are buffered in memory by [`append`](Self::append) and written
/// on [`flush`](LogManager::flush). LSNs start at 1 and follow append order;
/// the n-th record in the file has LSN n.
pub struct FileLogManager {
    inner: Mutex<LogState>,
}

struct LogState {
    file: File,
    /// Encoded records not yet written to the file.
    pending: Vec<u8>,
    latest_lsn: Lsn,
    last_saved_lsn: Lsn,
}

impl FileLogManager {
    /// Open the log at `path`, creating it if missing.
    ///
    /// # Errors
    /// `Error::Corrupted` if an existing record fails its checksum.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| Error::io(format!("opening log {}", path.display()), e))?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| Error::io(format!("reading log {}", path.display()), e))?;
        let latest_lsn = count_records(&contents)?;

        Ok(Self {
            inner: Mutex::new(LogState {
                file,
                pending: Vec::new(),
                latest_lsn,
                last_saved_lsn: latest_lsn,
            }),
        })
    }

    /// Buffer `record` and return its LSN. Not durable until flushed.
    pub fn append(&self, record: &[u8]) -> Result<Lsn> {
        let len = u32::try_from(record.len())
            .map_err(|_| Error::Corrupted(format!("log record of {} bytes is too large", record.len())))?;

        let mut state = self.inner.lock();
        state.pending.extend_from_slice(&len.to_le_bytes());
        state
            .pending
            .extend_from_slice(&crc32fast::hash(record).to_le_bytes());
        state.pending.extend_from_slice(record);
        state.latest_lsn += 1;
        Ok(state.latest_lsn)
    }

    /// Make every appended record durable.
    pub fn flush_all(&self) -> Result<()> {
        let mut state = self.inner.lock();
        let lsn = state.latest_lsn;
        state.write_pending(lsn)
    }

    /// LSN of the most recently appended record (0 if none).
    pub fn latest_lsn(&self) -> Lsn {
        self.inner.lock().latest_lsn
    }

    /// Highest LSN known to be durable.
    pub fn last_saved_lsn(&self) -> Lsn {
        self.inner.lock().last_saved_lsn
    }
}

impl LogManager for FileLogManager {
    fn flush(&self, lsn: Lsn) -> Result<()> {
        let mut state = self.inner.lock();
        if lsn <= state.last_saved_lsn {
            return Ok(());
        }
        state.write_pending(lsn)
    }
}

impl LogState {
    fn write_pending(&mut self, lsn: Lsn) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let pending = &self.pending;
        let file = &mut self.file;
        let mut write = || -> std::io::Result<()> {
            file.seek(SeekFrom::End(0))?;
            file.write_all(pending)?;
            file.sync_data()
        };
        write().map_err(|source| Error::Log { lsn, source })?;

        self.pending.clear();
        self.last_saved_lsn = self.latest_lsn;
        Ok(())
    }
}

/// Validate every frame in `contents` and return how many there are.
fn count_records(contents: &[u8]) -> Result<Lsn> {
    let mut offset = 0;
    let mut count = 0;

    while offset < contents.len() {
        let header = contents
            .get(offset..offset + FRAME_HEADER_SIZE)
            .ok_or_else(|| Error::Corrupted(format!("truncated log frame header at byte {}", offset)))?;
        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let start = offset + FRAME_HEADER_SIZE;
        let payload = contents
            .get(start..start + len)
            .ok_or_else(|| Error::Corrupted(format!("truncated log record at byte {}", offset)))?;
        if crc32fast::hash(payload) != crc {
            return Err(Error::Corrupted(format!(
                "log record {} failed checksum",
                count + 1
            )));
        }

        offset = start + len;
        count += 1;
    }

    Ok(count)
}
