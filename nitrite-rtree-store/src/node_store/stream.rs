//! Backing streams for the node store.
//!
//! A backing stream is a random-access byte store with a cursor. The node
//! store owns exactly one stream and is its only writer. Two implementations
//! are provided:
//! - [`MemoryStream`]: a growable in-memory byte buffer
//! - [`FileStream`]: a file opened for read and write

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::store_constants::MIN_MEMORY_GROWTH;
use super::store_types::{StoreError, StoreResult};

/// Random-access byte store underlying a node store.
///
/// Every operation on a closed stream fails with [`StoreError::ChannelClosed`].
/// `seek` and `truncate` accept offsets in `[0, size]` only.
pub trait BackingStream {
    /// Reads into `buf` from the current position. Returns `None` at end of
    /// stream, otherwise the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> StoreResult<Option<usize>>;

    /// Writes `buf` at the current position, extending the stream if needed.
    fn write(&mut self, buf: &[u8]) -> StoreResult<usize>;

    fn position(&self) -> StoreResult<u64>;

    fn seek(&mut self, position: u64) -> StoreResult<()>;

    fn size(&self) -> StoreResult<u64>;

    fn truncate(&mut self, length: u64) -> StoreResult<()>;

    /// Releases the stream. Closing twice is a no-op.
    fn close(&mut self) -> StoreResult<()>;

    fn is_closed(&self) -> bool;

    /// Makes written bytes durable, where the medium supports it.
    fn sync(&mut self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::ChannelClosed);
        }
        Ok(())
    }

    /// Reads until `buf` is full or the stream ends; returns the bytes read.
    fn read_fully(&mut self, buf: &mut [u8]) -> StoreResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..])? {
                Some(0) | None => break,
                Some(n) => filled += n,
            }
        }
        Ok(filled)
    }

    fn write_all(&mut self, mut buf: &[u8]) -> StoreResult<()> {
        while !buf.is_empty() {
            let n = self.write(buf)?;
            if n == 0 {
                return Err(StoreError::Io(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "backing stream accepted no bytes",
                )));
            }
            buf = &buf[n..];
        }
        Ok(())
    }
}

fn check_range(position: u64, size: u64) -> StoreResult<()> {
    if position > size {
        Err(StoreError::OutOfRange { position, size })
    } else {
        Ok(())
    }
}

// ============================================================================
// In-memory stream
// ============================================================================

/// Growable in-memory stream.
///
/// `size` is the high-water mark of bytes ever written, not the capacity of
/// the underlying buffer. The contents survive [`BackingStream::close`] and
/// can be taken back with [`MemoryStream::into_inner`].
#[derive(Debug, Default)]
pub struct MemoryStream {
    data: Vec<u8>,
    len: usize,
    position: usize,
    closed: bool,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            len: 0,
            position: 0,
            closed: false,
        }
    }

    /// Wraps existing bytes, e.g. the contents of a previously closed stream.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let len = bytes.len();
        Self {
            data: bytes,
            len,
            position: 0,
            closed: false,
        }
    }

    /// Physical capacity of the buffer
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn into_inner(mut self) -> Vec<u8> {
        self.data.truncate(self.len);
        self.data
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed {
            Err(StoreError::ChannelClosed)
        } else {
            Ok(())
        }
    }

    fn grow(&mut self, required: usize) {
        let current = self.data.len();
        let new_capacity = required
            .max(current.saturating_mul(2))
            .max(current + MIN_MEMORY_GROWTH);
        log::trace!("Growing memory stream from {} to {} bytes", current, new_capacity);
        let mut grown = vec![0u8; new_capacity];
        grown[..self.len].copy_from_slice(&self.data[..self.len]);
        self.data = grown;
    }
}

impl BackingStream for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> StoreResult<Option<usize>> {
        self.ensure_open()?;
        if self.position >= self.len {
            return Ok(None);
        }
        let n = buf.len().min(self.len - self.position);
        buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        Ok(Some(n))
    }

    fn write(&mut self, buf: &[u8]) -> StoreResult<usize> {
        self.ensure_open()?;
        let end = self.position + buf.len();
        if end > self.data.len() {
            self.grow(end);
        }
        self.data[self.position..end].copy_from_slice(buf);
        self.position = end;
        self.len = self.len.max(end);
        Ok(buf.len())
    }

    fn position(&self) -> StoreResult<u64> {
        self.ensure_open()?;
        Ok(self.position as u64)
    }

    fn seek(&mut self, position: u64) -> StoreResult<()> {
        self.ensure_open()?;
        check_range(position, self.len as u64)?;
        self.position = position as usize;
        Ok(())
    }

    fn size(&self) -> StoreResult<u64> {
        self.ensure_open()?;
        Ok(self.len as u64)
    }

    fn truncate(&mut self, length: u64) -> StoreResult<()> {
        self.ensure_open()?;
        check_range(length, self.len as u64)?;
        let length = length as usize;
        self.data[length..self.len].fill(0);
        self.len = length;
        self.position = self.position.min(length);
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

// ============================================================================
// File stream
// ============================================================================

/// File-backed stream, opened for read and write.
pub struct FileStream {
    file: Option<File>,
    path: PathBuf,
    position: u64,
}

impl FileStream {
    /// Opens (creating if absent) and truncates the file at `path`.
    pub fn create(path: &Path) -> StoreResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::wrap(file, path))
    }

    /// Opens (creating if absent) the file at `path` without truncating it.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self::wrap(file, path))
    }

    fn wrap(file: File, path: &Path) -> Self {
        Self {
            file: Some(file),
            path: path.to_path_buf(),
            position: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file(&self) -> StoreResult<&File> {
        self.file.as_ref().ok_or(StoreError::ChannelClosed)
    }

    fn file_mut(&mut self) -> StoreResult<&mut File> {
        self.file.as_mut().ok_or(StoreError::ChannelClosed)
    }
}

impl BackingStream for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> StoreResult<Option<usize>> {
        let file = self.file_mut()?;
        if buf.is_empty() {
            return Ok(Some(0));
        }
        let n = file.read(buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.position += n as u64;
        Ok(Some(n))
    }

    fn write(&mut self, buf: &[u8]) -> StoreResult<usize> {
        let file = self.file_mut()?;
        let n = file.write(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn position(&self) -> StoreResult<u64> {
        self.file()?;
        Ok(self.position)
    }

    fn seek(&mut self, position: u64) -> StoreResult<()> {
        let size = self.size()?;
        check_range(position, size)?;
        self.file_mut()?.seek(SeekFrom::Start(position))?;
        self.position = position;
        Ok(())
    }

    fn size(&self) -> StoreResult<u64> {
        Ok(self.file()?.metadata()?.len())
    }

    fn truncate(&mut self, length: u64) -> StoreResult<()> {
        let size = self.size()?;
        check_range(length, size)?;
        self.file()?.set_len(length)?;
        if self.position > length {
            self.seek(length)?;
        }
        Ok(())
    }

    fn close(&mut self) -> StoreResult<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    fn sync(&mut self) -> StoreResult<()> {
        self.file()?.sync_all()?;
        Ok(())
    }
}
