//! Windowed buffer over the node records of a backing stream.
//!
//! The window mirrors one contiguous, record-aligned byte range of the
//! stream. Accessing a record inside the window costs no I/O. Accessing a
//! record outside it flushes the dirty part of the window and reloads the
//! window that covers the record.
//!
//! `dirty_len` is the highest local offset written since the last load, so
//! a flush writes back `[0, dirty_len)` and never drops a record written
//! earlier in the window than the most recent one.

use super::store_types::{StoreResult, StoreStats};
use super::stream::BackingStream;

/// Single live window over the record area of a stream.
pub struct NodeWindow {
    buffer: Vec<u8>,
    /// Stream offset mirrored by `buffer[0]`
    start: u64,
    /// High-water mark of bytes written since the window was loaded
    dirty_len: usize,
    cursor: usize,
    /// Offset of record 1; window starts are aligned relative to it
    begin_position: u64,
    record_size: usize,
    stats: StoreStats,
}

impl NodeWindow {
    /// Creates the window over record 1 and loads it. Its capacity is
    /// `target_capacity` rounded down to whole records, and never less than
    /// one record.
    pub fn open<S: BackingStream>(
        stream: &mut S,
        begin_position: u64,
        record_size: usize,
        target_capacity: usize,
    ) -> StoreResult<Self> {
        let records = (target_capacity / record_size).max(1);
        let mut window = Self {
            buffer: vec![0; records * record_size],
            start: begin_position,
            dirty_len: 0,
            cursor: 0,
            begin_position,
            record_size,
            stats: StoreStats::default(),
        };
        window.load(stream, begin_position)?;
        Ok(window)
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn dirty_len(&self) -> usize {
        self.dirty_len
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty_len > 0
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    pub fn begin_position(&self) -> u64 {
        self.begin_position
    }

    /// True if `[offset, offset + record_size)` lies inside the window.
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.start
            && offset + self.record_size as u64 <= self.start + self.capacity() as u64
    }

    /// Positions the cursor on the record at stream offset `record_offset`,
    /// moving the window first if the record lies outside it.
    pub fn prepare_access<S: BackingStream>(
        &mut self,
        stream: &mut S,
        record_offset: u64,
    ) -> StoreResult<()> {
        if self.contains(record_offset) {
            self.stats.window_hits += 1;
        } else {
            self.stats.window_misses += 1;
            let capacity = self.capacity() as u64;
            let relative = record_offset - self.begin_position;
            let start = self.begin_position + (relative / capacity) * capacity;
            self.reposition(stream, start)?;
        }
        self.cursor = (record_offset - self.start) as usize;
        Ok(())
    }

    /// The record under the cursor.
    pub fn record(&self) -> &[u8] {
        &self.buffer[self.cursor..self.cursor + self.record_size]
    }

    /// The record under the cursor, for writing. Marks it dirty.
    pub fn record_mut(&mut self) -> &mut [u8] {
        let end = self.cursor + self.record_size;
        self.dirty_len = self.dirty_len.max(end);
        &mut self.buffer[self.cursor..end]
    }

    /// Writes `[0, dirty_len)` back to the stream at the window start.
    ///
    /// If the window starts past the end of the stream, the gap is filled
    /// with zeros first.
    pub fn flush<S: BackingStream>(&mut self, stream: &mut S) -> StoreResult<()> {
        if self.dirty_len == 0 {
            return Ok(());
        }

        let size = stream.size()?;
        if self.start > size {
            stream.seek(size)?;
            let zeros = vec![0u8; self.capacity()];
            let mut gap = self.start - size;
            while gap > 0 {
                let n = gap.min(zeros.len() as u64) as usize;
                stream.write_all(&zeros[..n])?;
                self.stats.bytes_written += n as u64;
                gap -= n as u64;
            }
        } else {
            stream.seek(self.start)?;
        }
        stream.write_all(&self.buffer[..self.dirty_len])?;

        log::trace!(
            "Flushed {} bytes of window at offset {}",
            self.dirty_len,
            self.start
        );
        self.stats.bytes_written += self.dirty_len as u64;
        self.stats.flushes += 1;
        self.dirty_len = 0;
        Ok(())
    }

    /// Flushes the window and reloads it at `start`.
    pub fn reposition<S: BackingStream>(&mut self, stream: &mut S, start: u64) -> StoreResult<()> {
        self.flush(stream)?;
        self.load(stream, start)
    }

    /// Flushes the window and reloads it where it is.
    pub fn reload<S: BackingStream>(&mut self, stream: &mut S) -> StoreResult<()> {
        self.reposition(stream, self.start)
    }

    /// Flushes the window and moves it back to record 1.
    pub fn rewind<S: BackingStream>(&mut self, stream: &mut S) -> StoreResult<()> {
        self.reposition(stream, self.begin_position)
    }

    /// Drops the window contents without writing them back, e.g. after the
    /// records were truncated away.
    pub fn discard(&mut self) {
        self.buffer.fill(0);
        self.start = self.begin_position;
        self.dirty_len = 0;
        self.cursor = 0;
    }

    fn load<S: BackingStream>(&mut self, stream: &mut S, start: u64) -> StoreResult<()> {
        self.buffer.fill(0);
        self.start = start;
        self.dirty_len = 0;
        self.cursor = 0;

        let size = stream.size()?;
        if start < size {
            stream.seek(start)?;
            let n = stream.read_fully(&mut self.buffer)?;
            self.stats.bytes_read += n as u64;
            log::trace!("Loaded window at offset {} ({} bytes)", start, n);
        } else {
            log::trace!("Window at offset {} is past the end of the stream", start);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_store::stream::MemoryStream;

    const HEADER: u64 = 10;

    fn stream_with_header() -> MemoryStream {
        let mut stream = MemoryStream::new();
        stream.write_all(&[0xAA; HEADER as usize]).unwrap();
        stream
    }

    fn offset(id: u64, record_size: usize) -> u64 {
        HEADER + (id - 1) * record_size as u64
    }

    #[test]
    fn test_capacity_is_record_aligned() {
        let mut stream = stream_with_header();
        let window = NodeWindow::open(&mut stream, HEADER, 49, 4096).unwrap();
        assert_eq!(window.capacity(), 83 * 49);
        let tiny = NodeWindow::open(&mut stream, HEADER, 49, 10).unwrap();
        assert_eq!(tiny.capacity(), 49);
    }

    #[test]
    fn test_hit_has_no_io() {
        let mut stream = stream_with_header();
        let mut window = NodeWindow::open(&mut stream, HEADER, 8, 32).unwrap();
        window.prepare_access(&mut stream, offset(1, 8)).unwrap();
        window.prepare_access(&mut stream, offset(4, 8)).unwrap();
        assert_eq!(window.stats().window_hits, 2);
        assert_eq!(window.stats().window_misses, 0);
        window.prepare_access(&mut stream, offset(5, 8)).unwrap();
        assert_eq!(window.stats().window_misses, 1);
        assert_eq!(window.start(), offset(5, 8));
    }

    #[test]
    fn test_open_loads_existing_records() {
        let mut stream = stream_with_header();
        stream.write_all(&[4, 4, 4, 4, 5, 5, 5, 5]).unwrap();
        let mut window = NodeWindow::open(&mut stream, HEADER, 4, 8).unwrap();
        assert_eq!(window.stats().bytes_read, 8);
        window.prepare_access(&mut stream, offset(2, 4)).unwrap();
        assert_eq!(window.record(), &[5; 4]);
    }

    #[test]
    fn test_write_then_read_across_reload() {
        let mut stream = stream_with_header();
        let mut window = NodeWindow::open(&mut stream, HEADER, 4, 8).unwrap();

        window.prepare_access(&mut stream, offset(1, 4)).unwrap();
        window.record_mut().copy_from_slice(&[1, 1, 1, 1]);
        window.prepare_access(&mut stream, offset(2, 4)).unwrap();
        window.record_mut().copy_from_slice(&[2, 2, 2, 2]);

        // record 5 forces the window out; records 1 and 2 must be flushed
        window.prepare_access(&mut stream, offset(5, 4)).unwrap();
        window.record_mut().copy_from_slice(&[5, 5, 5, 5]);

        window.prepare_access(&mut stream, offset(1, 4)).unwrap();
        assert_eq!(window.record(), &[1, 1, 1, 1]);
        window.prepare_access(&mut stream, offset(2, 4)).unwrap();
        assert_eq!(window.record(), &[2, 2, 2, 2]);
        window.prepare_access(&mut stream, offset(5, 4)).unwrap();
        assert_eq!(window.record(), &[5, 5, 5, 5]);
    }

    #[test]
    fn test_dirty_len_keeps_earlier_writes() {
        let mut stream = stream_with_header();
        let mut window = NodeWindow::open(&mut stream, HEADER, 4, 16).unwrap();

        window.prepare_access(&mut stream, offset(3, 4)).unwrap();
        window.record_mut().copy_from_slice(&[3; 4]);
        window.prepare_access(&mut stream, offset(1, 4)).unwrap();
        window.record_mut().copy_from_slice(&[1; 4]);
        assert_eq!(window.dirty_len(), 12);

        window.flush(&mut stream).unwrap();
        let bytes = stream.as_bytes();
        assert_eq!(&bytes[10..14], &[1; 4]);
        assert_eq!(&bytes[14..18], &[0; 4]);
        assert_eq!(&bytes[18..22], &[3; 4]);
        assert!(!window.is_dirty());
    }

    #[test]
    fn test_flush_past_end_fills_gap() {
        let mut stream = stream_with_header();
        let mut window = NodeWindow::open(&mut stream, HEADER, 4, 8).unwrap();

        window.prepare_access(&mut stream, offset(6, 4)).unwrap();
        assert_eq!(window.start(), offset(5, 4));
        window.record_mut().copy_from_slice(&[6; 4]);
        window.flush(&mut stream).unwrap();

        assert_eq!(stream.size().unwrap(), offset(7, 4));
        let bytes = stream.as_bytes();
        assert_eq!(&bytes[10..30], &[0; 20]);
        assert_eq!(&bytes[30..34], &[6; 4]);
        // header untouched
        assert_eq!(&bytes[..10], &[0xAA; 10]);
    }

    #[test]
    fn test_rewind_flushes_and_returns_to_first_window() {
        let mut stream = stream_with_header();
        let mut window = NodeWindow::open(&mut stream, HEADER, 4, 8).unwrap();
        window.prepare_access(&mut stream, offset(9, 4)).unwrap();
        window.record_mut().copy_from_slice(&[9; 4]);
        window.rewind(&mut stream).unwrap();
        assert_eq!(window.start(), HEADER);
        assert!(!window.is_dirty());
        assert_eq!(&stream.as_bytes()[42..46], &[9; 4]);
    }

    #[test]
    fn test_discard() {
        let mut stream = stream_with_header();
        let mut window = NodeWindow::open(&mut stream, HEADER, 4, 8).unwrap();
        window.prepare_access(&mut stream, offset(3, 4)).unwrap();
        window.record_mut().copy_from_slice(&[3; 4]);
        window.discard();
        assert!(!window.is_dirty());
        assert_eq!(window.start(), HEADER);
        window.flush(&mut stream).unwrap();
        assert_eq!(stream.size().unwrap(), HEADER);
    }
}
