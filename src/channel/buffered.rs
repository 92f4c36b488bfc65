//! BufferedChannel implementation
//!
//! Write buffer and read-ahead buffer over a [`FileStore`].

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::buffer::{self, BufferAllocator};
use crate::config::ChannelConfig;
use crate::error::{Result, StorageError};

use super::FileStore;

/// Buffered channel over a single file
///
/// ## Concurrency:
/// - `write`: serialized by the caller (one logical writer), guarded by `write`
/// - `read`: may run concurrently with a writer. Unflushed bytes are copied
///   out under the write lock, so a reader sees either the whole of a write or
///   none of it
/// - Bytes below `flushed_position()` never change once flushed
pub struct BufferedChannel<S: FileStore> {
    store: S,

    write_capacity: usize,
    read_capacity: usize,
    unpersisted_bytes_bound: u64,

    write: Mutex<WriteState>,
    read: Mutex<ReadState>,

    /// Logical end of data (flushed + buffered)
    position: AtomicU64,
    /// End of on-disk content
    file_channel_position: AtomicU64,

    closed: AtomicBool,

    read_invocations: AtomicU64,
    read_cache_hits: AtomicU64,
}

struct WriteState {
    buffer: BytesMut,
    /// File offset where `buffer[0]` lands once flushed
    start: u64,
    unpersisted: u64,
}

struct ReadState {
    /// Valid bytes are `buffer[..]`; empty means no window
    buffer: BytesMut,
    start: u64,
}

impl WriteState {
    fn end(&self) -> u64 {
        self.start + self.buffer.len() as u64
    }
}

impl<S: FileStore> BufferedChannel<S> {
    /// Wrap `store`, appending from `start_position`
    ///
    /// Bytes already in the store below `start_position` are readable through
    /// the channel. Both buffers are taken from `allocator` up front.
    pub fn new(
        allocator: &dyn BufferAllocator,
        store: S,
        start_position: u64,
        config: &ChannelConfig,
    ) -> Result<Self> {
        config.validate()?;

        if !store.is_open() {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "file channel is closed",
            )));
        }

        let size = store.size()?;
        if start_position > size {
            return Err(StorageError::InvalidArgument(format!(
                "start position {} is past the end of the file ({} bytes)",
                start_position, size
            )));
        }

        let write_buffer = buffer::allocate(allocator, config.write_capacity)?;
        let read_buffer = buffer::allocate(allocator, config.read_capacity)?;

        Ok(Self {
            store,
            write_capacity: config.write_capacity,
            read_capacity: config.read_capacity,
            unpersisted_bytes_bound: config.unpersisted_bytes_bound,
            write: Mutex::new(WriteState {
                buffer: write_buffer,
                start: start_position,
                unpersisted: 0,
            }),
            read: Mutex::new(ReadState {
                buffer: read_buffer,
                start: 0,
            }),
            position: AtomicU64::new(start_position),
            file_channel_position: AtomicU64::new(start_position),
            closed: AtomicBool::new(false),
            read_invocations: AtomicU64::new(0),
            read_cache_hits: AtomicU64::new(0),
        })
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Append `src` at the logical end
    ///
    /// Flushes first when the write buffer lacks room; payloads larger than
    /// the write capacity go straight to the file. When the durability window
    /// is enabled and reached, the data is flushed and forced before returning.
    pub fn write(&self, src: &[u8]) -> Result<()> {
        let mut state = self.write.lock();
        self.ensure_open()?;
        if src.is_empty() {
            return Ok(());
        }

        if src.len() > self.write_capacity - state.buffer.len() {
            self.flush_locked(&mut state)?;
        }

        if src.len() > self.write_capacity {
            self.store.write_at(src, state.start)?;
            state.start += src.len() as u64;
            self.file_channel_position.store(state.start, Ordering::Release);
        } else {
            state.buffer.extend_from_slice(src);
        }

        self.position.store(state.end(), Ordering::Release);
        state.unpersisted += src.len() as u64;

        if self.unpersisted_bytes_bound > 0 && state.unpersisted >= self.unpersisted_bytes_bound {
            debug!(
                unpersisted = state.unpersisted,
                bound = self.unpersisted_bytes_bound,
                "durability window reached, forcing"
            );
            self.flush_locked(&mut state)?;
            self.force_locked(&mut state, false)?;
        }

        Ok(())
    }

    /// Write the whole write buffer to the file
    ///
    /// Does not force durability. No-op when nothing is buffered.
    pub fn flush(&self) -> Result<()> {
        self.ensure_open()?;
        let mut state = self.write.lock();
        self.flush_locked(&mut state)
    }

    /// Force flushed bytes to stable storage, returning the forced position
    pub fn force(&self, metadata: bool) -> Result<u64> {
        self.ensure_open()?;
        let mut state = self.write.lock();
        self.force_locked(&mut state, metadata)
    }

    /// Flush then force, returning the forced position
    pub fn flush_and_force(&self, metadata: bool) -> Result<u64> {
        self.ensure_open()?;
        let mut state = self.write.lock();
        self.flush_locked(&mut state)?;
        self.force_locked(&mut state, metadata)
    }

    fn flush_locked(&self, state: &mut WriteState) -> Result<()> {
        if state.buffer.is_empty() {
            return Ok(());
        }

        // Buffer stays intact if the write fails
        self.store.write_at(&state.buffer, state.start)?;

        let flushed = state.buffer.len();
        state.start += flushed as u64;
        state.buffer.clear();
        self.file_channel_position.store(state.start, Ordering::Release);

        debug!(bytes = flushed, position = state.start, "flushed write buffer");
        Ok(())
    }

    fn force_locked(&self, state: &mut WriteState, metadata: bool) -> Result<u64> {
        self.store.force(metadata)?;
        state.unpersisted = 0;
        Ok(state.start)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read exactly `length` bytes at `position` into `dest`
    ///
    /// Returns:
    /// - `Ok(length)` on success (`Ok(0)` for a zero-length read)
    /// - `Err(InvalidArgument)` for a negative position, a position at or past
    ///   the end of data, or a destination without room for `length` bytes
    /// - `Err(Io)` when `position + length` runs past the end of data or the
    ///   file came up short
    pub fn read<B>(&self, dest: &mut B, position: i64, length: usize) -> Result<usize>
    where
        B: BufMut + ?Sized,
    {
        self.read_invocations.fetch_add(1, Ordering::Relaxed);

        if position < 0 {
            return Err(StorageError::InvalidArgument(format!(
                "negative read position {}",
                position
            )));
        }
        if length == 0 {
            return Ok(0);
        }
        self.ensure_open()?;
        if dest.remaining_mut() < length {
            return Err(StorageError::InvalidArgument(format!(
                "destination has room for {} bytes, {} requested",
                dest.remaining_mut(),
                length
            )));
        }

        let pos = position as u64;

        // Copy out whatever is still buffered while holding the write lock
        let (disk_end, request_end, buffered) = {
            let state = self.write.lock();
            let end = state.end();

            if pos >= end {
                return Err(StorageError::InvalidArgument(format!(
                    "read position {} is at or beyond end of data {}",
                    pos, end
                )));
            }
            let request_end = match pos.checked_add(length as u64) {
                Some(e) if e <= end => e,
                _ => return Err(StorageError::read_past_end(pos, length, end)),
            };

            let buffered = if request_end > state.start {
                let from = (pos.max(state.start) - state.start) as usize;
                let to = (request_end - state.start) as usize;
                Bytes::copy_from_slice(&state.buffer[from..to])
            } else {
                Bytes::new()
            };
            (state.start, request_end, buffered)
        };

        if pos < disk_end {
            self.read_from_disk(dest, pos, request_end.min(disk_end), disk_end)?;
        }
        dest.put_slice(&buffered);

        Ok(length)
    }

    /// Copy `[pos, until)` of on-disk content through the read-ahead buffer
    fn read_from_disk<B>(&self, dest: &mut B, mut pos: u64, until: u64, disk_end: u64) -> Result<()>
    where
        B: BufMut + ?Sized,
    {
        let mut read = self.read.lock();
        let mut refilled = false;

        while pos < until {
            let window_end = read.start + read.buffer.len() as u64;
            if read.start <= pos && pos < window_end {
                let from = (pos - read.start) as usize;
                let n = (window_end.min(until) - pos) as usize;
                dest.put_slice(&read.buffer[from..from + n]);
                pos += n as u64;
            } else {
                self.fill_read_buffer(&mut read, pos, disk_end)?;
                refilled = true;
            }
        }

        if !refilled {
            self.read_cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn fill_read_buffer(&self, read: &mut ReadState, pos: u64, disk_end: u64) -> Result<()> {
        let want = (disk_end - pos).min(self.read_capacity as u64) as usize;

        read.buffer.clear();
        read.buffer.resize(want, 0);
        read.start = pos;

        let mut filled = 0;
        while filled < want {
            match self.store.read_at(&mut read.buffer[filled..], pos + filled as u64) {
                Ok(0) => {
                    read.buffer.clear();
                    warn!(
                        position = pos + filled as u64,
                        expected_end = disk_end,
                        "short read, file was truncated underneath the channel"
                    );
                    return Err(StorageError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "short read at {}: file ends before {}",
                            pos + filled as u64,
                            disk_end
                        ),
                    )));
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    read.buffer.clear();
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Positions and bookkeeping
    // =========================================================================

    /// Logical end of all data, flushed and buffered
    pub fn file_channel_position(&self) -> u64 {
        self.position.load(Ordering::Acquire)
    }

    /// End of the bytes already written to the file
    pub fn flushed_position(&self) -> u64 {
        self.file_channel_position.load(Ordering::Acquire)
    }

    /// Bytes written since the last force
    pub fn unpersisted_bytes(&self) -> u64 {
        self.write.lock().unpersisted
    }

    pub fn num_bytes_in_write_buffer(&self) -> usize {
        self.write.lock().buffer.len()
    }

    pub fn write_capacity(&self) -> usize {
        self.write_capacity
    }

    pub fn read_capacity(&self) -> usize {
        self.read_capacity
    }

    /// Number of `read` calls so far
    pub fn read_invocations(&self) -> u64 {
        self.read_invocations.load(Ordering::Relaxed)
    }

    /// Reads whose on-disk part was served without refilling the read-ahead buffer
    pub fn read_cache_hits(&self) -> u64 {
        self.read_cache_hits.load(Ordering::Relaxed)
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Discard unflushed bytes and the read-ahead window
    ///
    /// Call after the file was truncated or rewritten underneath the channel.
    pub fn clear(&self) {
        let mut state = self.write.lock();
        let discarded = state.buffer.len() as u64;
        state.buffer.clear();
        state.unpersisted = state.unpersisted.saturating_sub(discarded);
        self.position.store(state.start, Ordering::Release);
        self.read.lock().buffer.clear();
    }

    /// Cut the channel back to `position`, in the buffer and in the file
    ///
    /// Used to undo a partially written batch. Positions inside the write
    /// buffer only drop buffered bytes; anything lower also truncates the
    /// store and invalidates the read-ahead window. The in-memory state is
    /// rewound even if the store truncate fails, so the next write lands at
    /// `position` either way.
    pub fn truncate(&self, position: u64) -> Result<()> {
        let mut state = self.write.lock();
        self.ensure_open()?;

        let end = state.end();
        if position > end {
            return Err(StorageError::InvalidArgument(format!(
                "cannot truncate to {}, channel ends at {}",
                position, end
            )));
        }

        let dropped = end - position;
        state.unpersisted = state.unpersisted.saturating_sub(dropped);
        self.position.store(position, Ordering::Release);

        if position >= state.start {
            let keep = (position - state.start) as usize;
            state.buffer.truncate(keep);
            return Ok(());
        }

        state.buffer.clear();
        state.start = position;
        self.file_channel_position.store(position, Ordering::Release);
        self.read.lock().buffer.clear();
        debug!(position, dropped, "truncating channel");
        self.store.truncate(position)?;
        Ok(())
    }

    /// Flush pending bytes and release both buffers
    ///
    /// If the flush fails the channel stays open with its pending bytes
    /// intact, and the error is returned; calling `close` again retries.
    /// Once closed, `close` is a no-op and every other operation fails with
    /// `Closed`.
    pub fn close(&self) -> Result<()> {
        let mut state = self.write.lock();
        if self.is_closed() {
            return Ok(());
        }

        if let Err(e) = self.flush_locked(&mut state) {
            warn!(pending = state.buffer.len(), error = %e, "close could not flush, channel stays open");
            return Err(e);
        }

        self.closed.store(true, Ordering::Release);
        state.buffer = BytesMut::new();
        self.read.lock().buffer = BytesMut::new();
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(StorageError::Closed("buffered channel"))
        } else {
            Ok(())
        }
    }
}
