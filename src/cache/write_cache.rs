//! WriteCache implementation
//!
//! Pre-allocated segment arenas, a bump cursor, and a BTreeMap index of
//! locations, with atomic size/count.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use bytes::{Bytes, BytesMut};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::buffer::{self, BufferAllocator};
use crate::error::{Result, StorageError};

use super::EntryConsumer;

type EntryKey = (i64, i64);

/// Where an entry's bytes live inside the segments
#[derive(Debug, Clone, Copy)]
struct Location {
    segment: usize,
    offset: usize,
    len: usize,
}

/// Bump cursor: next free byte is `offset` inside `segment`
#[derive(Debug, Default)]
struct Cursor {
    segment: usize,
    offset: usize,
}

/// Write-back entry cache keyed by (ledger id, entry id)
///
/// ## Concurrency:
/// - `put`: any number of threads. Only the cursor bump runs under the
///   `cursor` mutex; the copy takes the target segment's write lock and the
///   publish takes the index write lock, each for just that step
/// - `get` / `has_entry` / `get_last_entry`: index read lock, plus the
///   segment read lock while copying the bytes out
/// - `for_each` / `drain` / `clear` / `close`: take the `gate` exclusively, so
///   no put interleaves with a traversal or a reset
/// - `size` / `count`: lock-free atomics
///
/// Lock order: gate → cursor → segment → index → deleted_ledgers
pub struct WriteCache {
    max_cache_size: u64,
    max_segment_size: usize,

    /// Fixed-size arenas, allocated up front; `len() == max_segment_size`
    segments: Vec<RwLock<BytesMut>>,
    /// Shared by puts, exclusive for traversals and resets
    gate: RwLock<()>,
    cursor: Mutex<Cursor>,
    index: RwLock<BTreeMap<EntryKey, Location>>,
    deleted_ledgers: RwLock<HashSet<i64>>,
    /// Thread currently running a consumer under the exclusive gate
    traversal: Mutex<Option<ThreadId>>,

    size: AtomicU64,
    count: AtomicU64,
    closed: AtomicBool,
}

impl WriteCache {
    /// Create an empty cache
    ///
    /// Allocates `ceil(max_cache_size / max_segment_size)` segments of
    /// `max_segment_size` bytes each. Fails with `AllocationFailed` if the
    /// allocator cannot provide all of them.
    pub fn new(
        allocator: Arc<dyn BufferAllocator>,
        max_cache_size: u64,
        max_segment_size: usize,
    ) -> Result<Self> {
        if max_cache_size == 0 {
            return Err(StorageError::Config(
                "write cache max size must be positive".to_string(),
            ));
        }
        if max_segment_size == 0 {
            return Err(StorageError::Config(
                "write cache segment size must be positive".to_string(),
            ));
        }

        let segment_count = max_cache_size.div_ceil(max_segment_size as u64) as usize;
        let mut segments = Vec::with_capacity(segment_count);
        for _ in 0..segment_count {
            let mut segment = buffer::allocate(allocator.as_ref(), max_segment_size)?;
            segment.resize(max_segment_size, 0);
            segments.push(RwLock::new(segment));
        }
        debug!(
            segments = segment_count,
            segment_size = max_segment_size,
            "allocated write cache segments"
        );

        Ok(Self {
            max_cache_size,
            max_segment_size,
            segments,
            gate: RwLock::new(()),
            cursor: Mutex::new(Cursor::default()),
            index: RwLock::new(BTreeMap::new()),
            deleted_ledgers: RwLock::new(HashSet::new()),
            traversal: Mutex::new(None),
            size: AtomicU64::new(0),
            count: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Copy `entry` into the cache
    ///
    /// Returns:
    /// - `Ok(true)` — entry stored (replacing any previous value for the key)
    /// - `Ok(false)` — cache full, nothing changed; the caller should drain
    /// - `Err(InvalidArgument)` — negative ledger or entry id, or called from
    ///   inside an [`EntryConsumer`] of this cache
    /// - `Err(Closed)` — the cache was closed
    pub fn put(&self, ledger_id: i64, entry_id: i64, entry: &[u8]) -> Result<bool> {
        if ledger_id < 0 {
            return Err(StorageError::InvalidArgument(format!(
                "negative ledger id {}",
                ledger_id
            )));
        }
        if entry_id < 0 {
            return Err(StorageError::InvalidArgument(format!(
                "negative entry id {}",
                entry_id
            )));
        }
        self.reject_reentry("put")?;

        let _gate = self.gate.read();
        self.ensure_open()?;

        let location = match self.reserve(entry.len()) {
            Some(location) => location,
            None => {
                debug!(ledger_id, entry_id, len = entry.len(), "write cache full, rejecting put");
                return Ok(false);
            }
        };

        {
            let mut segment = self.segments[location.segment].write();
            segment[location.offset..location.offset + location.len].copy_from_slice(entry);
        }

        let previous = self.index.write().insert((ledger_id, entry_id), location);
        match previous {
            Some(old) => {
                self.size.fetch_sub(old.len as u64, Ordering::AcqRel);
            }
            None => {
                self.count.fetch_add(1, Ordering::AcqRel);
            }
        }

        Ok(true)
    }

    /// Bump the cursor by `len` bytes and charge them to `size`
    ///
    /// Moves to the next segment when the current one lacks room; the tail
    /// left behind stays unused until the next reset.
    fn reserve(&self, len: usize) -> Option<Location> {
        if len > self.max_segment_size {
            return None;
        }

        let mut cursor = self.cursor.lock();
        if self.size.load(Ordering::Acquire) + len as u64 > self.max_cache_size {
            return None;
        }
        if self.max_segment_size - cursor.offset < len {
            if cursor.segment + 1 >= self.segments.len() {
                return None;
            }
            cursor.segment += 1;
            cursor.offset = 0;
        }

        let location = Location {
            segment: cursor.segment,
            offset: cursor.offset,
            len,
        };
        cursor.offset += len;
        self.size.fetch_add(len as u64, Ordering::AcqRel);
        Some(location)
    }

    /// Copy of the stored bytes for the key, without removing them
    pub fn get(&self, ledger_id: i64, entry_id: i64) -> Option<Bytes> {
        let index = self.index.read();
        let location = index.get(&(ledger_id, entry_id))?;
        Some(self.copy_out(location))
    }

    /// Entry with the highest entry id resident for `ledger_id`
    pub fn get_last_entry(&self, ledger_id: i64) -> Option<(i64, Bytes)> {
        let index = self.index.read();
        index
            .range((ledger_id, i64::MIN)..=(ledger_id, i64::MAX))
            .next_back()
            .map(|(&(_, entry_id), location)| (entry_id, self.copy_out(location)))
    }

    pub fn has_entry(&self, ledger_id: i64, entry_id: i64) -> bool {
        self.index.read().contains_key(&(ledger_id, entry_id))
    }

    // The index lock held by the caller keeps `location` from being recycled
    fn copy_out(&self, location: &Location) -> Bytes {
        let segment = self.segments[location.segment].read();
        Bytes::copy_from_slice(&segment[location.offset..location.offset + location.len])
    }

    /// Mark a ledger as deleted
    ///
    /// Deletion is deferred: the ledger's entries stay readable through `get`
    /// and stay counted in `size`/`count` until the next `clear`, but
    /// `for_each` no longer hands them to the flush path.
    pub fn delete_ledger(&self, ledger_id: i64) {
        self.deleted_ledgers.write().insert(ledger_id);
    }

    pub fn is_ledger_deleted(&self, ledger_id: i64) -> bool {
        self.deleted_ledgers.read().contains(&ledger_id)
    }

    /// Visit every resident entry of non-deleted ledgers
    ///
    /// Order is ascending by ledger id, then entry id. Puts wait until the
    /// traversal finishes. A consumer error stops the traversal and is returned.
    pub fn for_each<C>(&self, consumer: &mut C) -> Result<()>
    where
        C: EntryConsumer + ?Sized,
    {
        self.reject_reentry("for_each")?;
        let _gate = self.gate.write();
        let _traversal = TraversalGuard::enter(&self.traversal);

        self.visit(consumer)?;
        Ok(())
    }

    /// Hand every entry to `consumer`, then reset the cache
    ///
    /// Runs as one step with respect to `put`: nothing can be added between
    /// the traversal and the reset. If the consumer fails (in `accept` or
    /// `complete`) the cache is left untouched. Returns the number of entries
    /// handed over.
    pub fn drain<C>(&self, consumer: &mut C) -> Result<u64>
    where
        C: EntryConsumer + ?Sized,
    {
        self.reject_reentry("drain")?;
        let _gate = self.gate.write();
        let _traversal = TraversalGuard::enter(&self.traversal);

        let visited = self.visit(consumer)?;
        consumer.complete()?;

        self.reset();
        Ok(visited)
    }

    /// Feed the consumer in key order; caller holds the gate exclusively
    fn visit<C>(&self, consumer: &mut C) -> Result<u64>
    where
        C: EntryConsumer + ?Sized,
    {
        let entries: Vec<(EntryKey, Location)> = {
            let index = self.index.read();
            let deleted = self.deleted_ledgers.read();
            index
                .iter()
                .filter(|((ledger_id, _), _)| !deleted.contains(ledger_id))
                .map(|(key, location)| (*key, *location))
                .collect()
        };

        for ((ledger_id, entry_id), location) in &entries {
            let entry = self.copy_out(location);
            consumer.accept(*ledger_id, *entry_id, &entry)?;
        }
        Ok(entries.len() as u64)
    }

    /// Sum of resident entry lengths
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    /// Number of resident entries
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Segments allocated at construction
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Segments the cursor has written into since the last clear
    pub fn segments_in_use(&self) -> usize {
        let cursor = self.cursor.lock();
        if cursor.segment == 0 && cursor.offset == 0 {
            0
        } else {
            cursor.segment + 1
        }
    }

    pub fn max_cache_size(&self) -> u64 {
        self.max_cache_size
    }

    pub fn max_segment_size(&self) -> usize {
        self.max_segment_size
    }

    /// Drop every entry and rewind the cursor; segments are reused
    ///
    /// Must not be called from inside an [`EntryConsumer`] of this cache.
    pub fn clear(&self) {
        let _gate = self.gate.write();
        self.reset();
    }

    fn reset(&self) {
        let mut cursor = self.cursor.lock();
        self.index.write().clear();
        self.deleted_ledgers.write().clear();
        self.size.store(0, Ordering::Release);
        self.count.store(0, Ordering::Release);
        *cursor = Cursor::default();
    }

    /// Release all memory; idempotent
    pub fn close(&self) {
        let _gate = self.gate.write();
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.reset();
        for segment in &self.segments {
            *segment.write() = BytesMut::new();
        }
        debug!("write cache closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(StorageError::Closed("write cache"))
        } else {
            Ok(())
        }
    }

    /// A consumer re-entering the cache would wait on the gate it already holds
    fn reject_reentry(&self, operation: &str) -> Result<()> {
        if *self.traversal.lock() == Some(thread::current().id()) {
            warn!(operation, "write cache called from inside its own consumer");
            return Err(StorageError::InvalidArgument(format!(
                "{} called from inside an entry consumer",
                operation
            )));
        }
        Ok(())
    }
}

impl Drop for WriteCache {
    fn drop(&mut self) {
        self.close();
    }
}

/// Records the traversing thread for the lifetime of a consumer run
struct TraversalGuard<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
}

impl<'a> TraversalGuard<'a> {
    fn enter(slot: &'a Mutex<Option<ThreadId>>) -> Self {
        *slot.lock() = Some(thread::current().id());
        Self { slot }
    }
}

impl Drop for TraversalGuard<'_> {
    fn drop(&mut self) {
        *self.slot.lock() = None;
    }
}
