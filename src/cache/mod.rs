//! Write Cache Module
//!
//! Write-back cache that absorbs entries before they reach the entry log.
//!
//! ## Responsibilities
//! - Copy incoming entries into pre-allocated segments (bump allocation)
//! - Ordered lookup by (ledger id, entry id)
//! - Track resident size/count for the "cache full, drain now" signal
//! - Ordered traversal for the flush path
//!
//! ## Data Structure Choice
//! Segments are fixed-size `BytesMut` arenas allocated when the cache is
//! built. A `put` bumps a cursor through them and the index records
//! (segment, offset, length). Reads copy the bytes out, so a returned `Bytes`
//! stays valid after `clear` rewinds the cursor and the region is reused.

mod write_cache;

pub use write_cache::WriteCache;

use bytes::Bytes;

use crate::error::Result;

/// Receives resident entries during [`WriteCache::for_each`] and [`WriteCache::drain`]
///
/// The traversal holds the cache exclusively. A consumer may call `get`,
/// `has_entry` or `get_last_entry` on the same cache; `put`, `for_each` and
/// `drain` fail with `InvalidArgument`, and `clear` or `close` would block
/// forever.
pub trait EntryConsumer {
    fn accept(&mut self, ledger_id: i64, entry_id: i64, entry: &Bytes) -> Result<()>;

    /// Called by `drain` after the last entry, before the cache is reset.
    /// An error here keeps every entry resident.
    fn complete(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<F> EntryConsumer for F
where
    F: FnMut(i64, i64, &Bytes) -> Result<()>,
{
    fn accept(&mut self, ledger_id: i64, entry_id: i64, entry: &Bytes) -> Result<()> {
        self(ledger_id, entry_id, entry)
    }
}
