//! Entry Log Module
//!
//! The flush path: drains the write cache through a buffered channel into an
//! append-only entry log, and reads records back.
//!
//! ## Record Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ Record                                                      │
//! │ ┌─────────┬─────────┬─────────────┬────────────┬─────────┐ │
//! │ │ Len (4) │ CRC (4) │ Ledger (8)  │ Entry (8)  │ Payload │ │
//! │ └─────────┴─────────┴─────────────┴────────────┴─────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//! All integers little-endian. The CRC covers ledger id, entry id and payload.

mod flusher;
mod reader;
mod record;
mod writer;

pub use flusher::Flusher;
pub use reader::{EntryLogReader, LogRecord};
pub use record::{RecordHeader, HEADER_SIZE};
pub use writer::EntryLogWriter;

use crate::cache::WriteCache;
use crate::channel::{BufferedChannel, FileStore};
use crate::error::Result;

/// Outcome of one cache drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Entries written to the log
    pub entries: u64,
    /// Bytes appended, headers included
    pub bytes: u64,
    /// Log position before the first record
    pub start_position: u64,
    /// Log position after the last record (forced to stable storage)
    pub end_position: u64,
}

/// Drain `cache` into the entry log behind `channel`
///
/// Entries are appended in (ledger id, entry id) order, flushed and forced,
/// and only then removed from the cache. On failure the cache keeps its
/// entries and the log is cut back to where this flush started, so a retry
/// appends to a clean tail.
pub fn flush_write_cache<S: FileStore>(
    cache: &WriteCache,
    channel: &BufferedChannel<S>,
) -> Result<FlushStats> {
    let mut writer = EntryLogWriter::new(channel);
    let start = writer.stats().start_position;

    if let Err(e) = cache.drain(&mut writer) {
        tracing::warn!(start, error = %e, "write cache flush failed, rolling back entry log");
        if let Err(rollback) = channel.truncate(start) {
            tracing::warn!(start, error = %rollback, "entry log rollback failed");
        }
        return Err(e);
    }
    let stats = writer.stats();

    tracing::debug!(
        entries = stats.entries,
        bytes = stats.bytes,
        end = stats.end_position,
        "write cache flushed to entry log"
    );
    Ok(stats)
}
