//! Entry log writer
//!
//! Appends cache entries as records through a buffered channel.

use bytes::{Bytes, BytesMut};

use crate::cache::EntryConsumer;
use crate::channel::{BufferedChannel, FileStore};
use crate::error::Result;

use super::{FlushStats, RecordHeader, HEADER_SIZE};

/// [`EntryConsumer`] that appends each entry to the log
///
/// `complete` flushes and forces the channel, so a successful
/// [`WriteCache::drain`](crate::WriteCache::drain) means the records are durable.
pub struct EntryLogWriter<'a, S: FileStore> {
    channel: &'a BufferedChannel<S>,
    stats: FlushStats,
}

impl<'a, S: FileStore> EntryLogWriter<'a, S> {
    pub fn new(channel: &'a BufferedChannel<S>) -> Self {
        let start = channel.file_channel_position();
        Self {
            channel,
            stats: FlushStats {
                start_position: start,
                end_position: start,
                ..FlushStats::default()
            },
        }
    }

    /// Append one record, returning its offset in the log
    ///
    /// Header and payload go to the channel as a single write.
    pub fn append(&mut self, ledger_id: i64, entry_id: i64, payload: &[u8]) -> Result<u64> {
        let header = RecordHeader::for_entry(ledger_id, entry_id, payload)?;
        let offset = self.channel.file_channel_position();

        let mut record = BytesMut::with_capacity(HEADER_SIZE + payload.len());
        record.extend_from_slice(&header.encode()?);
        record.extend_from_slice(payload);
        self.channel.write(&record)?;

        self.stats.entries += 1;
        self.stats.bytes += header.record_size();
        self.stats.end_position = self.channel.file_channel_position();
        Ok(offset)
    }

    pub fn stats(&self) -> FlushStats {
        self.stats
    }
}

impl<S: FileStore> EntryConsumer for EntryLogWriter<'_, S> {
    fn accept(&mut self, ledger_id: i64, entry_id: i64, entry: &Bytes) -> Result<()> {
        self.append(ledger_id, entry_id, entry).map(|_| ())
    }

    fn complete(&mut self) -> Result<()> {
        self.stats.end_position = self.channel.flush_and_force(false)?;
        Ok(())
    }
}
