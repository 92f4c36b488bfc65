//! Entry log reader
//!
//! Sequential scan over records through [`BufferedChannel::read`].

use bytes::{Bytes, BytesMut};

use crate::channel::{BufferedChannel, FileStore};
use crate::error::{Result, StorageError};

use super::{RecordHeader, HEADER_SIZE};

/// A record read back from the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Offset of the record header
    pub offset: u64,
    pub ledger_id: i64,
    pub entry_id: i64,
    pub payload: Bytes,
}

/// Iterator over records from a starting offset up to the channel's end
///
/// Stops after the first error.
pub struct EntryLogReader<'a, S: FileStore> {
    channel: &'a BufferedChannel<S>,
    position: u64,
    failed: bool,
}

impl<'a, S: FileStore> EntryLogReader<'a, S> {
    /// Scan from the beginning of the log
    pub fn new(channel: &'a BufferedChannel<S>) -> Self {
        Self::from_offset(channel, 0)
    }

    pub fn from_offset(channel: &'a BufferedChannel<S>, offset: u64) -> Self {
        Self {
            channel,
            position: offset,
            failed: false,
        }
    }

    /// Read and verify the record at `offset`
    pub fn read_at(channel: &BufferedChannel<S>, offset: u64) -> Result<LogRecord> {
        let position = i64::try_from(offset).map_err(|_| {
            StorageError::InvalidArgument(format!("offset {} out of range", offset))
        })?;

        let mut header_bytes = BytesMut::with_capacity(HEADER_SIZE);
        channel.read(&mut header_bytes, position, HEADER_SIZE)?;
        let header = RecordHeader::decode(&header_bytes)?;

        let mut payload = BytesMut::with_capacity(header.len as usize);
        if header.len > 0 {
            channel.read(&mut payload, position + HEADER_SIZE as i64, header.len as usize)?;
        }
        header.verify(&payload)?;

        Ok(LogRecord {
            offset,
            ledger_id: header.ledger_id,
            entry_id: header.entry_id,
            payload: payload.freeze(),
        })
    }

    /// Offset of the next record to be read
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl<S: FileStore> Iterator for EntryLogReader<'_, S> {
    type Item = Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.position >= self.channel.file_channel_position() {
            return None;
        }

        match Self::read_at(self.channel, self.position) {
            Ok(record) => {
                self.position += HEADER_SIZE as u64 + record.payload.len() as u64;
                Some(Ok(record))
            }
            Err(e) => {
                tracing::warn!(offset = self.position, error = %e, "entry log scan stopped");
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
