//! Entry log record header

use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};

/// Encoded header size: len (4) + crc (4) + ledger id (8) + entry id (8)
pub const HEADER_SIZE: usize = 24;

/// Fixed-size header in front of every payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    /// Payload length
    pub len: u32,
    pub crc: u32,
    pub ledger_id: i64,
    pub entry_id: i64,
}

impl RecordHeader {
    /// Header describing `payload`
    pub fn for_entry(ledger_id: i64, entry_id: i64, payload: &[u8]) -> Result<Self> {
        let len = u32::try_from(payload.len()).map_err(|_| {
            StorageError::InvalidArgument(format!(
                "entry of {} bytes is too large for the entry log",
                payload.len()
            ))
        })?;

        Ok(Self {
            len,
            crc: Self::checksum(ledger_id, entry_id, payload),
            ledger_id,
            entry_id,
        })
    }

    pub fn checksum(ledger_id: i64, entry_id: i64, payload: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&ledger_id.to_le_bytes());
        hasher.update(&entry_id.to_le_bytes());
        hasher.update(payload);
        hasher.finalize()
    }

    /// Fixed-int little-endian encoding, always `HEADER_SIZE` bytes
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(StorageError::Corruption(format!(
                "record header needs {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }
        bincode::deserialize(&bytes[..HEADER_SIZE])
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Check `payload` against the stored length and checksum
    pub fn verify(&self, payload: &[u8]) -> Result<()> {
        if payload.len() != self.len as usize {
            return Err(StorageError::Corruption(format!(
                "ledger {} entry {}: expected {} payload bytes, got {}",
                self.ledger_id,
                self.entry_id,
                self.len,
                payload.len()
            )));
        }

        let actual = Self::checksum(self.ledger_id, self.entry_id, payload);
        if actual != self.crc {
            return Err(StorageError::Corruption(format!(
                "ledger {} entry {}: crc mismatch (stored {:#010x}, computed {:#010x})",
                self.ledger_id, self.entry_id, self.crc, actual
            )));
        }
        Ok(())
    }

    /// Total record size on disk
    pub fn record_size(&self) -> u64 {
        HEADER_SIZE as u64 + self.len as u64
    }
}
