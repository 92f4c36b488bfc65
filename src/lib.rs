//! # bookie-storage
//!
//! Local storage primitives for a log-storage bookie:
//! - Buffered file channel with read-ahead and a bounded durability window
//! - Write-back entry cache with segment (bump) allocation
//! - Flush path draining the cache into an append-only entry log
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Add-Entry Path                          │
//! │                 (many concurrent writers)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ put
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      WriteCache                              │
//! │          (segment arenas + ordered index)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ drain / for_each
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 EntryLogWriter / Flusher                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ write / flush / force
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   BufferedChannel                            │
//! │          (write buffer + read-ahead buffer)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       ▼
//!                  FileStore (file)
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod buffer;
pub mod channel;
pub mod cache;
pub mod entrylog;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use buffer::{BufferAllocator, HeapAllocator};
pub use cache::{EntryConsumer, WriteCache};
pub use channel::{BufferedChannel, FileChannel, FileStore};
pub use config::{ChannelConfig, Config, SyncPolicy};
pub use entrylog::{flush_write_cache, FlushStats};
pub use error::{Result, StorageError};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of bookie-storage
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
