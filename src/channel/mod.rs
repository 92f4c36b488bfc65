//! Buffered Channel Module
//!
//! Byte-exact buffering in front of a random-access file.
//!
//! ## Responsibilities
//! - Accumulate appends in a write buffer, flushing when it fills
//! - Serve reads from unflushed bytes, a read-ahead buffer, or the file
//! - Bound the number of unpersisted bytes (durability window)
//!
//! ## Layout
//! ```text
//!  0                 flushed_position()        file_channel_position()
//!  │ ◄──── on disk ────► │ ◄──── write buffer ────► │
//!  └─────────────────────┴──────────────────────────┘
//!        ▲ read-ahead window (subset of on-disk range)
//! ```

mod buffered;
mod store;

pub use buffered::BufferedChannel;
pub use store::{FileChannel, FileStore};
