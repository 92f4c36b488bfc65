//! Buffer Allocation Module
//!
//! The allocator capability shared by the channel and the write cache.
//!
//! ## Responsibilities
//! - Hand out mutable byte buffers of a requested capacity
//! - Report memory pressure as an absent buffer instead of aborting
//!
//! Both consumers turn an absent buffer into
//! [`StorageError::AllocationFailed`](crate::StorageError::AllocationFailed).

mod allocator;

pub use allocator::{BufferAllocator, HeapAllocator, LimitedAllocator};

use bytes::BytesMut;

use crate::error::{Result, StorageError};

/// Allocate through `allocator`, mapping an absent buffer to an error
///
/// The returned buffer is always empty: whatever the allocator left in it
/// is discarded, its capacity is kept.
pub(crate) fn allocate(allocator: &dyn BufferAllocator, capacity: usize) -> Result<BytesMut> {
    match allocator.allocate(capacity) {
        Some(mut buf) if buf.capacity() >= capacity => {
            buf.clear();
            Ok(buf)
        }
        Some(buf) => {
            tracing::warn!(
                requested = capacity,
                got = buf.capacity(),
                "allocator returned an undersized buffer"
            );
            Err(StorageError::AllocationFailed { requested: capacity })
        }
        None => Err(StorageError::AllocationFailed { requested: capacity }),
    }
}
