//! Allocator implementations

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::BytesMut;

/// Produces mutable byte buffers on request
///
/// Returning `None` signals memory pressure. Implementations must be usable
/// from several threads at once.
pub trait BufferAllocator: Send + Sync {
    /// Allocate an empty buffer able to hold at least `capacity` bytes
    fn allocate(&self, capacity: usize) -> Option<BytesMut>;
}

/// Plain heap allocator, never reports pressure
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapAllocator;

impl BufferAllocator for HeapAllocator {
    fn allocate(&self, capacity: usize) -> Option<BytesMut> {
        Some(BytesMut::with_capacity(capacity))
    }
}

/// Heap allocator with a fixed byte budget
///
/// Once the budget is spent every further request returns `None`. Memory is
/// not credited back when buffers are dropped.
#[derive(Debug)]
pub struct LimitedAllocator {
    budget: u64,
    used: AtomicU64,
}

impl LimitedAllocator {
    pub fn new(budget: u64) -> Self {
        Self {
            budget,
            used: AtomicU64::new(0),
        }
    }

    /// Bytes handed out so far
    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Acquire)
    }

    pub fn remaining(&self) -> u64 {
        self.budget.saturating_sub(self.used())
    }
}

impl BufferAllocator for LimitedAllocator {
    fn allocate(&self, capacity: usize) -> Option<BytesMut> {
        let wanted = capacity as u64;
        let budget = self.budget;
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(wanted).filter(|total| *total <= budget)
            })
            .ok()
            .map(|_| BytesMut::with_capacity(capacity))
    }
}
