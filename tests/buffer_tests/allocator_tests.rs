//! Tests for buffer allocators

use std::sync::Arc;

use bookie_storage::buffer::LimitedAllocator;
use bookie_storage::{BufferAllocator, HeapAllocator};

#[test]
fn test_heap_allocator_capacity() {
    let buf = HeapAllocator.allocate(4096).unwrap();
    assert!(buf.capacity() >= 4096);
    assert!(buf.is_empty());
}

#[test]
fn test_limited_allocator_budget() {
    let allocator = LimitedAllocator::new(100);

    assert!(allocator.allocate(60).is_some());
    assert_eq!(allocator.used(), 60);
    assert_eq!(allocator.remaining(), 40);

    assert!(allocator.allocate(41).is_none());
    assert_eq!(allocator.used(), 60);

    assert!(allocator.allocate(40).is_some());
    assert_eq!(allocator.remaining(), 0);
    assert!(allocator.allocate(1).is_none());
}

#[test]
fn test_limited_allocator_concurrent_budget() {
    let allocator = Arc::new(LimitedAllocator::new(1000));

    let granted: usize = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                s.spawn(move || (0..50).filter(|_| allocator.allocate(10).is_some()).count())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });

    assert_eq!(granted, 100);
    assert_eq!(allocator.used(), 1000);
}

#[test]
fn test_allocators_as_trait_objects() {
    let allocators: Vec<Arc<dyn BufferAllocator>> =
        vec![Arc::new(HeapAllocator), Arc::new(LimitedAllocator::new(16))];

    for allocator in &allocators {
        assert!(allocator.allocate(16).is_some());
    }
}
