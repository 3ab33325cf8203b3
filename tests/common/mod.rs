#![allow(dead_code)]

use std::{
    alloc::{alloc, dealloc, Layout},
    ptr::{self, NonNull},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use managed_buffer::{error::AllocError, RawAllocator};

/// Counts the live instances of [`Tracked`] values created from it.
#[derive(Debug, Default, Clone)]
pub struct Tracker(Arc<AtomicUsize>);

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&self, value: usize) -> Tracked {
        self.0.fetch_add(1, Ordering::Relaxed);
        Tracked {
            value,
            tracker: self.clone(),
        }
    }

    pub fn instances(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct Tracked {
    pub value: usize,
    tracker: Tracker,
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        self.tracker.track(self.value)
    }
}

impl PartialEq for Tracked {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.tracker.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Header mirroring the buffer bookkeeping, like a growable container would.
#[derive(Debug, Clone)]
pub struct CountAndCapacity {
    pub count: Tracked,
    pub capacity: usize,
}

/// Allocator rounding every block up to a multiple of 64 bytes, and reporting it.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoundUp64;

fn round_up(layout: Layout) -> Layout {
    let size = (layout.size() + 63) & !63;
    Layout::from_size_align(size, layout.align()).unwrap()
}

unsafe impl RawAllocator for RoundUp64 {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let layout = round_up(layout);
        let ptr = NonNull::new(unsafe { alloc(layout) }).ok_or(AllocError)?;
        Ok(NonNull::new(ptr::slice_from_raw_parts_mut(ptr.as_ptr(), layout.size())).unwrap())
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { dealloc(ptr.as_ptr(), round_up(layout)) };
    }
}

/// Global allocator counting its live blocks; clones share the count.
#[derive(Debug, Default, Clone)]
pub struct Counting(Arc<AtomicUsize>);

impl Counting {
    pub fn live_blocks(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

unsafe impl RawAllocator for Counting {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        let ptr = NonNull::new(unsafe { alloc(layout) }).ok_or(AllocError)?;
        self.0.fetch_add(1, Ordering::Relaxed);
        Ok(NonNull::new(ptr::slice_from_raw_parts_mut(ptr.as_ptr(), layout.size())).unwrap())
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.0.fetch_sub(1, Ordering::Relaxed);
        unsafe { dealloc(ptr.as_ptr(), layout) };
    }
}

/// Allocator which always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct Failing;

unsafe impl RawAllocator for Failing {
    fn allocate(&self, _layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        Err(AllocError)
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        unreachable!()
    }
}
