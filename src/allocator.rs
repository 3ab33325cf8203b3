//! The memory allocator collaborator.
//!
//! A buffer only needs to allocate a block of at least the requested size, learn how many bytes
//! were actually granted, and release the block.

use core::{alloc::Layout, ptr, ptr::NonNull};

use crate::error::AllocError;

/// The low level trait implemented by allocators backing a buffer.
///
/// # Safety
///
/// - a block returned by [`allocate`] must be aligned on `layout.align()`, and valid for reads
///   and writes of the returned slice length, which must be greater or equal to
///   `layout.size()`.
/// - the block must stay valid until it is passed to [`deallocate`], on this allocator
///   or a clone of it.
///
/// [`allocate`]: Self::allocate
/// [`deallocate`]: Self::deallocate
pub unsafe trait RawAllocator {
    /// Allocates a block fitting `layout`, returning the whole granted block.
    ///
    /// `layout.size()` is never zero.
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError>;

    /// Releases a block.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`allocate`](Self::allocate) on this allocator,
    /// or a clone of it; `layout` must have the same alignment as the allocation request,
    /// and a size between the requested size and the granted one.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global memory allocator.
///
/// It always grants exactly the requested size.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Global;

unsafe impl RawAllocator for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        // SAFETY: buffer layouts are never zero-sized, as they include a reference count
        let ptr = NonNull::new(unsafe { alloc::alloc::alloc(layout) }).ok_or(AllocError)?;
        Ok(slice_ptr(ptr, layout.size()))
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

fn slice_ptr(ptr: NonNull<u8>, len: usize) -> NonNull<[u8]> {
    let slice = ptr::slice_from_raw_parts_mut(ptr.as_ptr(), len);
    // SAFETY: `ptr` is not null
    unsafe { NonNull::new_unchecked(slice) }
}

/// Adapter for allocators implementing `allocator_api2::alloc::Allocator`.
///
/// The granted size reported by the wrapped allocator is used to extend buffer capacity.
#[cfg(feature = "allocator-api2")]
#[derive(Debug, Default, Clone, Copy)]
pub struct ApiAllocator<A>(pub A);

#[cfg(feature = "allocator-api2")]
unsafe impl<A: allocator_api2::alloc::Allocator> RawAllocator for ApiAllocator<A> {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        self.0.allocate(layout).map_err(|_| AllocError)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { self.0.deallocate(ptr, layout) }
    }
}
