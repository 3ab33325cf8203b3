//! Byte layout of a header followed by a trailing element array.

use core::{alloc::Layout, cmp::max, fmt, marker::PhantomData, mem};

use crate::error::OverflowError;

/// Layout of an allocation made of a header `H` at offset 0, followed by
/// `capacity` slots of `T`.
///
/// The element array starts at the first offset after the header satisfying `T` alignment;
/// the whole allocation is aligned for both types.
pub struct AllocationLayout<H, T> {
    size: usize,
    align: usize,
    elements_offset: usize,
    _phantom: PhantomData<fn() -> (H, T)>,
}

impl<H, T> fmt::Debug for AllocationLayout<H, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocationLayout")
            .field("size", &self.size)
            .field("align", &self.align)
            .field("elements_offset", &self.elements_offset)
            .finish()
    }
}

impl<H, T> Clone for AllocationLayout<H, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H, T> Copy for AllocationLayout<H, T> {}

impl<H, T> PartialEq for AllocationLayout<H, T> {
    fn eq(&self, other: &Self) -> bool {
        (self.size, self.align, self.elements_offset)
            == (other.size, other.align, other.elements_offset)
    }
}

impl<H, T> Eq for AllocationLayout<H, T> {}

impl<H, T> AllocationLayout<H, T> {
    /// Offset of the element array, i.e. `size_of::<H>()` rounded up to `align_of::<T>()`.
    pub fn elements_offset() -> Result<usize, OverflowError> {
        let align = mem::align_of::<T>();
        mem::size_of::<H>()
            .checked_add(align - 1)
            .map(|size| size & !(align - 1))
            .ok_or(OverflowError)
    }

    /// Computes the layout of an allocation holding `capacity` elements.
    ///
    /// Fails if the total size overflows `isize::MAX`, which is the limit
    /// of [`Layout`].
    pub fn new(capacity: usize) -> Result<Self, OverflowError> {
        let elements_offset = Self::elements_offset()?;
        let size = mem::size_of::<T>()
            .checked_mul(capacity)
            .and_then(|elements_size| elements_offset.checked_add(elements_size))
            .ok_or(OverflowError)?;
        let align = max(mem::align_of::<H>(), mem::align_of::<T>());
        // same check as `Layout::from_size_align`
        if size > isize::MAX as usize - (align - 1) {
            return Err(OverflowError);
        }
        Ok(Self {
            size,
            align,
            elements_offset,
            _phantom: PhantomData,
        })
    }

    /// Total size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Alignment of the allocation, the greatest of `H` and `T` alignments.
    pub fn align(&self) -> usize {
        self.align
    }

    /// Offset of the element array, see [`elements_offset`](Self::elements_offset).
    pub fn offset(&self) -> usize {
        self.elements_offset
    }

    /// Number of elements fitting in a block of `size` bytes with this layout alignment.
    ///
    /// Zero-sized elements never run out of room, so their capacity is `usize::MAX`.
    pub fn capacity_for_size(&self, size: usize) -> usize {
        match mem::size_of::<T>() {
            0 => usize::MAX,
            elem_size => size.saturating_sub(self.elements_offset) / elem_size,
        }
    }

    /// Converts into a [`Layout`] to request from an allocator.
    pub fn to_layout(&self) -> Layout {
        // SAFETY: `new` checks the same invariants as `Layout::from_size_align`,
        // and alignments are powers of two
        unsafe { Layout::from_size_align_unchecked(self.size, self.align) }
    }
}
