use core::ptr::NonNull;

use crate::{
    allocator::RawAllocator, error::AllocErrorImpl, layout::AllocationLayout, utils::assert_checked,
};

/// A block allocated for at least the requested capacity.
pub(crate) struct Planned {
    pub(crate) ptr: NonNull<u8>,
    pub(crate) capacity: usize,
}

/// Allocates a block for `minimum_capacity` elements following a `H` prefix.
///
/// The slack granted by the allocator beyond the requested size is converted into additional
/// element slots, so the returned capacity may exceed the requested one, but never falls below.
pub(crate) fn plan<H, T, A: RawAllocator, E: AllocErrorImpl>(
    allocator: &A,
    minimum_capacity: usize,
) -> Result<Planned, E> {
    let layout = AllocationLayout::<H, T>::new(minimum_capacity)
        .map_err(|_| E::capacity_overflow())?;
    let block = E::alloc(allocator, layout.to_layout())?;
    assert_checked(block.len() >= layout.size());
    let capacity = layout.capacity_for_size(block.len());
    assert_checked(capacity >= minimum_capacity);
    Ok(Planned {
        ptr: block.cast(),
        capacity,
    })
}
