use core::{
    any::{type_name, TypeId},
    marker::PhantomData,
    mem,
    ptr::{self, addr_of, addr_of_mut, NonNull},
};

use crate::{
    allocator::RawAllocator,
    buffer::TailBuffer,
    capacity::{plan, Planned},
    error::AllocErrorImpl,
    layout::AllocationLayout,
    loom::sync::{
        atomic,
        atomic::{AtomicUsize, Ordering},
    },
    utils::UnwrapChecked,
};

// The structure needs to be repr(C), so the reference count is always at offset 0
// and can be reached from an erased pointer. Elements follow the structure at
// `AllocationLayout::<ArcInner<H, A>, T>::offset`.
#[repr(C)]
pub(crate) struct ArcInner<H, A> {
    rc: AtomicUsize,
    pub(crate) len: usize,
    pub(crate) capacity: usize,
    allocator: A,
    pub(crate) header: H,
}

type InnerLayout<H, T, A> = AllocationLayout<ArcInner<H, A>, T>;

const MAX_REFCOUNT: usize = isize::MAX as usize;

/// # Safety
///
/// `ptr` must point to a live `ArcInner`.
pub(crate) unsafe fn ref_count<'a>(ptr: NonNull<()>) -> &'a AtomicUsize {
    unsafe { ptr.cast::<AtomicUsize>().as_ref() }
}

pub(crate) fn retain(rc: &AtomicUsize) {
    // See `Arc` documentation
    let old_size = rc.fetch_add(1, Ordering::Relaxed);
    if old_size > MAX_REFCOUNT {
        refcount_overflow();
    }
}

/// Returns `true` if the released reference was the last one.
pub(crate) fn release(rc: &AtomicUsize) -> bool {
    // See `Arc` documentation
    if rc.fetch_sub(1, Ordering::Release) != 1 {
        return false;
    }
    atomic::fence(Ordering::Acquire);
    true
}

// Acquire pairs with the Release decrement of other references, so that their
// last reads happen before any write allowed by the verdict.
pub(crate) fn is_unique(rc: &AtomicUsize) -> bool {
    rc.load(Ordering::Acquire) == 1
}

pub(crate) fn count(rc: &AtomicUsize) -> usize {
    rc.load(Ordering::Relaxed)
}

#[cold]
fn refcount_overflow() -> ! {
    #[cfg(feature = "abort-on-refcount-overflow")]
    crate::utils::abort();
    #[cfg(not(feature = "abort-on-refcount-overflow"))]
    panic!("reference count overflow");
}

/// Allocates a block for at least `minimum_capacity` elements, and initializes its header
/// with the final capacity. All element slots are left uninitialized.
pub(crate) fn allocate<H, T, A: RawAllocator, E: AllocErrorImpl>(
    allocator: A,
    minimum_capacity: usize,
    header: impl FnOnce(usize) -> H,
) -> Result<NonNull<ArcInner<H, A>>, E> {
    let Planned { ptr, capacity } =
        plan::<ArcInner<H, A>, T, A, E>(&allocator, minimum_capacity)?;
    // releases the block if the header factory panics
    let guard = BlockGuard::<H, T, A> {
        ptr,
        capacity,
        allocator: &allocator,
        _phantom: PhantomData,
    };
    let header = header(capacity);
    mem::forget(guard);
    let inner = ptr.cast::<ArcInner<H, A>>();
    let arc_inner = ArcInner {
        rc: AtomicUsize::new(1),
        len: 0,
        capacity,
        allocator,
        header,
    };
    unsafe { inner.as_ptr().write(arc_inner) };
    Ok(inner)
}

struct BlockGuard<'a, H, T, A: RawAllocator> {
    ptr: NonNull<u8>,
    capacity: usize,
    allocator: &'a A,
    _phantom: PhantomData<fn() -> (H, T)>,
}

impl<H, T, A: RawAllocator> Drop for BlockGuard<'_, H, T, A> {
    fn drop(&mut self) {
        let layout = InnerLayout::<H, T, A>::new(self.capacity).unwrap_checked();
        unsafe { self.allocator.deallocate(self.ptr, layout.to_layout()) };
    }
}

pub(crate) fn elements_ptr<H, T, A>(inner: NonNull<ArcInner<H, A>>) -> NonNull<T> {
    let offset = InnerLayout::<H, T, A>::elements_offset().unwrap_checked();
    // the offset is in bounds of the block, even with a zero capacity
    unsafe { NonNull::new_unchecked(inner.as_ptr().cast::<u8>().add(offset).cast()) }
}

/// Allocator to use to copy the block.
///
/// # Safety
///
/// `inner` must point to a live `ArcInner`.
pub(crate) unsafe fn allocator<'a, H, A>(inner: NonNull<ArcInner<H, A>>) -> &'a A {
    unsafe { &*addr_of!((*inner.as_ptr()).allocator) }
}

/// Drops the live elements, then the header, and releases the block.
///
/// # Safety
///
/// The last reference to `inner` must have just been released.
pub(crate) unsafe fn teardown<H, T, A: RawAllocator>(inner: NonNull<ArcInner<H, A>>) {
    // the block is released even if an element drop panics
    struct Release<H, T, A: RawAllocator>(NonNull<ArcInner<H, A>>, PhantomData<fn() -> T>);
    impl<H, T, A: RawAllocator> Drop for Release<H, T, A> {
        fn drop(&mut self) {
            let inner = self.0.as_ptr();
            let capacity = unsafe { (*inner).capacity };
            unsafe { ptr::drop_in_place(addr_of_mut!((*inner).header)) };
            let allocator = unsafe { ptr::read(addr_of!((*inner).allocator)) };
            let layout = InnerLayout::<H, T, A>::new(capacity).unwrap_checked();
            unsafe { allocator.deallocate(self.0.cast(), layout.to_layout()) };
        }
    }
    // `len` is read once, before anything is dropped
    let len = unsafe { (*inner.as_ptr()).len };
    let release = Release::<H, T, A>(inner, PhantomData);
    let elements = ptr::slice_from_raw_parts_mut(elements_ptr::<H, T, A>(inner).as_ptr(), len);
    unsafe { ptr::drop_in_place(elements) };
    drop(release);
}

/// Type information of a block, recorded when its reference is erased.
#[derive(Debug)]
pub(crate) struct VTable {
    pub(crate) type_id: fn() -> TypeId,
    pub(crate) type_name: fn() -> &'static str,
    pub(crate) drop: unsafe fn(NonNull<()>),
}

impl VTable {
    pub(crate) fn new<H: 'static, T: 'static, A: RawAllocator + 'static>() -> &'static Self {
        &VTableOf::<H, T, A>::VTABLE
    }
}

struct VTableOf<H, T, A>(PhantomData<fn() -> (H, T, A)>);

impl<H: 'static, T: 'static, A: RawAllocator + 'static> VTableOf<H, T, A> {
    const VTABLE: VTable = VTable {
        type_id: TypeId::of::<TailBuffer<H, T, A>>,
        type_name: type_name::<TailBuffer<H, T, A>>,
        drop: Self::drop,
    };

    unsafe fn drop(ptr: NonNull<()>) {
        if release(unsafe { ref_count(ptr) }) {
            unsafe { teardown::<H, T, A>(ptr.cast()) };
        }
    }
}
