use core::{
    fmt,
    marker::PhantomData,
    mem::MaybeUninit,
    ptr,
    ptr::{addr_of, addr_of_mut, NonNull},
    slice,
};

use crate::{
    allocator::{Global, RawAllocator},
    arc,
    arc::ArcInner,
    error::AllocErrorImpl,
    loom::sync::atomic::AtomicUsize,
    utils::{panic_capacity_exceeded, panic_out_of_bounds},
};

/// A single allocation holding a header `H` followed by `capacity` slots of `T`.
///
/// The first [`len`](Self::len) slots are initialized; the others are not. The capacity is
/// fixed when the allocation is created, growing requires a new allocation.
///
/// A `TailBuffer` is only reachable through a [`ManagedHandle`](crate::ManagedHandle):
/// shared references are obtained by dereferencing the handle, while mutable references
/// are only handed out once the handle is known to be the unique owner of the allocation.
pub struct TailBuffer<H, T, A: RawAllocator = Global> {
    inner: NonNull<ArcInner<H, A>>,
    _phantom: PhantomData<(ArcInner<H, A>, T)>,
}

unsafe impl<H: Send + Sync, T: Send + Sync, A: RawAllocator + Send + Sync> Send
    for TailBuffer<H, T, A>
{
}
unsafe impl<H: Send + Sync, T: Send + Sync, A: RawAllocator + Send + Sync> Sync
    for TailBuffer<H, T, A>
{
}

impl<H, T, A: RawAllocator> TailBuffer<H, T, A> {
    pub(crate) fn new_impl<E: AllocErrorImpl>(
        allocator: A,
        minimum_capacity: usize,
        header: impl FnOnce(usize) -> H,
    ) -> Result<Self, E> {
        let inner = arc::allocate::<H, T, A, E>(allocator, minimum_capacity, header)?;
        Ok(Self {
            inner,
            _phantom: PhantomData,
        })
    }

    pub(crate) unsafe fn from_inner(inner: NonNull<()>) -> Self {
        Self {
            inner: inner.cast(),
            _phantom: PhantomData,
        }
    }

    pub(crate) fn into_inner(self) -> NonNull<()> {
        let inner = self.inner.cast();
        core::mem::forget(self);
        inner
    }

    pub(crate) fn rc(&self) -> &AtomicUsize {
        unsafe { arc::ref_count(self.inner.cast()) }
    }

    pub(crate) fn retain(&self) -> Self {
        arc::retain(self.rc());
        Self {
            inner: self.inner,
            _phantom: PhantomData,
        }
    }

    pub(crate) fn allocator(&self) -> &A {
        unsafe { arc::allocator(self.inner) }
    }

    /// Number of element slots; it may exceed the capacity requested at creation.
    #[inline]
    pub fn capacity(&self) -> usize {
        unsafe { (*self.inner.as_ptr()).capacity }
    }

    /// Number of initialized elements.
    #[inline]
    pub fn len(&self) -> usize {
        unsafe { (*self.inner.as_ptr()).len }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn remaining_capacity(&self) -> usize {
        self.capacity() - self.len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    /// Address of the allocation, identifying it among live buffers.
    #[inline]
    pub fn as_ptr(&self) -> *const () {
        self.inner.as_ptr().cast_const().cast()
    }

    #[inline]
    pub fn header(&self) -> &H {
        unsafe { &*addr_of!((*self.inner.as_ptr()).header) }
    }

    #[inline]
    pub fn header_mut(&mut self) -> &mut H {
        unsafe { &mut *addr_of_mut!((*self.inner.as_ptr()).header) }
    }

    pub fn with_header<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(self.header())
    }

    pub fn with_header_mut<R>(&mut self, f: impl FnOnce(&mut H) -> R) -> R {
        f(self.header_mut())
    }

    fn elements_ptr(&self) -> NonNull<T> {
        arc::elements_ptr::<H, T, A>(self.inner)
    }

    /// The live elements.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.elements_ptr().as_ptr(), self.len()) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.elements_ptr().as_ptr(), self.len()) }
    }

    pub fn with_elements<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(self.as_slice())
    }

    pub fn with_elements_mut<R>(&mut self, f: impl FnOnce(&mut [T]) -> R) -> R {
        f(self.as_mut_slice())
    }

    /// Gives access to both the header and the live elements.
    pub fn with_parts_mut<R>(&mut self, f: impl FnOnce(&mut H, &mut [T]) -> R) -> R {
        let elements =
            unsafe { slice::from_raw_parts_mut(self.elements_ptr().as_ptr(), self.len()) };
        // the header and the elements don't overlap
        let header = unsafe { &mut *addr_of_mut!((*self.inner.as_ptr()).header) };
        f(header, elements)
    }

    /// Returns the element at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not in the live prefix.
    #[track_caller]
    pub fn element(&self, index: usize) -> &T {
        match self.as_slice().get(index) {
            Some(element) => element,
            None => panic_out_of_bounds(index, self.len()),
        }
    }

    /// The uninitialized slots following the live elements.
    pub fn spare_capacity_mut(&mut self) -> &mut [MaybeUninit<T>] {
        let len = self.len();
        let spare = self.capacity() - len;
        unsafe {
            let start = self.elements_ptr().as_ptr().add(len);
            slice::from_raw_parts_mut(start.cast(), spare)
        }
    }

    /// Sets the number of live elements.
    ///
    /// # Safety
    ///
    /// The first `len` slots must be initialized. Elements beyond `len` are not dropped.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the capacity.
    #[track_caller]
    pub unsafe fn set_len(&mut self, len: usize) {
        if len > self.capacity() {
            panic_capacity_exceeded(self.capacity());
        }
        unsafe { (*self.inner.as_ptr()).len = len };
    }

    /// Appends an element after the live ones.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is full; the buffer never reallocates by itself.
    #[track_caller]
    pub fn push(&mut self, value: T) {
        let len = self.len();
        if len == self.capacity() {
            panic_capacity_exceeded(self.capacity());
        }
        unsafe { self.elements_ptr().as_ptr().add(len).write(value) };
        unsafe { (*self.inner.as_ptr()).len = len + 1 };
    }

    /// Removes the last element, if any.
    pub fn pop(&mut self) -> Option<T> {
        let len = self.len().checked_sub(1)?;
        unsafe { (*self.inner.as_ptr()).len = len };
        Some(unsafe { self.elements_ptr().as_ptr().add(len).read() })
    }

    /// Drops the elements beyond `len`, if any.
    pub fn truncate(&mut self, len: usize) {
        let prev_len = self.len();
        if len >= prev_len {
            return;
        }
        // the length is updated first, so a panicking drop cannot cause a double drop
        unsafe { (*self.inner.as_ptr()).len = len };
        let tail = unsafe {
            ptr::slice_from_raw_parts_mut(self.elements_ptr().as_ptr().add(len), prev_len - len)
        };
        unsafe { ptr::drop_in_place(tail) };
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Appends clones of all the elements of `other`.
    ///
    /// # Panics
    ///
    /// Panics if `other` doesn't fit in the remaining capacity; nothing is appended then.
    #[track_caller]
    pub fn extend_from_slice(&mut self, other: &[T])
    where
        T: Clone,
    {
        if other.len() > self.remaining_capacity() {
            panic_capacity_exceeded(self.capacity());
        }
        for item in other {
            self.push(item.clone());
        }
    }
}

impl<H, T, A: RawAllocator> Drop for TailBuffer<H, T, A> {
    fn drop(&mut self) {
        if arc::release(self.rc()) {
            unsafe { arc::teardown::<H, T, A>(self.inner) };
        }
    }
}

impl<H: fmt::Debug, T: fmt::Debug, A: RawAllocator> fmt::Debug for TailBuffer<H, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TailBuffer")
            .field("header", self.header())
            .field("elements", &self.as_slice())
            .field("capacity", &self.capacity())
            .finish()
    }
}
