use core::{convert::Infallible, fmt, ops::Deref, ptr::NonNull};

use crate::{
    allocator::{Global, RawAllocator},
    any::AnyBuffer,
    arc::VTable,
    buffer::TailBuffer,
    error::{AllocErrorImpl, ContractViolation, TryCreateError, TypeMismatchError},
    unique::{self, NativeCount, NativelyOwned, Owned, Ownership},
    utils::panic_contract,
};

/// A reference to a [`TailBuffer`] allocation, with copy-on-write semantics.
///
/// Cloning a handle only increments the reference count of the allocation, it never copies
/// the elements. Mutations go through [`mutate`](Self::mutate) or [`make_mut`](Self::make_mut),
/// which copy the allocation first if another reference exists, so other handles never
/// observe the mutation.
///
/// # Examples
///
/// ```rust
/// use managed_buffer::ManagedHandle;
///
/// let mut a = ManagedHandle::<usize, i32>::new(4, |capacity| capacity);
/// a.mutate(|buffer| buffer.extend_from_slice(&[1, 2, 3]));
/// let mut b = a.clone();
/// assert!(!a.is_unique());
///
/// b.mutate(|buffer| buffer.push(4));
/// assert_eq!(a.as_slice(), [1, 2, 3]);
/// assert_eq!(b.as_slice(), [1, 2, 3, 4]);
/// assert!(a.is_unique() && b.is_unique());
/// ```
pub struct ManagedHandle<H, T, A: RawAllocator = Global> {
    buffer: TailBuffer<H, T, A>,
}

impl<H, T> ManagedHandle<H, T> {
    /// Allocates a buffer for at least `minimum_capacity` elements.
    ///
    /// `header` is called once with the actual capacity, which may be greater than the
    /// requested one.
    ///
    /// # Panics
    ///
    /// Panics if the allocation size overflows, and calls
    /// [`handle_alloc_error`](alloc::alloc::handle_alloc_error) on allocation failure.
    pub fn new(minimum_capacity: usize, header: impl FnOnce(usize) -> H) -> Self {
        Self::new_in(minimum_capacity, Global, header)
    }

    /// Allocates a buffer for at least `minimum_capacity` elements, returning an error
    /// instead of panicking on failure.
    pub fn try_new(
        minimum_capacity: usize,
        header: impl FnOnce(usize) -> H,
    ) -> Result<Self, TryCreateError> {
        Self::try_new_in(minimum_capacity, Global, header)
    }
}

impl<H, T, A: RawAllocator> ManagedHandle<H, T, A> {
    fn new_impl<E: AllocErrorImpl>(
        minimum_capacity: usize,
        allocator: A,
        header: impl FnOnce(usize) -> H,
    ) -> Result<Self, E> {
        let buffer = TailBuffer::new_impl::<E>(allocator, minimum_capacity, header)?;
        Ok(Self { buffer })
    }

    /// Same as [`new`](ManagedHandle::new), with the given allocator.
    pub fn new_in(minimum_capacity: usize, allocator: A, header: impl FnOnce(usize) -> H) -> Self {
        match Self::new_impl::<Infallible>(minimum_capacity, allocator, header) {
            Ok(this) => this,
            Err(err) => match err {},
        }
    }

    /// Same as [`try_new`](ManagedHandle::try_new), with the given allocator.
    pub fn try_new_in(
        minimum_capacity: usize,
        allocator: A,
        header: impl FnOnce(usize) -> H,
    ) -> Result<Self, TryCreateError> {
        Self::new_impl::<TryCreateError>(minimum_capacity, allocator, header)
    }

    /// Returns `true` if this handle is the only reference to its allocation.
    ///
    /// The result may change as soon as the handle is cloned, or a clone is dropped.
    #[inline]
    pub fn is_unique(&self) -> bool {
        unique::is_unique_native(self)
    }

    /// Snapshot of the number of references to the allocation.
    #[inline]
    pub fn ref_count(this: &Self) -> usize {
        this.native_count().get()
    }

    /// Returns a mutable reference to the buffer if this handle is the unique reference.
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut TailBuffer<H, T, A>> {
        if self.is_unique() {
            Some(&mut self.buffer)
        } else {
            None
        }
    }

    /// Returns `true` if both handles reference the same allocation.
    #[inline]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.buffer.as_ptr() == other.buffer.as_ptr()
    }

    /// Consumes the handle without releasing its reference.
    ///
    /// The pointer can be given to [`unique::is_unique_raw`], and must be given back to
    /// [`from_raw`](Self::from_raw) to avoid a leak.
    pub fn into_raw(this: Self) -> NonNull<()> {
        this.buffer.into_inner()
    }

    /// # Safety
    ///
    /// `ptr` must have been returned by [`into_raw`](Self::into_raw) on a handle with the same
    /// type parameters, and must not be used again.
    pub unsafe fn from_raw(ptr: NonNull<()>) -> Self {
        Self {
            buffer: unsafe { TailBuffer::from_inner(ptr) },
        }
    }
}

impl<H: Clone, T: Clone, A: RawAllocator + Clone> ManagedHandle<H, T, A> {
    fn copy_impl<E: AllocErrorImpl>(&self, minimum_capacity: usize) -> Result<Self, E> {
        let len = self.len();
        if minimum_capacity < len {
            panic_contract(ContractViolation::CapacityTooSmall {
                capacity: minimum_capacity,
                len,
            });
        }
        let header = self.header().clone();
        let allocator = self.buffer.allocator().clone();
        let mut copy = Self::new_impl::<E>(minimum_capacity, allocator, |_| header)?;
        // elements are pushed one by one, so a panicking clone only drops the copied ones
        copy.buffer.extend_from_slice(self.as_slice());
        Ok(copy)
    }

    /// Copies the header and the elements into a new allocation of at least
    /// `minimum_capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `minimum_capacity` is lower than the buffer length.
    #[track_caller]
    pub fn copy_with_capacity(&self, minimum_capacity: usize) -> Self {
        match self.copy_impl::<Infallible>(minimum_capacity) {
            Ok(this) => this,
            Err(err) => match err {},
        }
    }

    /// Same as [`copy_with_capacity`](Self::copy_with_capacity), returning an error on
    /// allocation failure.
    #[track_caller]
    pub fn try_copy_with_capacity(&self, minimum_capacity: usize) -> Result<Self, TryCreateError> {
        self.copy_impl::<TryCreateError>(minimum_capacity)
    }

    /// Returns a mutable reference to the buffer, copying it first if it is shared.
    ///
    /// Other handles keep referencing the previous allocation, unmodified.
    ///
    /// The copy requests the current capacity, but the allocator may grant more, so its
    /// capacity can differ. The header is cloned as is: a header mirroring the capacity must
    /// be updated by the caller.
    pub fn make_mut(&mut self) -> &mut TailBuffer<H, T, A> {
        if !self.is_unique() {
            *self = self.copy_with_capacity(self.capacity());
        }
        &mut self.buffer
    }

    /// Calls `action` with exclusive access to the buffer, copying it first if it is shared.
    ///
    /// See [`make_mut`](Self::make_mut) for the capacity of the copy.
    pub fn mutate<R>(&mut self, action: impl FnOnce(&mut TailBuffer<H, T, A>) -> R) -> R {
        action(self.make_mut())
    }
}

impl<H, T, A> ManagedHandle<H, T, A>
where
    H: Send + Sync + 'static,
    T: Send + Sync + 'static,
    A: RawAllocator + Send + Sync + 'static,
{
    /// Erases the type of the handle.
    pub fn into_any(self) -> AnyBuffer {
        unsafe { AnyBuffer::from_native(Self::into_raw(self), VTable::new::<H, T, A>()) }
    }

    /// Recovers a typed handle from an erased one.
    ///
    /// The erased reference is given back in the error if it doesn't reference
    /// a `TailBuffer<H, T, A>`.
    pub fn downcast(any: AnyBuffer) -> Result<Self, TypeMismatchError<AnyBuffer>> {
        let ptr = any.into_native::<H, T, A>()?;
        Ok(unsafe { Self::from_raw(ptr) })
    }
}

impl<H, T, A> From<ManagedHandle<H, T, A>> for AnyBuffer
where
    H: Send + Sync + 'static,
    T: Send + Sync + 'static,
    A: RawAllocator + Send + Sync + 'static,
{
    fn from(value: ManagedHandle<H, T, A>) -> Self {
        value.into_any()
    }
}

impl<H, T, A> TryFrom<AnyBuffer> for ManagedHandle<H, T, A>
where
    H: Send + Sync + 'static,
    T: Send + Sync + 'static,
    A: RawAllocator + Send + Sync + 'static,
{
    type Error = TypeMismatchError<AnyBuffer>;

    fn try_from(value: AnyBuffer) -> Result<Self, Self::Error> {
        Self::downcast(value)
    }
}

impl<H, T, A: RawAllocator> Clone for ManagedHandle<H, T, A> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.retain(),
        }
    }
}

impl<H, T, A: RawAllocator> Deref for ManagedHandle<H, T, A> {
    type Target = TailBuffer<H, T, A>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl<H, T, A: RawAllocator> Owned for ManagedHandle<H, T, A> {
    #[inline]
    fn ownership(&self) -> Ownership<'_> {
        Ownership::Native(self.native_count())
    }
}

impl<H, T, A: RawAllocator> NativelyOwned for ManagedHandle<H, T, A> {
    #[inline]
    fn native_count(&self) -> NativeCount<'_> {
        NativeCount::new(self.buffer.rc())
    }
}

impl<H: fmt::Debug, T: fmt::Debug, A: RawAllocator> fmt::Debug for ManagedHandle<H, T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedHandle")
            .field("header", self.header())
            .field("elements", &self.as_slice())
            .field("capacity", &self.capacity())
            .field("ref_count", &Self::ref_count(self))
            .finish()
    }
}

impl<H: PartialEq, T: PartialEq, A: RawAllocator> PartialEq for ManagedHandle<H, T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.header() == other.header() && self.as_slice() == other.as_slice()
    }
}

impl<H: Eq, T: Eq, A: RawAllocator> Eq for ManagedHandle<H, T, A> {}
