use alloc::sync::Arc;
use core::{
    any::{Any, TypeId},
    fmt,
    mem::ManuallyDrop,
    ptr::{self, NonNull},
};

use crate::{
    allocator::RawAllocator,
    arc::{self, VTable},
    buffer::TailBuffer,
    error::TypeMismatchError,
    unique::{NativeCount, Owned, Ownership},
    utils::unreachable_checked,
};

/// A type-erased reference to either a native buffer or a foreign object.
///
/// Native references are created with [`ManagedHandle::into_any`], and recovered with
/// [`ManagedHandle::downcast`]. Foreign objects are shared through an [`Arc`] whose count is
/// not trusted to prove exclusivity, so they are never reported as unique.
///
/// # Examples
///
/// ```rust
/// use managed_buffer::{unique, AnyBuffer, Global, ManagedHandle};
///
/// let handle = ManagedHandle::<(), u8>::new(4, |_| ());
/// let any = handle.into_any();
/// assert!(any.is_buffer::<(), u8, Global>());
/// assert!(unique::is_unique(&any));
/// let handle = ManagedHandle::<(), u8>::downcast(any).unwrap();
/// assert_eq!(handle.capacity(), 4);
///
/// let foreign = AnyBuffer::from_foreign(std::sync::Arc::new(42));
/// assert!(!unique::is_unique(&foreign));
/// ```
///
/// [`ManagedHandle::into_any`]: crate::ManagedHandle::into_any
/// [`ManagedHandle::downcast`]: crate::ManagedHandle::downcast
pub struct AnyBuffer(Repr);

enum Repr {
    Native {
        ptr: NonNull<()>,
        vtable: &'static VTable,
    },
    Foreign(Arc<dyn Any + Send + Sync>),
}

// Native references can only be created from `Send + Sync` buffers
unsafe impl Send for AnyBuffer {}
unsafe impl Sync for AnyBuffer {}

impl AnyBuffer {
    /// # Safety
    ///
    /// `ptr` must be an owned reference to a block matching `vtable`.
    pub(crate) unsafe fn from_native(ptr: NonNull<()>, vtable: &'static VTable) -> Self {
        Self(Repr::Native { ptr, vtable })
    }

    /// Gives back the owned reference if it points to a `TailBuffer<H, T, A>`.
    pub(crate) fn into_native<H: 'static, T: 'static, A: RawAllocator + 'static>(
        self,
    ) -> Result<NonNull<()>, TypeMismatchError<Self>> {
        if !self.is_buffer::<H, T, A>() {
            let expected = core::any::type_name::<TailBuffer<H, T, A>>();
            return Err(TypeMismatchError::new(self, expected));
        }
        let Repr::Native { ptr, .. } = self.into_repr() else {
            unreachable_checked()
        };
        Ok(ptr)
    }

    /// Wraps an object whose lifetime is managed outside of this crate.
    pub fn from_foreign<X: Any + Send + Sync>(object: Arc<X>) -> Self {
        Self(Repr::Foreign(object))
    }

    /// Returns `true` if the reference points to a buffer allocated by this crate.
    #[inline]
    pub fn is_native(&self) -> bool {
        matches!(self.0, Repr::Native { .. })
    }

    /// Returns `true` if the reference points to a `TailBuffer<H, T, A>`.
    pub fn is_buffer<H: 'static, T: 'static, A: RawAllocator + 'static>(&self) -> bool {
        match &self.0 {
            Repr::Native { vtable, .. } => {
                (vtable.type_id)() == TypeId::of::<TailBuffer<H, T, A>>()
            }
            Repr::Foreign(_) => false,
        }
    }

    /// Recovers a foreign object of type `X`.
    pub fn downcast_foreign<X: Any + Send + Sync>(self) -> Result<Arc<X>, TypeMismatchError<Self>> {
        let expected = core::any::type_name::<X>();
        match self.into_repr() {
            Repr::Foreign(object) => object
                .downcast::<X>()
                .map_err(|object| TypeMismatchError::new(Self(Repr::Foreign(object)), expected)),
            repr => Err(TypeMismatchError::new(Self(repr), expected)),
        }
    }

    fn into_repr(self) -> Repr {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the repr is only owned once
        unsafe { ptr::read(&this.0) }
    }

    /// Name of the referenced buffer type, if native.
    pub fn type_name(&self) -> Option<&'static str> {
        match &self.0 {
            Repr::Native { vtable, .. } => Some((vtable.type_name)()),
            Repr::Foreign(_) => None,
        }
    }

    /// Returns `true` if both references point to the same object.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.addr() == other.addr()
    }

    fn addr(&self) -> *const () {
        match &self.0 {
            Repr::Native { ptr, .. } => ptr.as_ptr().cast_const(),
            Repr::Foreign(object) => Arc::as_ptr(object).cast(),
        }
    }
}

impl Clone for AnyBuffer {
    fn clone(&self) -> Self {
        match &self.0 {
            Repr::Native { ptr, vtable } => {
                arc::retain(unsafe { arc::ref_count(*ptr) });
                Self(Repr::Native {
                    ptr: *ptr,
                    vtable: *vtable,
                })
            }
            Repr::Foreign(object) => Self(Repr::Foreign(object.clone())),
        }
    }
}

impl Drop for AnyBuffer {
    fn drop(&mut self) {
        if let Repr::Native { ptr, vtable } = &self.0 {
            unsafe { (vtable.drop)(*ptr) };
        }
    }
}

impl Owned for AnyBuffer {
    fn ownership(&self) -> Ownership<'_> {
        match &self.0 {
            Repr::Native { ptr, .. } => {
                Ownership::Native(NativeCount::new(unsafe { arc::ref_count(*ptr) }))
            }
            Repr::Foreign(_) => Ownership::Foreign,
        }
    }
}

impl fmt::Debug for AnyBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Native { ptr, vtable } => f
                .debug_struct("AnyBuffer")
                .field("type", &(vtable.type_name)())
                .field("ptr", ptr)
                .finish(),
            Repr::Foreign(object) => f
                .debug_struct("AnyBuffer")
                .field("foreign", &Arc::as_ptr(object))
                .finish(),
        }
    }
}
