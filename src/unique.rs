//! Uniqueness tests gating in-place mutation.
//!
//! A verdict is only valid at the moment it is computed: cloning or dropping a reference may
//! change it, so it must be checked again right before each mutation.
//!
//! Two ownership domains exist. Native allocations, created by
//! [`ManagedHandle`](crate::ManagedHandle), carry an atomic reference count which is read
//! directly. Foreign objects have a reference count managed outside of this crate, and are
//! never reported as unique.

use core::{fmt, ptr::NonNull};

use crate::{
    arc,
    error::ContractViolation,
    loom::sync::atomic::AtomicUsize,
    utils::panic_contract,
};

/// Reference count of a native allocation.
#[derive(Clone, Copy)]
pub struct NativeCount<'a>(&'a AtomicUsize);

impl<'a> NativeCount<'a> {
    pub(crate) fn new(rc: &'a AtomicUsize) -> Self {
        Self(rc)
    }

    /// Whether exactly one reference exists.
    #[inline]
    pub fn is_unique(self) -> bool {
        arc::is_unique(self.0)
    }

    /// Snapshot of the reference count, only meaningful for diagnostics.
    #[inline]
    pub fn get(self) -> usize {
        arc::count(self.0)
    }
}

impl fmt::Debug for NativeCount<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NativeCount").field(&self.get()).finish()
    }
}

/// The way an object reference count is managed.
#[derive(Debug, Clone, Copy)]
pub enum Ownership<'a> {
    /// The count is an internal atomic counter.
    Native(NativeCount<'a>),
    /// The count is managed outside of this crate, and cannot be trusted to prove exclusivity.
    Foreign,
}

impl Ownership<'_> {
    #[inline]
    pub fn is_unique(self) -> bool {
        match self {
            Self::Native(count) => count.is_unique(),
            Self::Foreign => false,
        }
    }
}

/// An object which may be either native or foreign, only known at runtime.
pub trait Owned {
    fn ownership(&self) -> Ownership<'_>;
}

/// An object which is statically known to be native.
pub trait NativelyOwned: Owned {
    fn native_count(&self) -> NativeCount<'_>;
}

/// Returns `true` if `object` is the only reference to its allocation.
///
/// Foreign objects always return `false`.
#[inline]
pub fn is_unique<O: Owned + ?Sized>(object: &O) -> bool {
    object.ownership().is_unique()
}

/// Returns `true` if `object` is the only reference to its allocation, skipping the
/// runtime ownership check.
#[inline]
pub fn is_unique_native<O: NativelyOwned + ?Sized>(object: &O) -> bool {
    object.native_count().is_unique()
}

/// Returns `true` if `ptr` is the only reference to its allocation.
///
/// # Safety
///
/// `ptr` must be either null or returned by [`ManagedHandle::into_raw`], and not yet
/// given back to [`ManagedHandle::from_raw`].
///
/// # Panics
///
/// Panics if `ptr` is null.
///
/// [`ManagedHandle::into_raw`]: crate::ManagedHandle::into_raw
/// [`ManagedHandle::from_raw`]: crate::ManagedHandle::from_raw
#[track_caller]
pub unsafe fn is_unique_raw(ptr: *const ()) -> bool {
    let Some(ptr) = NonNull::new(ptr.cast_mut()) else {
        panic_contract(ContractViolation::NullHandle);
    };
    arc::is_unique(unsafe { arc::ref_count(ptr) })
}
