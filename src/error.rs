//! The errors.

use core::fmt;

pub(crate) use private::AllocErrorImpl;

/// The memory allocator returned an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocError;

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("allocation error")
    }
}

/// The size of an allocation exceeds `isize::MAX` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverflowError;

impl fmt::Display for OverflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("capacity overflow")
    }
}

/// Error which can occur when trying to create a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TryCreateError {
    /// The memory allocator returned an error.
    AllocError,
    /// The required capacity exceeds the buffer maximum (`isize::MAX` bytes).
    CapacityOverflow,
}

impl From<AllocError> for TryCreateError {
    fn from(_: AllocError) -> Self {
        Self::AllocError
    }
}

impl From<OverflowError> for TryCreateError {
    fn from(_: OverflowError) -> Self {
        Self::CapacityOverflow
    }
}

impl fmt::Display for TryCreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocError => f.write_str("allocation error"),
            Self::CapacityOverflow => f.write_str("capacity overflow"),
        }
    }
}

/// An erased reference doesn't point to the requested type.
///
/// The reference is given back, so the caller can fall back on another path.
pub struct TypeMismatchError<T> {
    object: T,
    expected: &'static str,
}

impl<T> TypeMismatchError<T> {
    pub(crate) fn new(object: T, expected: &'static str) -> Self {
        Self { object, expected }
    }

    /// The name of the type which was requested.
    pub fn expected(&self) -> &'static str {
        self.expected
    }

    pub fn into_inner(self) -> T {
        self.object
    }
}

impl<T: fmt::Debug> fmt::Debug for TypeMismatchError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMismatchError")
            .field("object", &self.object)
            .field("expected", &self.expected)
            .finish()
    }
}

impl<T> fmt::Display for TypeMismatchError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type mismatch, expected `{}`", self.expected)
    }
}

/// Caller errors, reported by panicking.
///
/// They are never returned; the enum only names the panic messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractViolation {
    /// An element was appended to a full buffer.
    CapacityExceeded { capacity: usize },
    /// An element slot was accessed outside the live prefix.
    OutOfBounds { index: usize, len: usize },
    /// A buffer copy was requested with a capacity smaller than its length.
    CapacityTooSmall { capacity: usize, len: usize },
    /// The uniqueness of a null handle was queried.
    NullHandle,
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded { capacity } => {
                write!(f, "capacity exceeded (capacity is {capacity})")
            }
            Self::OutOfBounds { index, len } => {
                write!(f, "index out of bounds: the len is {len} but the index is {index}")
            }
            Self::CapacityTooSmall { capacity, len } => {
                write!(f, "capacity {capacity} is smaller than len {len}")
            }
            Self::NullHandle => f.write_str("null handle"),
        }
    }
}

#[cfg(feature = "std")]
const _: () = {
    extern crate std;
    impl std::error::Error for AllocError {}
    impl std::error::Error for OverflowError {}
    impl std::error::Error for TryCreateError {}
    impl<T: fmt::Debug> std::error::Error for TypeMismatchError<T> {}
};

mod private {
    use alloc::alloc::handle_alloc_error;
    use core::{alloc::Layout, convert::Infallible, ptr::NonNull};

    use crate::{allocator::RawAllocator, error::TryCreateError};

    pub trait AllocErrorImpl: Sized {
        fn capacity_overflow() -> Self;
        fn alloc<A: RawAllocator>(allocator: &A, layout: Layout) -> Result<NonNull<[u8]>, Self>;
    }

    impl AllocErrorImpl for TryCreateError {
        fn capacity_overflow() -> Self {
            Self::CapacityOverflow
        }
        fn alloc<A: RawAllocator>(allocator: &A, layout: Layout) -> Result<NonNull<[u8]>, Self> {
            Ok(allocator.allocate(layout)?)
        }
    }

    impl AllocErrorImpl for Infallible {
        #[cold]
        #[inline(never)]
        fn capacity_overflow() -> Self {
            panic!("capacity overflow")
        }
        fn alloc<A: RawAllocator>(allocator: &A, layout: Layout) -> Result<NonNull<[u8]>, Self> {
            allocator
                .allocate(layout)
                .map_err(|_| handle_alloc_error(layout))
        }
    }
}
