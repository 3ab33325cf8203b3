use crate::error::ContractViolation;

#[cold]
#[track_caller]
pub(crate) fn panic_contract(violation: ContractViolation) -> ! {
    panic!("{violation}")
}

#[cold]
#[track_caller]
pub(crate) fn panic_capacity_exceeded(capacity: usize) -> ! {
    panic_contract(ContractViolation::CapacityExceeded { capacity })
}

#[cold]
#[track_caller]
pub(crate) fn panic_out_of_bounds(index: usize, len: usize) -> ! {
    panic_contract(ContractViolation::OutOfBounds { index, len })
}

#[cfg(feature = "abort-on-refcount-overflow")]
#[inline(never)]
#[cold]
pub(crate) fn abort() -> ! {
    #[cfg(feature = "std")]
    {
        extern crate std;
        std::process::abort();
    }
    // in no_std, use double panic
    #[cfg(not(feature = "std"))]
    {
        struct Abort;
        impl Drop for Abort {
            fn drop(&mut self) {
                panic!("abort");
            }
        }
        let _guard = Abort;
        panic!("abort");
    }
}

#[inline(always)]
pub(crate) fn unreachable_checked() -> ! {
    #[cfg(debug_assertions)]
    unreachable!();
    #[cfg(not(debug_assertions))]
    unsafe {
        core::hint::unreachable_unchecked()
    };
}

#[inline(always)]
pub(crate) fn assert_checked(predicate: bool) {
    if !predicate {
        unreachable_checked();
    }
}

pub(crate) trait UnwrapChecked<T> {
    fn unwrap_checked(self) -> T;
}

impl<T> UnwrapChecked<T> for Option<T> {
    #[inline(always)]
    fn unwrap_checked(self) -> T {
        self.unwrap_or_else(|| unreachable_checked())
    }
}

impl<T, E> UnwrapChecked<T> for Result<T, E> {
    #[inline(always)]
    fn unwrap_checked(self) -> T {
        self.unwrap_or_else(|_| unreachable_checked())
    }
}
