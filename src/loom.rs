cfg_if::cfg_if! {
    if #[cfg(all(loom, test))] {
        pub(crate) use loom::sync;
    } else if #[cfg(feature = "portable-atomic")] {
        pub(crate) mod sync {
            pub(crate) mod atomic {
                pub(crate) use portable_atomic::{fence, AtomicUsize, Ordering};
            }
        }
    } else {
        pub(crate) use core::sync;
    }
}

#[cfg(all(loom, test))]
mod tests {
    use loom::thread;

    use crate::ManagedHandle;

    fn handle() -> ManagedHandle<usize, usize> {
        let mut handle = ManagedHandle::new(2, |_| 0);
        handle.get_mut().unwrap().push(42);
        handle
    }

    #[test]
    fn concurrent_clone_and_drop() {
        loom::model(|| {
            let handle = handle();
            let clone = handle.clone();
            let thread = thread::spawn(move || {
                assert_eq!(clone.as_slice(), [42]);
                clone.clone()
            });
            let local = handle.clone();
            let remote = thread.join().unwrap();
            drop(local);
            drop(remote);
            let mut handle = handle;
            assert!(handle.get_mut().is_some());
        });
    }

    #[test]
    fn concurrent_mutate() {
        loom::model(|| {
            let mut handle = handle();
            let mut clone = handle.clone();
            let thread = thread::spawn(move || {
                clone.mutate(|buffer| buffer.push(1));
                clone
            });
            handle.mutate(|buffer| buffer.push(2));
            let clone = thread.join().unwrap();
            assert_eq!(handle.as_slice(), [42, 2]);
            assert_eq!(clone.as_slice(), [42, 1]);
            assert!(!ManagedHandle::ptr_eq(&handle, &clone));
        });
    }
}
