use managed_buffer::{unique, ManagedHandle};

mod common;
use common::Tracker;

#[derive(Debug, Clone, PartialEq)]
struct CountAndCapacity {
    count: usize,
    capacity: usize,
}

type Growable = ManagedHandle<CountAndCapacity, u32>;

fn create(minimum_capacity: usize) -> Growable {
    ManagedHandle::new(minimum_capacity, |capacity| CountAndCapacity {
        count: 0,
        capacity,
    })
}

// Appends like a growable array: reallocates when full, copies when shared.
fn append(handle: &mut Growable, value: u32) {
    if handle.is_full() {
        let mut grown = handle.copy_with_capacity((handle.capacity() * 2).max(1));
        let capacity = grown.capacity();
        grown.get_mut().unwrap().header_mut().capacity = capacity;
        *handle = grown;
    }
    handle.mutate(|buffer| {
        buffer.push(value);
        buffer.header_mut().count = buffer.len();
    });
}

#[test]
fn capacity_is_observed_by_the_header_factory() {
    for minimum_capacity in [0, 1, 7, 64, 1000] {
        let handle = create(minimum_capacity);
        assert!(handle.capacity() >= minimum_capacity);
        assert_eq!(handle.header().capacity, handle.capacity());
    }
}

#[test]
fn uniqueness_follows_references() {
    let handle = create(1);
    assert!(handle.is_unique());
    let copy = handle.clone();
    assert!(!handle.is_unique());
    assert!(!copy.is_unique());
    assert!(!unique::is_unique(&handle));
    assert_eq!(ManagedHandle::ref_count(&handle), 2);
    drop(copy);
    assert!(handle.is_unique());
    assert!(unique::is_unique_native(&handle));
}

#[test]
fn mutate_never_leaks_into_aliases() {
    let mut a = create(4);
    for i in 0..3 {
        append(&mut a, i);
    }
    let b = a.clone();
    a.mutate(|buffer| {
        buffer.push(3);
        buffer.header_mut().count = buffer.len();
    });
    assert_eq!(b.header().count, 3);
    assert_eq!(b.as_slice(), [0, 1, 2]);
    assert_eq!(a.header().count, 4);
    assert_eq!(a.as_slice(), [0, 1, 2, 3]);
}

#[test]
fn mutate_in_place_when_unique() {
    let mut handle = create(2);
    let ptr = handle.as_ptr();
    append(&mut handle, 1);
    append(&mut handle, 2);
    assert_eq!(handle.as_ptr(), ptr);
}

#[test]
fn copy_then_append_scenario() {
    let mut original = create(0);
    append(&mut original, 1);
    assert_eq!(original.header().count, 1);
    let mut copy = original.clone();
    assert!(ManagedHandle::ptr_eq(&original, &copy));
    append(&mut copy, 2);
    assert_eq!(original.header().count, 1);
    assert_eq!(copy.header().count, 2);
    assert!(!ManagedHandle::ptr_eq(&original, &copy));
    assert_ne!(original.as_ptr(), copy.as_ptr());
}

#[test]
#[should_panic(expected = "capacity exceeded")]
fn append_on_full_buffer_is_a_contract_violation() {
    let mut handle = create(1);
    handle.mutate(|buffer| {
        buffer.push(1);
        buffer.push(2);
    });
}

#[test]
fn copy_keeps_the_requested_capacity() {
    let mut handle = create(3);
    append(&mut handle, 1);
    let copy = handle.clone();
    handle.mutate(|buffer| buffer.push(2));
    assert_eq!(handle.capacity(), copy.capacity());
}

#[test]
fn copy_clones_elements_and_header_once() {
    let tracker = Tracker::new();
    let mut a = ManagedHandle::new(2, |_| tracker.track(0));
    a.mutate(|buffer| buffer.push(tracker.track(1)));
    let mut b = a.clone();
    assert_eq!(tracker.instances(), 2);
    b.mutate(|buffer| buffer.push(tracker.track(2)));
    assert_eq!(tracker.instances(), 5);
    drop(a);
    assert_eq!(tracker.instances(), 3);
    drop(b);
    assert_eq!(tracker.instances(), 0);
}

#[test]
fn swapped_handles_keep_their_buffers() {
    let mut a = create(1);
    let mut b = create(1);
    append(&mut a, 1);
    append(&mut b, 2);
    std::mem::swap(&mut a, &mut b);
    assert_eq!(a.as_slice(), [2]);
    assert_eq!(b.as_slice(), [1]);
}

#[test]
fn equality_ignores_aliasing() {
    let mut a = ManagedHandle::<(), f64>::new(1, |_| ());
    a.mutate(|buffer| buffer.push(f64::NAN));
    assert_ne!(a, a.clone());
    assert_ne!(a, a.copy_with_capacity(1));
}

#[test]
fn equality_compares_contents() {
    let mut a = create(2);
    append(&mut a, 1);
    let mut b = create(2);
    append(&mut b, 1);
    assert_eq!(a, b);
    append(&mut b, 2);
    assert_ne!(a, b);
}
