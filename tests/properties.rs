use managed_buffer::{layout::AllocationLayout, ManagedHandle};
use proptest::prelude::*;

mod common;
use common::{RoundUp64, Tracker};

#[derive(Debug, Clone)]
enum Op {
    Push(u16),
    Pop,
    Truncate(usize),
    Clone,
    DropClone,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<u16>().prop_map(Op::Push),
        1 => Just(Op::Pop),
        1 => (0usize..16).prop_map(Op::Truncate),
        1 => Just(Op::Clone),
        1 => Just(Op::DropClone),
    ]
}

proptest! {
    #[test]
    fn actual_capacity_is_observed(minimum_capacity in 0usize..512) {
        let mut observed = None;
        let handle = ManagedHandle::<(), u32, _>::new_in(minimum_capacity, RoundUp64, |capacity| {
            observed = Some(capacity);
        });
        prop_assert!(handle.capacity() >= minimum_capacity);
        prop_assert_eq!(observed, Some(handle.capacity()));
    }

    #[test]
    fn layout_never_overlaps(capacity in 0usize..1 << 16) {
        let layout = AllocationLayout::<(u8, u64, u8), (u16, u8)>::new(capacity).unwrap();
        prop_assert!(layout.offset() >= std::mem::size_of::<(u8, u64, u8)>());
        prop_assert_eq!(layout.offset() % std::mem::align_of::<(u16, u8)>(), 0);
        prop_assert_eq!(layout.capacity_for_size(layout.size()), capacity);
    }

    #[test]
    fn handle_behaves_like_a_vec(ops in proptest::collection::vec(arb_op(), 0..64)) {
        let mut model = Vec::new();
        let mut handle = ManagedHandle::<usize, u16>::new(16, |capacity| capacity);
        let mut clones = Vec::new();
        for op in ops {
            match op {
                Op::Push(value) if model.len() < 16 => {
                    handle.mutate(|buffer| buffer.push(value));
                    model.push(value);
                }
                Op::Push(_) => {}
                Op::Pop => {
                    prop_assert_eq!(handle.mutate(|buffer| buffer.pop()), model.pop());
                }
                Op::Truncate(len) => {
                    handle.mutate(|buffer| buffer.truncate(len));
                    model.truncate(len);
                }
                Op::Clone => clones.push((handle.clone(), model.clone())),
                Op::DropClone => drop(clones.pop()),
            }
            prop_assert_eq!(handle.as_slice(), &model[..]);
            prop_assert_eq!(handle.is_unique(), clones.iter().all(|(c, _)| !ManagedHandle::ptr_eq(c, &handle)));
        }
        for (clone, snapshot) in &clones {
            prop_assert_eq!(clone.as_slice(), &snapshot[..]);
        }
    }

    #[test]
    fn teardown_drops_every_element_once(len in 0usize..32, clones in 0usize..4) {
        let tracker = Tracker::new();
        {
            let mut handle = ManagedHandle::new(len, |_| tracker.track(usize::MAX));
            handle.mutate(|buffer| {
                for i in 0..len {
                    buffer.push(tracker.track(i));
                }
            });
            let copies: Vec<_> = (0..clones).map(|_| handle.clone()).collect();
            prop_assert_eq!(tracker.instances(), len + 1);
            drop(copies);
        }
        prop_assert_eq!(tracker.instances(), 0);
    }
}
