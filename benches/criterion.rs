use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use managed_buffer::ManagedHandle;

fn handle(len: usize) -> ManagedHandle<usize, u8> {
    let mut handle = ManagedHandle::new(len, |capacity| capacity);
    handle.mutate(|buffer| buffer.extend_from_slice(&vec![0; len]));
    handle
}

fn create(c: &mut Criterion) {
    let mut group = c.benchmark_group("create");
    group.bench_function("managed", |b| {
        b.iter(|| ManagedHandle::<usize, u8>::new(64, |capacity| capacity));
    });
    group.bench_function("arc_vec", |b| {
        b.iter(|| Arc::new((64usize, Vec::<u8>::with_capacity(64))));
    });
}

fn clone_shared(c: &mut Criterion) {
    let mut group = c.benchmark_group("clone_shared");
    group.bench_function("managed", |b| {
        let handle = handle(8).clone();
        b.iter(|| handle.clone());
    });
    group.bench_function("arc_vec", |b| {
        let arc = Arc::new((8usize, vec![0u8; 8])).clone();
        b.iter(|| arc.clone());
    });
}

fn mutate_unique(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutate_unique");
    group.bench_function("managed", |b| {
        b.iter_batched(
            || handle(8),
            |mut handle| {
                handle.mutate(|buffer| buffer.as_mut_slice()[0] = 1);
                handle
            },
            BatchSize::SmallInput,
        );
    });
    group.bench_function("arc_vec", |b| {
        b.iter_batched(
            || Arc::new((8usize, vec![0u8; 8])),
            |mut arc| {
                Arc::make_mut(&mut arc).1[0] = 1;
                arc
            },
            BatchSize::SmallInput,
        );
    });
}

fn mutate_shared(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutate_shared");
    group.bench_function("managed", |b| {
        let shared = handle(64);
        b.iter_batched(
            || shared.clone(),
            |mut handle| {
                handle.mutate(|buffer| buffer.as_mut_slice()[0] = 1);
                handle
            },
            BatchSize::SmallInput,
        );
    });
    group.bench_function("arc_vec", |b| {
        let shared = Arc::new((64usize, vec![0u8; 64]));
        b.iter_batched(
            || shared.clone(),
            |mut arc| {
                Arc::make_mut(&mut arc).1[0] = 1;
                arc
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, create, clone_shared, mutate_unique, mutate_shared);
criterion_main!(benches);
