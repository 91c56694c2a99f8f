use criterion::{criterion_group, criterion_main, Criterion};
use reactive_core::{computed, signal};
use std::rc::Rc;

fn narrow_down(c: &mut Criterion) {
    c.bench_function("narrow_down", |b| {
        b.iter(|| {
            let sigs = Rc::new((0..1000).map(signal).collect::<Vec<_>>());
            let sigs2 = Rc::clone(&sigs);
            let memo = computed(move || sigs2.iter().map(|s| s.get()).sum::<i32>());
            assert_eq!(memo.get(), 499500);
        });
    });
}

criterion_group!(narrow_down_group, narrow_down);
criterion_main!(narrow_down_group);
