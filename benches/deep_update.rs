use criterion::{criterion_group, criterion_main, Criterion};
use reactive_core::{computed, signal, ComputedHandle};

fn deep_update(c: &mut Criterion) {
    c.bench_function("deep_update", |b| {
        b.iter(|| {
            let sig = signal(0);
            let mut chain = Vec::<ComputedHandle<i32>>::new();
            for i in 0..1000usize {
                let prev = chain.get(i.saturating_sub(1)).cloned();
                if let Some(prev) = prev {
                    chain.push(computed(move || prev.get() + 1));
                } else {
                    let sig = sig.clone();
                    chain.push(computed(move || sig.get() + 1));
                }
            }
            sig.set(1);
            assert_eq!(chain[999].get(), 1001);
        });
    });
}

criterion_group!(deep, deep_update);
criterion_main!(deep);
