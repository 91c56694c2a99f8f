use criterion::{criterion_group, criterion_main, Criterion};
use reactive_core::{computed, signal};

fn fan_out(c: &mut Criterion) {
    c.bench_function("fan_out", |b| {
        b.iter(|| {
            let sig = signal(0);
            let memos = (0..1000)
                .map(|_| {
                    let sig = sig.clone();
                    computed(move || sig.get())
                })
                .collect::<Vec<_>>();
            assert_eq!(memos.iter().map(|m| m.get()).sum::<i32>(), 0);
            sig.set(1);
            assert_eq!(memos.iter().map(|m| m.get()).sum::<i32>(), 1000);
        });
    });
}

criterion_group!(fan_out_group, fan_out);
criterion_main!(fan_out_group);
