use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use gem_core::config::SchedulerConfig;
use gem_core::reactive::create_store;
use gem_core::scheduler::{FrameScheduler, RenderPool};
use serde_json::json;

fn drain_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_drain");
    for size in [100usize, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let pool = RenderPool::new();
            let scheduler = FrameScheduler::new(pool.clone(), &SchedulerConfig::default());
            b.iter(|| {
                for i in 0..size {
                    pool.enqueue(move || {
                        black_box(i);
                    });
                }
                black_box(scheduler.drain());
            });
        });
    }
    group.finish();
}

fn store_fan_out(c: &mut Criterion) {
    let store = create_store(json!({ "count": 0 })).unwrap();
    let pool = RenderPool::new();
    let scheduler = FrameScheduler::new(pool.clone(), &SchedulerConfig::default());
    let _subs: Vec<_> = (0..256)
        .map(|_| {
            let pool = pool.clone();
            let reader = store.clone();
            store.subscribe(move || {
                let store = reader.clone();
                pool.enqueue(move || {
                    black_box(store.get("count"));
                });
            })
        })
        .collect();

    c.bench_function("store_fan_out_256", |b| {
        let mut n = 0;
        b.iter(|| {
            n += 1;
            store.update(json!({ "count": n })).unwrap();
            black_box(scheduler.drain());
        });
    });
}

criterion_group!(benches, drain_pool, store_fan_out);
criterion_main!(benches);
