use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use keybus_core::Bus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn bench_publish_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_fan_out");
    for subscribers in [1usize, 8, 64] {
        let bus: Bus<u64> = Bus::new();
        let sink = Arc::new(AtomicU64::new(0));
        for _ in 0..subscribers {
            let sink = sink.clone();
            bus.subscribe("users", move |id| {
                sink.fetch_add(*id, Ordering::Relaxed);
                Ok(())
            });
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| b.iter(|| bus.publish(black_box("users"), black_box(&1))),
        );
    }
    group.finish();
}

fn bench_publish_miss(c: &mut Criterion) {
    let bus: Bus<u64> = Bus::new();
    bus.subscribe("users", |_| Ok(()));
    c.bench_function("publish_miss", |b| {
        b.iter(|| bus.publish(black_box("sessions"), black_box(&1)))
    });
}

fn bench_subscribe_unsubscribe(c: &mut Criterion) {
    let bus: Bus<u64> = Bus::new();
    c.bench_function("subscribe_unsubscribe", |b| {
        b.iter(|| {
            let unsubscribe = bus.subscribe(black_box("users"), |_| Ok(()));
            unsubscribe.unsubscribe();
        })
    });
}

criterion_group!(
    benches,
    bench_publish_fan_out,
    bench_publish_miss,
    bench_subscribe_unsubscribe
);
criterion_main!(benches);
