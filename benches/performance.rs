//! Performance benchmarks for the stream engine.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use relay::{
    CancelBag, Completion, Demand, Never, PassthroughSubject, PublisherExt, Record, Sequence,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Benchmark a map/filter/map chain over a finite source
fn bench_operator_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("operator_chain");

    for len in [100usize, 1_000, 10_000] {
        let source: Sequence<u64> = (0..len as u64).collect();
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::new("map_filter_map", len), &source, |b, source| {
            b.iter(|| {
                let total = Arc::new(AtomicU64::new(0));
                let sum = Arc::clone(&total);
                let _handle = source
                    .clone()
                    .map(|v| v * 3)
                    .filter(|v| v % 2 == 0)
                    .map(|v| v + 1)
                    .sink_values(move |v| {
                        sum.fetch_add(v, Ordering::Relaxed);
                    });
                black_box(total.load(Ordering::Relaxed))
            });
        });
    }

    group.finish();
}

/// Benchmark one-at-a-time demand, the slowest delivery path
fn bench_demand_one(c: &mut Criterion) {
    let mut group = c.benchmark_group("demand_one");
    let len = 1_000usize;
    let source: Sequence<u64> = (0..len as u64).collect();
    group.throughput(Throughput::Elements(len as u64));

    group.bench_function("channel_pull", |b| {
        b.iter(|| {
            let handle = source
                .clone()
                .into_channel(relay::ChannelConfig { capacity: 1 });
            let mut count = 0u64;
            for event in handle {
                if let relay::StreamEvent::Completion(_) = event {
                    break;
                }
                count += 1;
            }
            black_box(count)
        });
    });

    group.finish();
}

/// Benchmark subject fan-out with varying subscriber counts
fn bench_subject_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("subject_fan_out");

    for subscribers in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(subscribers as u64 * 100));
        group.bench_with_input(
            BenchmarkId::new("subscribers", subscribers),
            &subscribers,
            |b, &subscribers| {
                let subject = PassthroughSubject::<u64, Never>::new();
                let received = Arc::new(AtomicU64::new(0));
                let mut bag = CancelBag::new();
                for _ in 0..subscribers {
                    let received = Arc::clone(&received);
                    subject
                        .clone()
                        .sink_values(move |_| {
                            received.fetch_add(1, Ordering::Relaxed);
                        })
                        .store_in(&mut bag);
                }

                b.iter(|| {
                    for i in 0..100 {
                        subject.send(black_box(i));
                    }
                });
                black_box(received.load(Ordering::Relaxed));
            },
        );
    }

    group.finish();
}

/// Benchmark combine_latest under a stream of updates
fn bench_combine_latest(c: &mut Criterion) {
    c.bench_function("combine_latest_1000_updates", |b| {
        let left = PassthroughSubject::<u64, Never>::new();
        let right = PassthroughSubject::<u64, Never>::new();
        let _handle = left
            .clone()
            .combine_latest(right.clone())
            .map(|(a, b)| a + b)
            .sink_values(|v| {
                black_box(v);
            });
        right.send(1);

        b.iter(|| {
            for i in 0..1_000 {
                left.send(i);
            }
        });
    });
}

/// Benchmark recording encode/decode and replay
fn bench_recording(c: &mut Criterion) {
    let mut group = c.benchmark_group("recording");

    for len in [100usize, 1_000] {
        let record = Record::<u64, String>::build(|r| {
            for i in 0..len as u64 {
                r.receive(i);
            }
            r.receive_completion(Completion::Finished);
        });

        group.bench_with_input(BenchmarkId::new("json_round_trip", len), &record, |b, record| {
            b.iter(|| {
                let json = record.recording().to_json().unwrap();
                black_box(relay::Recording::<u64, String>::from_json(&json).unwrap())
            });
        });

        group.bench_with_input(BenchmarkId::new("framed_round_trip", len), &record, |b, record| {
            b.iter(|| {
                let bytes = record.recording().to_bytes().unwrap();
                black_box(relay::Recording::<u64, String>::from_bytes(&bytes).unwrap())
            });
        });

        group.bench_with_input(BenchmarkId::new("replay", len), &record, |b, record| {
            b.iter(|| {
                let count = Arc::new(AtomicU64::new(0));
                let seen = Arc::clone(&count);
                let _handle = record.clone().sink(
                    move |_| {
                        seen.fetch_add(1, Ordering::Relaxed);
                    },
                    |_| {},
                );
                black_box(count.load(Ordering::Relaxed))
            });
        });
    }

    group.finish();
}

/// Benchmark the raw demand arithmetic used on every delivery
fn bench_demand_arithmetic(c: &mut Criterion) {
    c.bench_function("demand_accumulate_consume", |b| {
        b.iter(|| {
            let mut demand = Demand::NONE;
            for _ in 0..1_000 {
                demand += Demand::max(black_box(2));
                demand.consume_one();
            }
            black_box(demand)
        });
    });
}

criterion_group!(
    benches,
    bench_operator_chain,
    bench_demand_one,
    bench_subject_fan_out,
    bench_combine_latest,
    bench_recording,
    bench_demand_arithmetic,
);
criterion_main!(benches);
