use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use keyflake::{KeyflakeId, LockKeyGenerator, MonotonicClock, Poll, TimeSource, WallClock};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

struct FixedMockTime {
    millis: u64,
}

impl TimeSource for FixedMockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

// One full millisecond of sequence values (0..=4094); a fixed clock never
// stalls below this.
const IDS_PER_TICK: usize = KeyflakeId::max_sequence() as usize;

// Number of IDs generated per benchmark iteration (split across threads for
// multi-threaded runs).
const TOTAL_IDS: usize = 4096;

/// Benchmarks the hot path where every poll is `Ready`.
fn bench_poll_hot(c: &mut Criterion) {
    let mut group = c.benchmark_group("poll/fixed");
    group.throughput(Throughput::Elements(IDS_PER_TICK as u64));

    group.bench_function(format!("elems/{IDS_PER_TICK}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let generator = LockKeyGenerator::new(0, FixedMockTime { millis: 1 })
                    .expect("valid machine id");
                for _ in 0..IDS_PER_TICK {
                    match generator.poll_id() {
                        Poll::Ready { id } => {
                            black_box(id);
                        }
                        Poll::Pending { .. } => unreachable!(),
                    }
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks `next_id` against a real clock, including rollover stalls.
fn bench_next_id<T>(c: &mut Criterion, group_name: &str, clock_factory: impl Fn() -> T)
where
    T: TimeSource,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        let generator = LockKeyGenerator::new(1, clock_factory()).expect("valid machine id");
        b.iter(|| {
            for _ in 0..TOTAL_IDS {
                black_box(generator.next_id());
            }
        });
    });

    group.finish();
}

/// Benchmarks one generator shared by several threads.
fn bench_next_id_contended<T>(c: &mut Criterion, group_name: &str, clock_factory: impl Fn() -> T)
where
    T: TimeSource + Send + Sync,
{
    let mut group = c.benchmark_group(group_name);

    let mut thread_counts = vec![1, 2, 4, 8];
    let cpus = num_cpus::get();
    if !thread_counts.contains(&cpus) {
        thread_counts.push(cpus);
    }

    for thread_count in thread_counts {
        let ids_per_thread = TOTAL_IDS / thread_count;

        group.throughput(Throughput::Elements((ids_per_thread * thread_count) as u64));
        group.bench_function(
            format!("elems/{TOTAL_IDS}/threads/{thread_count}"),
            |b| {
                b.iter_custom(|iters| {
                    let generator =
                        Arc::new(LockKeyGenerator::new(2, clock_factory()).expect("valid machine id"));
                    let start = Instant::now();

                    for _ in 0..iters {
                        let barrier = Arc::new(Barrier::new(thread_count + 1));
                        scope(|s| {
                            for _ in 0..thread_count {
                                let generator = Arc::clone(&generator);
                                let barrier = Arc::clone(&barrier);
                                s.spawn(move || {
                                    barrier.wait();
                                    for _ in 0..ids_per_thread {
                                        black_box(generator.next_id());
                                    }
                                });
                            }
                            barrier.wait();
                        });
                    }

                    start.elapsed()
                });
            },
        );
    }

    group.finish();
}

fn benches(c: &mut Criterion) {
    bench_poll_hot(c);
    bench_next_id(c, "next_id/wall", WallClock::default);
    bench_next_id(c, "next_id/mono", || {
        MonotonicClock::try_default().expect("system clock after epoch")
    });
    bench_next_id_contended(c, "next_id_contended/wall", WallClock::default);
    bench_next_id_contended(c, "next_id_contended/mono", || {
        MonotonicClock::try_default().expect("system clock after epoch")
    });
}

criterion_group!(bench_group, benches);
criterion_main!(bench_group);
