//! Single-threaded and contended append throughput.
//!
//! Generalizes the reference implementation's `bench`/`bench_criterion`
//! binaries, which compared single-threaded and multi-threaded push/pop
//! throughput across several queue designs, down to the one structure this
//! crate implements.

use std::sync::Arc;
use std::thread;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use snapchain::Chain;

const COUNT: u64 = 100_000;

fn bench_single_threaded_append(c: &mut Criterion) {
    c.bench_function("append/single-threaded", |b| {
        b.iter(|| {
            let chain = Chain::new();
            for i in 0..COUNT {
                chain.append(i);
            }
            std::hint::black_box(chain.len());
        });
    });
}

fn bench_contended_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append/contended");
    for threads in [2usize, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let chain = Arc::new(Chain::new());
                let per_thread = COUNT / threads as u64;
                thread::scope(|scope| {
                    for _ in 0..threads {
                        let chain = chain.clone();
                        scope.spawn(move || {
                            for i in 0..per_thread {
                                chain.append(i);
                            }
                        });
                    }
                });
                std::hint::black_box(chain.len());
            });
        });
    }
    group.finish();
}

fn bench_iter_drain(c: &mut Criterion) {
    let chain = Chain::new();
    for i in 0..COUNT {
        chain.append(i);
    }
    c.bench_function("iter/drain", |b| {
        b.iter(|| {
            let snapshot = chain.iter();
            std::hint::black_box(snapshot.count());
        });
    });
}

criterion_group!(
    benches,
    bench_single_threaded_append,
    bench_contended_append,
    bench_iter_drain
);
criterion_main!(benches);
