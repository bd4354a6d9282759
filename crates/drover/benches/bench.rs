use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use drover::{MemorySink, Pool, queue};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::runtime::Builder;

const WORKER_COUNTS: &[usize] = &[1, 16, 256];

/// Measures one add immediately followed by its delete.
fn bench_add_delete(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool/add_delete");
    group.throughput(Throughput::Elements(1));

    group.bench_function("single", |b| {
        let rt = Builder::new_multi_thread().enable_all().build().unwrap();

        b.to_async(&rt).iter_custom(|iters| async move {
            let (_tx, rx) = queue::channel();
            let sink = Arc::new(MemorySink::new());
            let pool = Pool::new();
            let start = Instant::now();

            for _ in 0..iters {
                let id = pool.add(rx.clone(), sink.clone());
                pool.delete(black_box(id)).await.unwrap();
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Measures `finish` over pools of increasing size. Only the finish is timed.
fn bench_finish(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool/finish");
    group.sample_size(20);

    for &workers in WORKER_COUNTS {
        group.throughput(Throughput::Elements(workers as u64));
        group.bench_function(format!("workers/{workers}"), |b| {
            let rt = Builder::new_multi_thread().enable_all().build().unwrap();

            b.to_async(&rt).iter_custom(move |iters| async move {
                let (_tx, rx) = queue::channel();
                let sink = Arc::new(MemorySink::new());
                let mut total = Duration::ZERO;

                for _ in 0..iters {
                    let pool = Pool::new();
                    for _ in 0..workers {
                        pool.add(rx.clone(), sink.clone());
                    }

                    let start = Instant::now();
                    pool.finish().await.unwrap();
                    total += start.elapsed();
                }

                total
            });
        });
    }

    group.finish();
}

/// Measures item throughput through a fixed pool.
fn bench_throughput(c: &mut Criterion) {
    const ITEMS: usize = 10_000;

    let mut group = c.benchmark_group("pool/throughput");
    group.sample_size(10);
    group.throughput(Throughput::Elements(ITEMS as u64));

    for &workers in &WORKER_COUNTS[..2] {
        group.bench_function(format!("workers/{workers}"), |b| {
            let rt = Builder::new_multi_thread().enable_all().build().unwrap();

            b.to_async(&rt).iter_custom(move |iters| async move {
                let mut total = Duration::ZERO;

                for _ in 0..iters {
                    let (tx, rx) = queue::channel();
                    let sink = Arc::new(MemorySink::new());
                    let pool = Pool::new();
                    for _ in 0..workers {
                        pool.add(rx.clone(), sink.clone());
                    }

                    let start = Instant::now();
                    for i in 0..ITEMS {
                        tx.send(i.to_string()).await.unwrap();
                    }
                    while sink.len() < ITEMS {
                        tokio::task::yield_now().await;
                    }
                    total += start.elapsed();

                    pool.finish().await.unwrap();
                }

                total
            });
        });
    }

    group.finish();
}

criterion_group!(pool_benches, bench_add_delete, bench_finish, bench_throughput);
criterion_main!(pool_benches);
