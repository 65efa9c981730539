// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use criterion::{BenchmarkId, Criterion, Throughput};
use flowcast_stream::{BufferOverflow, SharedStream};
use futures::{future::join_all, StreamExt};
use std::hint::black_box;
use tokio::runtime::Runtime;

pub fn bench_shared_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_fan_out");
    let sizes = [100usize, 1000usize, 10000];
    let payload_sizes = [16usize, 128usize];
    let subscriber_counts = [1usize, 4usize, 16usize];
    let rt = Runtime::new().unwrap();

    for &size in &sizes {
        for &payload_size in &payload_sizes {
            for &subscribers in &subscriber_counts {
                let id = BenchmarkId::from_parameter(format!(
                    "m{size}_p{payload_size}_s{subscribers}"
                ));
                group.throughput(Throughput::Elements(size as u64));
                group.bench_with_input(
                    id,
                    &(size, payload_size, subscribers),
                    |bencher, &(size, payload_size, subscribers)| {
                        bencher.iter(|| {
                            rt.block_on(async {
                                let shared = SharedStream::new(0, 64, BufferOverflow::Suspend);

                                // Subscribe BEFORE emitting so every subscriber sees every value
                                let readers: Vec<_> = (0..subscribers)
                                    .map(|_| {
                                        let subscription = shared.subscribe();
                                        async move {
                                            let mut values = subscription.take(size);
                                            while let Some(v) = values.next().await {
                                                black_box(v);
                                            }
                                        }
                                    })
                                    .collect();

                                let writer = async {
                                    for _ in 0..size {
                                        shared.emit(vec![0u8; payload_size]).await;
                                    }
                                };

                                // Suspended emits are released by the readers polled alongside
                                futures::join!(writer, join_all(readers));
                            });
                        });
                    },
                );
            }
        }
    }

    group.finish();
}
