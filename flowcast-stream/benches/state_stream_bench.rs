// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use criterion::{BenchmarkId, Criterion, Throughput};
use flowcast_stream::StateStream;
use futures::FutureExt;
use futures::StreamExt;
use std::hint::black_box;

pub fn bench_state_updates(c: &mut Criterion) {
    let mut group = c.benchmark_group("state_updates");
    let sizes = [100usize, 1000usize, 10000];
    let subscriber_counts = [0usize, 1usize, 16usize];

    for &size in &sizes {
        for &subscribers in &subscriber_counts {
            let id = BenchmarkId::from_parameter(format!("m{size}_s{subscribers}"));
            group.throughput(Throughput::Elements(size as u64));
            group.bench_with_input(id, &(size, subscribers), |bencher, &(size, subscribers)| {
                bencher.iter(|| {
                    let state = StateStream::new(0usize);
                    let mut watchers: Vec<_> =
                        (0..subscribers).map(|_| state.subscribe()).collect();

                    for _ in 0..size {
                        state.update(|v| v + 1);
                    }

                    // Conflated: each watcher holds the initial and the latest value at most
                    for watcher in &mut watchers {
                        while let Some(Some(v)) = watcher.next().now_or_never() {
                            black_box(v);
                        }
                    }
                    black_box(state.value());
                });
            });
        }
    }

    group.finish();
}
