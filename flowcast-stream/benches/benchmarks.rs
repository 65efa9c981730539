// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

mod shared_stream_bench;
mod state_stream_bench;

use criterion::{criterion_group, criterion_main};
use shared_stream_bench::bench_shared_fan_out;
use state_stream_bench::bench_state_updates;

criterion_group!(stream_benches, bench_shared_fan_out, bench_state_updates);
criterion_main!(stream_benches);
