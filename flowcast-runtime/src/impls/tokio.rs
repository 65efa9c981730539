// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#[cfg(feature = "runtime-tokio")]
use std::time::Duration;

#[cfg(feature = "runtime-tokio")]
use crate::{runtime::Runtime, timer::Timer};

#[cfg(feature = "runtime-tokio")]
#[derive(Debug)]
pub struct TokioRuntime;

#[cfg(feature = "runtime-tokio")]
impl Runtime for TokioRuntime {
    type Timer = TokioTimer;
    type Instant = tokio::time::Instant;
}

/// Timer backed by `tokio::time`, so paused test time drives it too.
#[cfg(feature = "runtime-tokio")]
#[derive(Clone, Debug, Default)]
pub struct TokioTimer;

#[cfg(feature = "runtime-tokio")]
impl Timer for TokioTimer {
    type Sleep = tokio::time::Sleep;

    type Instant = tokio::time::Instant;

    fn sleep_future(&self, duration: Duration) -> Self::Sleep {
        tokio::time::sleep(duration)
    }

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }
}
