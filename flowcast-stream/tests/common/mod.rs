// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

#![allow(dead_code)]

use flowcast_core::FlowError;
use flowcast_stream::ColdStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Counts how often, and how many at once, an upstream is running.
#[derive(Clone, Default)]
pub struct UpstreamProbe {
    starts: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

struct Running(Arc<AtomicUsize>);

impl Drop for Running {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl UpstreamProbe {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// An endless upstream yielding 0, 1, 2, ... every 100ms, starting at once.
    pub fn ticker(&self) -> ColdStream<u64> {
        let probe = self.clone();
        ColdStream::new(move |_cancel| {
            let probe = probe.clone();
            async_stream::stream! {
                probe.starts.fetch_add(1, Ordering::SeqCst);
                let now_active = probe.active.fetch_add(1, Ordering::SeqCst) + 1;
                probe.max_active.fetch_max(now_active, Ordering::SeqCst);
                let _running = Running(probe.active.clone());

                let mut tick = 0u64;
                loop {
                    yield Ok::<_, FlowError>(tick);
                    tick += 1;
                    sleep(Duration::from_millis(100)).await;
                }
            }
        })
    }
}
