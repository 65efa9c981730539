// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use async_trait::async_trait;
use flowcast_core::{FlowCollector, FlowError, Result};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;

/// A collector that forwards every value to a test-side stream.
///
/// Optionally rejects the value after a given number of accepted ones, which
/// lets tests check how a collection reacts to a failing collector.
#[derive(Debug, Clone)]
pub struct RecordingCollector<T> {
    tx: UnboundedSender<T>,
    fail_after: Option<usize>,
    accepted: usize,
}

impl<T: Send> RecordingCollector<T> {
    /// Returns the collector and the stream of values it receives.
    pub fn new() -> (Self, UnboundedReceiverStream<T>) {
        let (tx, rx) = unbounded_channel();
        (
            Self {
                tx,
                fail_after: None,
                accepted: 0,
            },
            UnboundedReceiverStream::new(rx),
        )
    }

    /// Like [`new`](Self::new), but fails with
    /// [`FlowError::StreamProcessingError`] once `accepted` values went through.
    pub fn failing_after(accepted: usize) -> (Self, UnboundedReceiverStream<T>) {
        let (mut collector, received) = Self::new();
        collector.fail_after = Some(accepted);
        (collector, received)
    }
}

#[async_trait]
impl<T: Send> FlowCollector<T> for RecordingCollector<T> {
    async fn emit(&mut self, value: T) -> Result<()> {
        if self.fail_after == Some(self.accepted) {
            return Err(FlowError::stream_error("recording collector rejected value"));
        }
        self.accepted += 1;
        // A test that dropped its receiver is no longer interested.
        let _ = self.tx.send(value);
        Ok(())
    }
}
