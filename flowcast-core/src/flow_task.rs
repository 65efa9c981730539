// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Runtime-agnostic task spawning with cooperative cancellation.
//!
//! A [`FlowTask`] runs a future on the configured runtime and hands it a
//! [`CancellationToken`] to watch. The handle cancels that token when dropped,
//! and it can tell when the future has actually finished, which is what lets
//! the sharing engine wait for one upstream run to end before starting the next.

use crate::logging::{debug, error};
use crate::CancellationToken;
use core::future::Future;

/// Runtime-agnostic task handle with automatic cancellation on drop.
///
/// # Runtime Support
///
/// - **Tokio**: `tokio::spawn` (default, `runtime-tokio`)
/// - **smol**: `smol::spawn` (`runtime-smol`)
///
/// # Example
///
/// ```rust
/// use flowcast_core::FlowTask;
///
/// # #[tokio::main]
/// # async fn main() {
/// let task = FlowTask::spawn(|cancel| async move {
///     cancel.cancelled().await;
/// });
///
/// assert!(!task.is_finished());
/// task.stop().await;
/// # }
/// ```
#[derive(Debug)]
pub struct FlowTask {
    cancel: CancellationToken,
    done: CancellationToken,
    detached: bool,
}

/// Marks the task as finished when the spawned future completes or is dropped.
struct CompletionGuard {
    done: CancellationToken,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("flow task panicked before completing");
        }
        self.done.cancel();
    }
}

impl FlowTask {
    /// Spawn a background task with its own root cancellation token.
    pub fn spawn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn_with_token(CancellationToken::new(), f)
    }

    /// Spawn a background task whose token is a child of `parent`.
    ///
    /// Cancelling `parent` cancels the task; cancelling the task leaves
    /// `parent` untouched.
    pub fn spawn_in<F, Fut>(parent: &CancellationToken, f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn_with_token(parent.child_token(), f)
    }

    fn spawn_with_token<F, Fut>(cancel: CancellationToken, f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let done = CancellationToken::new();
        let guard = CompletionGuard { done: done.clone() };
        let future = f(cancel.clone());
        let _future = async move {
            let _guard = guard;
            future.await;
        };

        #[cfg(feature = "runtime-tokio")]
        tokio::spawn(_future);

        #[cfg(all(feature = "runtime-smol", not(feature = "runtime-tokio")))]
        smol::spawn(_future).detach();

        Self {
            cancel,
            done,
            detached: false,
        }
    }

    /// Signal the task to stop without waiting for it.
    ///
    /// The task stops at its next cancellation checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns `true` once the spawned future has completed, panicked or been
    /// dropped by the runtime.
    pub fn is_finished(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Cancel the task and wait until its future is gone.
    pub async fn stop(self) {
        self.cancel.cancel();
        self.done.cancelled().await;
    }

    /// Release the handle without cancelling the task.
    ///
    /// The task keeps running until its token is cancelled through a parent
    /// or its future completes.
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl Drop for FlowTask {
    fn drop(&mut self) {
        if !self.detached && !self.is_finished() {
            debug!("cancelling flow task on drop");
            self.cancel.cancel();
        }
    }
}
