// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Turns a cold flow into a hot one.
//!
//! [`ShareInExt::share_in`] and [`StateInExt::state_in`] create the destination
//! stream, then spawn an engine task under the caller's scope. The engine owns
//! the upstream: it follows the commands of a [`SharingStrategy`], running at
//! most one collection of the upstream into the destination at any time.
//!
//! ## Example
//!
//! ```
//! use flowcast_core::CancellationToken;
//! use flowcast_stream::{ColdStream, ShareInExt, SharingStarted};
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let scope = CancellationToken::new();
//! let ticks = ColdStream::from_values(vec![1, 2, 3]).share_in(&scope, SharingStarted::Lazily, 3);
//!
//! let mut subscriber = ticks.subscribe();
//! assert_eq!(subscriber.next().await, Some(1));
//! assert_eq!(subscriber.next().await, Some(2));
//! assert_eq!(subscriber.next().await, Some(3));
//!
//! scope.cancel();
//! # }
//! ```

use crate::logging::{debug, error};
use crate::shared_stream::{ReadOnlySharedStream, SharedConfig, SharedStream};
use crate::sharing::strategy::{SharingCommand, SharingStrategy};
use crate::state_stream::{ReadOnlyStateStream, StateStream};
use flowcast_core::{CancellationToken, Flow, FlowCollector, FlowTask};
use futures::future::{select, Either};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;

/// A hot stream the engine can collect an upstream into.
pub(crate) trait ShareTarget<T: Send>: FlowCollector<T> + Clone + Sync + 'static {
    fn subscription_count(&self) -> ReadOnlyStateStream<usize>;

    fn reset_replay_cache(&self);
}

impl<T: Clone + Send + 'static> ShareTarget<T> for SharedStream<T> {
    fn subscription_count(&self) -> ReadOnlyStateStream<usize> {
        SharedStream::subscription_count(self)
    }

    fn reset_replay_cache(&self) {
        SharedStream::reset_replay_cache(self);
    }
}

impl<T: Clone + Send + 'static> ShareTarget<T> for StateStream<T> {
    fn subscription_count(&self) -> ReadOnlyStateStream<usize> {
        StateStream::subscription_count(self)
    }

    // No replay cache: the current value stays.
    fn reset_replay_cache(&self) {}
}

pub(crate) fn launch<T, U, D, S>(upstream: U, target: D, scope: &CancellationToken, started: &S)
where
    T: Send + 'static,
    U: Flow<T> + 'static,
    D: ShareTarget<T>,
    S: SharingStrategy + ?Sized,
{
    let commands = started.command(target.subscription_count());
    let upstream = Arc::new(upstream);
    FlowTask::spawn_in(scope, move |cancel| drive(upstream, target, commands, cancel)).detach();
}

async fn drive<T, U, D>(
    upstream: Arc<U>,
    target: D,
    mut commands: BoxStream<'static, SharingCommand>,
    cancel: CancellationToken,
) where
    T: Send + 'static,
    U: Flow<T> + 'static,
    D: ShareTarget<T>,
{
    let mut running: Option<FlowTask> = None;

    loop {
        let command = match select(commands.next(), cancel.cancelled()).await {
            Either::Left((Some(command), _)) => command,
            Either::Left((None, _)) => {
                debug!("sharing strategy finished, keeping upstream until scope ends");
                cancel.cancelled().await;
                break;
            }
            Either::Right(((), _)) => break,
        };

        match command {
            SharingCommand::Start => {
                if running.as_ref().is_some_and(|task| !task.is_finished()) {
                    continue;
                }
                debug!("starting shared upstream");
                running = Some(start_upstream(&upstream, &target, &cancel));
            }
            SharingCommand::Stop => stop_upstream(&mut running).await,
            SharingCommand::StopAndResetReplayCache => {
                stop_upstream(&mut running).await;
                target.reset_replay_cache();
                debug!("replay cache reset");
            }
        }
    }

    stop_upstream(&mut running).await;
    debug!("sharing engine stopped");
}

fn start_upstream<T, U, D>(upstream: &Arc<U>, target: &D, engine: &CancellationToken) -> FlowTask
where
    T: Send + 'static,
    U: Flow<T> + 'static,
    D: ShareTarget<T>,
{
    let upstream = upstream.clone();
    let mut target = target.clone();
    FlowTask::spawn_in(engine, move |cancel| async move {
        match upstream.collect(&cancel, &mut target).await {
            Ok(()) => debug!("shared upstream completed"),
            Err(err) if err.is_cancelled() => debug!("shared upstream cancelled"),
            Err(err) => error!("shared upstream failed: {err}"),
        }
    })
}

async fn stop_upstream(running: &mut Option<FlowTask>) {
    if let Some(task) = running.take() {
        debug!("stopping shared upstream");
        task.stop().await;
    }
}

/// Share a cold flow as a [`SharedStream`].
pub trait ShareInExt<T>: Flow<T> + Sized + 'static
where
    T: Clone + Send + 'static,
{
    /// Share this flow, replaying the last `replay` values to new subscribers.
    ///
    /// Subscribers get room for at least [`DEFAULT_SHARE_BUFFER`](crate::DEFAULT_SHARE_BUFFER)
    /// values and slow subscribers suspend the upstream. The engine runs until
    /// `scope` is cancelled.
    fn share_in<S: SharingStrategy>(
        self,
        scope: &CancellationToken,
        started: S,
        replay: usize,
    ) -> ReadOnlySharedStream<T> {
        self.share_in_with_config(scope, started, SharedConfig::for_share_in(replay))
    }

    /// Like [`share_in`](Self::share_in) with full control over buffering.
    ///
    /// # Panics
    ///
    /// Panics if `config` does not validate.
    fn share_in_with_config<S: SharingStrategy>(
        self,
        scope: &CancellationToken,
        started: S,
        config: SharedConfig,
    ) -> ReadOnlySharedStream<T> {
        let shared = SharedStream::with_config(config);
        launch(self, shared.clone(), scope, &started);
        shared.as_read_only()
    }
}

impl<F, T> ShareInExt<T> for F
where
    F: Flow<T> + Sized + 'static,
    T: Clone + Send + 'static,
{
}

/// Hold the latest value of a cold flow in a [`StateStream`].
pub trait StateInExt<T>: Flow<T> + Sized + 'static
where
    T: Clone + Send + PartialEq + 'static,
{
    /// Conflate this flow into a state stream starting at `initial`.
    ///
    /// Stopping the upstream keeps the last value. The engine runs until
    /// `scope` is cancelled.
    fn state_in<S: SharingStrategy>(
        self,
        scope: &CancellationToken,
        started: S,
        initial: T,
    ) -> ReadOnlyStateStream<T> {
        let state = StateStream::new(initial);
        launch(self, state.clone(), scope, &started);
        state.as_read_only()
    }
}

impl<F, T> StateInExt<T> for F
where
    F: Flow<T> + Sized + 'static,
    T: Clone + Send + PartialEq + 'static,
{
}
