// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::state_stream::ReadOnlyStateStream;
use async_stream::stream;
use core::time::Duration;
use flowcast_runtime::runtime::Runtime;
use flowcast_runtime::timer::Timer;
use flowcast_runtime::DefaultRuntime;
use futures::future::{self, select, BoxFuture, Either};
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};

/// Instruction from a [`SharingStrategy`] to the sharing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SharingCommand {
    /// Start collecting the upstream, unless already running.
    Start,
    /// Stop collecting the upstream, keeping the replay cache.
    Stop,
    /// Stop collecting the upstream and clear the replay cache.
    StopAndResetReplayCache,
}

/// Decides when a shared upstream should run.
///
/// The engine hands the strategy the destination's subscription count and
/// follows the commands it yields. The count is conflated, so implementations
/// must react to the count they see rather than to every individual change.
pub trait SharingStrategy: Send + Sync + 'static {
    fn command(
        &self,
        subscription_count: ReadOnlyStateStream<usize>,
    ) -> BoxStream<'static, SharingCommand>;
}

/// The built-in sharing strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharingStarted {
    /// Start immediately and never stop.
    Eagerly,
    /// Start on the first subscriber and never stop.
    Lazily,
    /// Run while there are subscribers.
    ///
    /// After the last subscriber leaves, wait `stop_timeout` before stopping,
    /// then `replay_expiration` before clearing the replay cache. A zero
    /// duration acts in the same step; `Duration::MAX` never fires.
    WhileSubscribed {
        stop_timeout: Duration,
        replay_expiration: Duration,
    },
}

impl SharingStarted {
    pub const fn while_subscribed(stop_timeout: Duration, replay_expiration: Duration) -> Self {
        Self::WhileSubscribed {
            stop_timeout,
            replay_expiration,
        }
    }

    /// Stop as soon as the last subscriber leaves and keep the replay cache.
    pub const fn while_subscribed_default() -> Self {
        Self::while_subscribed(Duration::ZERO, Duration::MAX)
    }
}

impl Default for SharingStarted {
    fn default() -> Self {
        Self::while_subscribed_default()
    }
}

impl SharingStrategy for SharingStarted {
    fn command(
        &self,
        subscription_count: ReadOnlyStateStream<usize>,
    ) -> BoxStream<'static, SharingCommand> {
        match *self {
            Self::Eagerly => stream::once(future::ready(SharingCommand::Start)).boxed(),
            Self::Lazily => subscription_count
                .subscribe()
                .filter(|count| future::ready(*count > 0))
                .take(1)
                .map(|_| SharingCommand::Start)
                .boxed(),
            Self::WhileSubscribed {
                stop_timeout,
                replay_expiration,
            } => while_subscribed::<DefaultRuntime>(
                subscription_count,
                stop_timeout,
                replay_expiration,
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    StopTimeout,
    ReplayExpiration,
}

enum Input {
    Count(Option<usize>),
    TimerFired,
}

fn arm<R: Runtime>(timer: &R::Timer, duration: Duration) -> BoxFuture<'static, ()> {
    if duration == Duration::MAX {
        future::pending().boxed()
    } else {
        timer.sleep_future(duration).boxed()
    }
}

fn while_subscribed<R: Runtime>(
    subscription_count: ReadOnlyStateStream<usize>,
    stop_timeout: Duration,
    replay_expiration: Duration,
) -> BoxStream<'static, SharingCommand> {
    let timer = R::Timer::default();

    stream! {
        let mut counts = subscription_count.subscribe();
        let mut started = false;
        let mut pending: Option<(Phase, BoxFuture<'static, ()>)> = None;

        loop {
            let input = match pending.as_mut() {
                Some((_, sleep)) => match select(counts.next(), sleep.as_mut()).await {
                    Either::Left((count, _)) => Input::Count(count),
                    Either::Right(((), _)) => Input::TimerFired,
                },
                None => Input::Count(counts.next().await),
            };

            let stop_now = match input {
                Input::Count(None) => break,
                Input::Count(Some(count)) if count > 0 => {
                    pending = None;
                    if !started {
                        started = true;
                        yield SharingCommand::Start;
                    }
                    false
                }
                Input::Count(Some(_)) => {
                    if started && pending.is_none() {
                        if stop_timeout.is_zero() {
                            true
                        } else {
                            pending = Some((Phase::StopTimeout, arm::<R>(&timer, stop_timeout)));
                            false
                        }
                    } else {
                        false
                    }
                }
                Input::TimerFired => match pending.take() {
                    Some((Phase::StopTimeout, _)) => true,
                    Some((Phase::ReplayExpiration, _)) => {
                        yield SharingCommand::StopAndResetReplayCache;
                        false
                    }
                    None => false,
                },
            };

            if stop_now {
                started = false;
                yield SharingCommand::Stop;
                if replay_expiration.is_zero() {
                    yield SharingCommand::StopAndResetReplayCache;
                } else {
                    pending = Some((Phase::ReplayExpiration, arm::<R>(&timer, replay_expiration)));
                }
            }
        }
    }
    .boxed()
}
