// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Hot, multicast stream with a bounded replay cache.
//!
//! A [`SharedStream`] broadcasts every emitted value to all subscribers that are
//! attached at emission time. Each subscriber gets its own channel of capacity
//! `replay + extra_buffer_capacity`; what happens when that channel is full is
//! decided by the configured [`BufferOverflow`] policy.
//!
//! ## Characteristics
//!
//! - **Hot**: values are pushed whether or not anyone listens.
//! - **Replay**: the last `replay` values are handed to every new subscriber
//!   before any live value.
//! - **Per-subscriber backpressure**: under `Suspend`, `emit` waits for slow
//!   subscribers without holding the stream lock, so other emitters and
//!   subscribers keep going.
//! - **Thread-safe**: cheap to clone; all clones share the same state.
//!
//! ## Example
//!
//! ```
//! use flowcast_stream::{BufferOverflow, SharedStream};
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let readings = SharedStream::new(2, 0, BufferOverflow::DropOldest);
//! for reading in [10, 20, 30] {
//!     readings.emit(reading).await;
//! }
//!
//! let mut late = readings.subscribe();
//! assert_eq!(late.next().await, Some(20));
//! assert_eq!(late.next().await, Some(30));
//! # }
//! ```

use crate::collect::collect_into;
use crate::logging::error;
use crate::state_stream::{ReadOnlyStateStream, StateStream};
use crate::subscriber::{SubscriberSlot, Subscription};
use crate::BufferOverflow;
use async_trait::async_trait;
use flowcast_core::{CancellationToken, Flow, FlowCollector, FlowError, Result};
use futures::future::join_all;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

/// Buffering parameters of a [`SharedStream`], fixed at construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SharedConfig {
    /// Number of most recent values replayed to new subscribers.
    pub replay: usize,
    /// Buffer space per subscriber on top of `replay`.
    pub extra_buffer_capacity: usize,
    /// Policy applied when a subscriber's buffer is full.
    pub overflow: BufferOverflow,
}

/// Per-subscriber buffer size used by `share_in` when none is given.
pub const DEFAULT_SHARE_BUFFER: usize = 64;

impl SharedConfig {
    pub const fn new(
        replay: usize,
        extra_buffer_capacity: usize,
        overflow: BufferOverflow,
    ) -> Self {
        Self {
            replay,
            extra_buffer_capacity,
            overflow,
        }
    }

    /// Build a config from signed counts, rejecting negative values.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::InvalidConfiguration`] if either count is negative
    /// or does not fit in `usize`, or if the resulting capacity overflows.
    pub fn from_signed(
        replay: i64,
        extra_buffer_capacity: i64,
        overflow: BufferOverflow,
    ) -> Result<Self> {
        let replay = usize::try_from(replay).map_err(|_| {
            FlowError::invalid_configuration(format!("replay must be non-negative, was {replay}"))
        })?;
        let extra_buffer_capacity = usize::try_from(extra_buffer_capacity).map_err(|_| {
            FlowError::invalid_configuration(format!(
                "extra_buffer_capacity must be non-negative, was {extra_buffer_capacity}"
            ))
        })?;

        let config = Self::new(replay, extra_buffer_capacity, overflow);
        config.validate()?;
        Ok(config)
    }

    /// Defaults used by `share_in`: room for at least
    /// [`DEFAULT_SHARE_BUFFER`] values per subscriber, suspending when full.
    pub fn for_share_in(replay: usize) -> Self {
        Self::new(
            replay,
            DEFAULT_SHARE_BUFFER.max(replay) - replay,
            BufferOverflow::Suspend,
        )
    }

    /// Channel capacity of every subscriber, if representable.
    pub fn capacity(&self) -> Option<usize> {
        self.replay.checked_add(self.extra_buffer_capacity)
    }

    /// # Errors
    ///
    /// Returns [`FlowError::InvalidConfiguration`] if `replay + extra_buffer_capacity`
    /// overflows.
    pub fn validate(&self) -> Result<()> {
        match self.capacity() {
            Some(_) => Ok(()),
            None => Err(FlowError::invalid_configuration(format!(
                "replay ({}) + extra_buffer_capacity ({}) overflows",
                self.replay, self.extra_buffer_capacity
            ))),
        }
    }
}

struct SharedState<T> {
    replay_cache: VecDeque<T>,
    subscribers: Vec<Arc<SubscriberSlot<T>>>,
    counter: Option<StateStream<usize>>,
}

impl<T> SharedState<T> {
    fn publish_count(&self) {
        if let Some(counter) = &self.counter {
            counter.set_value(self.subscribers.len());
        }
    }
}

struct SharedInner<T> {
    config: SharedConfig,
    capacity: usize,
    state: Mutex<SharedState<T>>,
}

/// A hot stream that multicasts each emission to every current subscriber.
///
/// See the [module documentation](crate::shared_stream) for details.
pub struct SharedStream<T> {
    inner: Arc<SharedInner<T>>,
}

impl<T> Clone for SharedStream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> SharedStream<T> {
    /// Creates a shared stream.
    ///
    /// # Panics
    ///
    /// Panics if `replay + extra_buffer_capacity` overflows `usize`.
    #[must_use]
    pub fn new(replay: usize, extra_buffer_capacity: usize, overflow: BufferOverflow) -> Self {
        Self::with_config(SharedConfig::new(replay, extra_buffer_capacity, overflow))
    }

    /// Creates a shared stream from a config.
    ///
    /// # Panics
    ///
    /// Panics if the config does not [`validate`](SharedConfig::validate):
    /// an invalid buffer layout is a programming error, never a half-built stream.
    #[must_use]
    pub fn with_config(config: SharedConfig) -> Self {
        let capacity = match config.capacity() {
            Some(capacity) => capacity,
            None => {
                error!("rejecting shared stream configuration {config:?}");
                panic!("invalid shared stream configuration: {config:?}");
            }
        };

        Self {
            inner: Arc::new(SharedInner {
                config,
                capacity,
                state: Mutex::new(SharedState {
                    replay_cache: VecDeque::with_capacity(config.replay),
                    subscribers: Vec::new(),
                    counter: None,
                }),
            }),
        }
    }

    /// The configuration this stream was built with.
    pub fn config(&self) -> SharedConfig {
        self.inner.config
    }

    /// Attach a new subscriber.
    ///
    /// The current replay cache is queued for it in the same critical section
    /// that registers it, so no emission falls between the replay and the
    /// first live value.
    pub fn subscribe(&self) -> Subscription<T> {
        let slot = Arc::new(SubscriberSlot::new(self.inner.capacity));
        {
            let mut state = self.inner.state.lock();
            slot.preload(state.replay_cache.iter().cloned());
            state.subscribers.push(slot.clone());
            state.publish_count();
        }

        let owner: Weak<SharedInner<T>> = Arc::downgrade(&self.inner);
        Subscription::new(
            slot,
            Box::new(move |slot| {
                if let Some(inner) = owner.upgrade() {
                    let mut state = inner.state.lock();
                    state.subscribers.retain(|s| !Arc::ptr_eq(s, slot));
                    state.publish_count();
                }
            }),
        )
    }

    /// Broadcast `value` to every subscriber.
    ///
    /// Under [`BufferOverflow::Suspend`] this waits until every subscriber that
    /// was full has taken the value into its buffer (or went away). The stream
    /// lock is not held while waiting. Other policies never wait.
    ///
    /// Dropping the returned future while it waits cancels the emission for
    /// every subscriber that has not accepted the value yet.
    pub async fn emit(&self, value: T) {
        let pending = {
            let mut state = self.inner.state.lock();
            self.push_replay(&mut state, &value);

            let mut pending = Vec::new();
            for slot in &state.subscribers {
                match self.inner.config.overflow {
                    BufferOverflow::Suspend => {
                        if let Err(value) = slot.try_offer(value.clone()) {
                            pending.push(slot.park(value));
                        }
                    }
                    BufferOverflow::DropOldest => {
                        slot.offer_dropping_oldest(value.clone());
                    }
                    BufferOverflow::DropLatest => {
                        let _ = slot.try_offer(value.clone());
                    }
                }
            }
            pending
        };

        join_all(pending).await;
    }

    /// Broadcast `value` without waiting.
    ///
    /// Returns `false`, leaving the stream untouched, when the policy is
    /// [`BufferOverflow::Suspend`] and some subscriber has no room. With the
    /// drop policies it always returns `true`.
    pub fn try_emit(&self, value: T) -> bool {
        let mut state = self.inner.state.lock();
        let suspend = self.inner.config.overflow == BufferOverflow::Suspend;
        if suspend && !state.subscribers.iter().all(|slot| slot.has_room()) {
            return false;
        }

        self.push_replay(&mut state, &value);
        for slot in &state.subscribers {
            if self.inner.config.overflow == BufferOverflow::DropOldest {
                slot.offer_dropping_oldest(value.clone());
            } else {
                // Room was checked above; a subscriber dropped in between just misses it.
                let _ = slot.try_offer(value.clone());
            }
        }
        true
    }

    fn push_replay(&self, state: &mut SharedState<T>, value: &T) {
        let replay = self.inner.config.replay;
        if replay == 0 {
            return;
        }
        if state.replay_cache.len() >= replay {
            state.replay_cache.pop_front();
        }
        state.replay_cache.push_back(value.clone());
    }

    /// A snapshot of the replay cache, oldest first.
    pub fn replay_cache(&self) -> Vec<T> {
        self.inner.state.lock().replay_cache.iter().cloned().collect()
    }

    /// Clear the replay cache.
    ///
    /// Values already queued for existing subscribers are still delivered.
    pub fn reset_replay_cache(&self) {
        self.inner.state.lock().replay_cache.clear();
    }

    /// The number of active subscriptions, as a state stream.
    pub fn subscription_count(&self) -> ReadOnlyStateStream<usize> {
        let mut state = self.inner.state.lock();
        let count = state.subscribers.len();
        state
            .counter
            .get_or_insert_with(|| StateStream::new(count))
            .as_read_only()
    }

    /// A view of this stream that cannot emit.
    pub fn as_read_only(&self) -> ReadOnlySharedStream<T> {
        ReadOnlySharedStream {
            stream: self.clone(),
        }
    }
}

#[async_trait]
impl<T: Clone + Send + 'static> Flow<T> for SharedStream<T> {
    async fn collect(
        &self,
        cancel: &CancellationToken,
        collector: &mut (dyn FlowCollector<T> + '_),
    ) -> Result<()> {
        collect_into(self.subscribe().map(Ok), cancel, collector).await
    }
}

#[async_trait]
impl<T: Clone + Send + 'static> FlowCollector<T> for SharedStream<T> {
    async fn emit(&mut self, value: T) -> Result<()> {
        SharedStream::emit(self, value).await;
        Ok(())
    }
}

/// Read-only view of a [`SharedStream`].
pub struct ReadOnlySharedStream<T> {
    stream: SharedStream<T>,
}

impl<T> Clone for ReadOnlySharedStream<T> {
    fn clone(&self) -> Self {
        Self {
            stream: self.stream.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> ReadOnlySharedStream<T> {
    pub fn subscribe(&self) -> Subscription<T> {
        self.stream.subscribe()
    }

    pub fn replay_cache(&self) -> Vec<T> {
        self.stream.replay_cache()
    }

    pub fn subscription_count(&self) -> ReadOnlyStateStream<usize> {
        self.stream.subscription_count()
    }

    pub fn config(&self) -> SharedConfig {
        self.stream.config()
    }
}

#[async_trait]
impl<T: Clone + Send + 'static> Flow<T> for ReadOnlySharedStream<T> {
    async fn collect(
        &self,
        cancel: &CancellationToken,
        collector: &mut (dyn FlowCollector<T> + '_),
    ) -> Result<()> {
        self.stream.collect(cancel, collector).await
    }
}
