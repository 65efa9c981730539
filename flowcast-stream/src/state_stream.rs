// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Hot stream holding exactly one current value.
//!
//! A [`StateStream`] always has a value. Writes that are equal to the current
//! value under the stream's equality policy are ignored entirely; any other
//! write replaces the value and notifies subscribers. Each subscriber holds at
//! most one undelivered value, so a slow subscriber skips intermediate values
//! but always ends up on the latest one.
//!
//! ## Example
//!
//! ```
//! use flowcast_stream::StateStream;
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let temperature = StateStream::new(20);
//! let mut display = temperature.subscribe();
//!
//! assert_eq!(display.next().await, Some(20));
//!
//! temperature.update(|t| t + 1);
//! temperature.update(|t| t + 1);
//!
//! assert_eq!(temperature.value(), 22);
//! assert_eq!(display.next().await, Some(22));
//! # }
//! ```

use crate::collect::collect_into;
use crate::subscriber::{SubscriberSlot, Subscription};
use async_trait::async_trait;
use core::pin::Pin;
use core::task::{Context, Poll};
use flowcast_core::{CancellationToken, Flow, FlowCollector, Result};
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Decides whether two values count as the same state.
pub type EqualityPolicy<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

struct StateCell<T> {
    value: T,
    subscribers: Vec<Arc<SubscriberSlot<T>>>,
    counter: Option<StateStream<usize>>,
}

impl<T> StateCell<T> {
    fn publish_count(&self) {
        if let Some(counter) = &self.counter {
            counter.set_value(self.subscribers.len());
        }
    }
}

struct StateInner<T> {
    equality: EqualityPolicy<T>,
    cell: Mutex<StateCell<T>>,
}

/// A conflated hot stream with a single current value.
///
/// See the [module documentation](crate::state_stream) for details.
pub struct StateStream<T> {
    inner: Arc<StateInner<T>>,
}

impl<T> Clone for StateStream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + PartialEq + 'static> StateStream<T> {
    /// Creates a state stream comparing values with `PartialEq`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self::with_equality(initial, |a: &T, b: &T| a == b)
    }
}

impl<T: Clone + Send + 'static> StateStream<T> {
    /// Creates a state stream with a custom equality policy.
    ///
    /// Two values the policy calls equal are treated as the same state: writing
    /// one over the other changes nothing and notifies nobody.
    #[must_use]
    pub fn with_equality<F>(initial: T, equality: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(StateInner {
                equality: Arc::new(equality),
                cell: Mutex::new(StateCell {
                    value: initial,
                    subscribers: Vec::new(),
                    counter: None,
                }),
            }),
        }
    }

    /// The current value.
    ///
    /// Never blocks on emitters for longer than a clone of the value.
    pub fn value(&self) -> T {
        self.inner.cell.lock().value.clone()
    }

    /// Replace the current value, notifying subscribers if it changed.
    pub fn set_value(&self, value: T) {
        let mut cell = self.inner.cell.lock();
        self.commit(&mut cell, value);
    }

    /// Same as [`set_value`](Self::set_value); a state stream never waits.
    pub async fn emit(&self, value: T) {
        self.set_value(value);
    }

    /// Same as [`set_value`](Self::set_value); always succeeds.
    pub fn try_emit(&self, value: T) -> bool {
        self.set_value(value);
        true
    }

    /// Atomically replace the value with `f(current)`.
    ///
    /// `f` runs inside the stream's critical section and must not call back
    /// into this stream.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let mut cell = self.inner.cell.lock();
        let next = f(&cell.value);
        self.commit(&mut cell, next);
    }

    /// Like [`update`](Self::update), returning the value after the update.
    pub fn update_and_get<F>(&self, f: F) -> T
    where
        F: FnOnce(&T) -> T,
    {
        let mut cell = self.inner.cell.lock();
        let next = f(&cell.value);
        self.commit(&mut cell, next);
        cell.value.clone()
    }

    /// Like [`update`](Self::update), returning the value before the update.
    pub fn get_and_update<F>(&self, f: F) -> T
    where
        F: FnOnce(&T) -> T,
    {
        let mut cell = self.inner.cell.lock();
        let previous = cell.value.clone();
        let next = f(&previous);
        self.commit(&mut cell, next);
        previous
    }

    /// Set the value to `update` if the current value equals `expect`.
    ///
    /// Returns `true` whenever `expect` matched, including when `update` is
    /// equal to the current value (in which case nobody is notified).
    pub fn compare_and_set(&self, expect: &T, update: T) -> bool {
        let mut cell = self.inner.cell.lock();
        if !(self.inner.equality)(&cell.value, expect) {
            return false;
        }
        self.commit(&mut cell, update);
        true
    }

    fn commit(&self, cell: &mut StateCell<T>, next: T) {
        if (self.inner.equality)(&cell.value, &next) {
            return;
        }
        for slot in &cell.subscribers {
            slot.offer_dropping_oldest(next.clone());
        }
        cell.value = next;
    }

    /// Attach a new subscriber; its first value is the one current right now.
    pub fn subscribe(&self) -> StateSubscription<T> {
        let slot = Arc::new(SubscriberSlot::new(1));
        let current = {
            let mut cell = self.inner.cell.lock();
            cell.subscribers.push(slot.clone());
            cell.publish_count();
            cell.value.clone()
        };

        let owner: Weak<StateInner<T>> = Arc::downgrade(&self.inner);
        let subscription = Subscription::new(
            slot,
            Box::new(move |slot| {
                if let Some(inner) = owner.upgrade() {
                    let mut cell = inner.cell.lock();
                    cell.subscribers.retain(|s| !Arc::ptr_eq(s, slot));
                    cell.publish_count();
                }
            }),
        );

        StateSubscription {
            inner: subscription,
            equality: self.inner.equality.clone(),
            current: Some(current),
            last: None,
        }
    }

    /// The number of active subscriptions, as a state stream.
    ///
    /// The counter is created on first use, so a counter never instruments
    /// itself unless someone asks for its own count.
    pub fn subscription_count(&self) -> ReadOnlyStateStream<usize> {
        let mut cell = self.inner.cell.lock();
        let count = cell.subscribers.len();
        cell.counter
            .get_or_insert_with(|| StateStream::new(count))
            .as_read_only()
    }

    /// A view of this stream that cannot be written to.
    pub fn as_read_only(&self) -> ReadOnlyStateStream<T> {
        ReadOnlyStateStream {
            stream: self.clone(),
        }
    }
}

#[async_trait]
impl<T: Clone + Send + 'static> Flow<T> for StateStream<T> {
    async fn collect(
        &self,
        cancel: &CancellationToken,
        collector: &mut (dyn FlowCollector<T> + '_),
    ) -> Result<()> {
        collect_into(self.subscribe().map(Ok), cancel, collector).await
    }
}

#[async_trait]
impl<T: Clone + Send + 'static> FlowCollector<T> for StateStream<T> {
    async fn emit(&mut self, value: T) -> Result<()> {
        self.set_value(value);
        Ok(())
    }
}

/// Subscription to a [`StateStream`].
///
/// Yields the value that was current when it subscribed, then every later
/// value it manages to observe. Besides conflating, it never yields a value
/// equal to the one it yielded last, so a value that flips away and back
/// between two polls is not observed twice.
pub struct StateSubscription<T> {
    inner: Subscription<T>,
    equality: EqualityPolicy<T>,
    current: Option<T>,
    last: Option<T>,
}

// Values are only ever moved in and out, never pinned.
impl<T> Unpin for StateSubscription<T> {}

impl<T: Clone> Stream for StateSubscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = &mut *self;
        if let Some(current) = this.current.take() {
            this.last = Some(current.clone());
            return Poll::Ready(Some(current));
        }

        loop {
            let value = match this.inner.poll_next_unpin(cx) {
                Poll::Ready(Some(value)) => value,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            };

            if let Some(last) = &this.last {
                if (this.equality)(last, &value) {
                    continue;
                }
            }
            this.last = Some(value.clone());
            return Poll::Ready(Some(value));
        }
    }
}

/// Read-only view of a [`StateStream`].
pub struct ReadOnlyStateStream<T> {
    stream: StateStream<T>,
}

impl<T> Clone for ReadOnlyStateStream<T> {
    fn clone(&self) -> Self {
        Self {
            stream: self.stream.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> ReadOnlyStateStream<T> {
    pub fn value(&self) -> T {
        self.stream.value()
    }

    pub fn subscribe(&self) -> StateSubscription<T> {
        self.stream.subscribe()
    }

    pub fn subscription_count(&self) -> ReadOnlyStateStream<usize> {
        self.stream.subscription_count()
    }
}

#[async_trait]
impl<T: Clone + Send + 'static> Flow<T> for ReadOnlyStateStream<T> {
    async fn collect(
        &self,
        cancel: &CancellationToken,
        collector: &mut (dyn FlowCollector<T> + '_),
    ) -> Result<()> {
        self.stream.collect(cancel, collector).await
    }
}
