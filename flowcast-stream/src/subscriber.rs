// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Per-subscriber delivery channel.
//!
//! Every [`Subscription`] owns one [`SubscriberSlot`]: a bounded FIFO whose
//! capacity is fixed when the owning stream is built. Emitters only ever use the
//! non-blocking operations below while holding their stream's lock; the only
//! waiting an emitter does happens on the `ParkedEmit` returned by
//! `SubscriberSlot::park`, after that lock is released. Dropping that future
//! before the value was accepted withdraws the value.
//!
//! A receiver that is parked in `poll_next` with nothing to read is a direct
//! hand-off target: the next offered value goes straight to it without using
//! buffer space. A zero-capacity slot therefore accepts a value only when its
//! receiver is already waiting.

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use event_listener::{Event, EventListener};
use futures::channel::oneshot;
use futures::Stream;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

struct Parked<T> {
    ticket: u64,
    value: T,
    accepted: oneshot::Sender<()>,
}

struct SlotState<T> {
    handoff: Option<T>,
    buffer: VecDeque<T>,
    parked: VecDeque<Parked<T>>,
    next_ticket: u64,
    receiver_waiting: bool,
    closed: bool,
}

impl<T> SlotState<T> {
    fn can_hand_off(&self) -> bool {
        self.receiver_waiting && self.handoff.is_none() && self.buffer.is_empty()
    }

    fn has_room(&self, capacity: usize) -> bool {
        self.closed
            || (self.parked.is_empty() && (self.can_hand_off() || self.buffer.len() < capacity))
    }
}

pub(crate) struct SubscriberSlot<T> {
    capacity: usize,
    state: Mutex<SlotState<T>>,
    readable: Event,
}

enum Take<T> {
    Value(T),
    Closed,
    Empty(EventListener),
}

impl<T> SubscriberSlot<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(SlotState {
                handoff: None,
                buffer: VecDeque::with_capacity(capacity),
                parked: VecDeque::new(),
                next_ticket: 0,
                receiver_waiting: false,
                closed: false,
            }),
            readable: Event::new(),
        }
    }

    /// Seed a freshly created slot, keeping at most `capacity` of the newest values.
    pub(crate) fn preload<I>(&self, values: I)
    where
        I: ExactSizeIterator<Item = T>,
    {
        let skip = values.len().saturating_sub(self.capacity);
        let mut state = self.state.lock();
        state.buffer.extend(values.skip(skip));
    }

    /// Whether [`try_offer`](Self::try_offer) would currently accept a value.
    ///
    /// Only the receiver can take room away, so a `true` answer stays valid for
    /// an emitter holding its stream lock unless the subscription is dropped.
    pub(crate) fn has_room(&self) -> bool {
        self.state.lock().has_room(self.capacity)
    }

    /// Non-blocking send. Gives the value back when the slot is full.
    ///
    /// A closed slot swallows the value: its subscription is already gone.
    pub(crate) fn try_offer(&self, value: T) -> Result<(), T> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Ok(());
            }
            if !state.parked.is_empty() {
                return Err(value);
            }
            if state.can_hand_off() {
                state.handoff = Some(value);
                state.receiver_waiting = false;
            } else if state.buffer.len() < self.capacity {
                state.buffer.push_back(value);
            } else {
                return Err(value);
            }
        }
        self.readable.notify(1);
        Ok(())
    }

    /// Send that evicts the oldest buffered value when the slot is full.
    ///
    /// Returns `false` when the value was dropped instead, which only happens for
    /// zero-capacity slots: there is never anything buffered to evict. A value
    /// already handed off to the receiver is never evicted.
    pub(crate) fn offer_dropping_oldest(&self, value: T) -> bool {
        {
            let mut state = self.state.lock();
            if state.closed {
                return true;
            }
            if state.can_hand_off() {
                state.handoff = Some(value);
                state.receiver_waiting = false;
            } else if state.buffer.len() < self.capacity {
                state.buffer.push_back(value);
            } else if self.capacity == 0 {
                return false;
            } else {
                // Eviction and insertion share one critical section, so the
                // receiver cannot race the retry.
                state.buffer.pop_front();
                state.buffer.push_back(value);
            }
        }
        self.readable.notify(1);
        true
    }

    /// Queue `value` behind everything already buffered for this subscriber.
    ///
    /// The returned future resolves once the value moved into the buffer or
    /// was handed to the receiver, or once the subscription went away.
    /// Dropping it earlier takes the value back out of the queue.
    pub(crate) fn park(self: &Arc<Self>, value: T) -> ParkedEmit<T> {
        let (accepted, on_accepted) = oneshot::channel();
        let ticket = {
            let mut state = self.state.lock();
            let ticket = state.next_ticket;
            state.next_ticket = ticket.wrapping_add(1);
            if !state.closed {
                state.parked.push_back(Parked {
                    ticket,
                    value,
                    accepted,
                });
            }
            ticket
        };
        self.readable.notify(1);
        ParkedEmit {
            slot: self.clone(),
            ticket,
            accepted: on_accepted,
            settled: false,
        }
    }

    /// Remove a parked value that the receiver has not taken yet.
    fn withdraw(&self, ticket: u64) {
        let mut state = self.state.lock();
        if let Some(index) = state.parked.iter().position(|parked| parked.ticket == ticket) {
            state.parked.remove(index);
        }
    }

    fn take(&self) -> Take<T> {
        let mut state = self.state.lock();
        if let Some(value) = state.handoff.take() {
            return Take::Value(value);
        }
        if let Some(value) = state.buffer.pop_front() {
            if let Some(parked) = state.parked.pop_front() {
                state.buffer.push_back(parked.value);
                let _ = parked.accepted.send(());
            }
            state.receiver_waiting = false;
            return Take::Value(value);
        }
        if let Some(parked) = state.parked.pop_front() {
            let _ = parked.accepted.send(());
            state.receiver_waiting = false;
            return Take::Value(parked.value);
        }
        if state.closed {
            return Take::Closed;
        }

        state.receiver_waiting = true;
        // Registered under the lock: an offer made after we release it will notify us.
        Take::Empty(self.readable.listen())
    }

    /// Close the slot, releasing every emitter parked on it.
    pub(crate) fn close(&self) {
        let released = {
            let mut state = self.state.lock();
            state.closed = true;
            state.receiver_waiting = false;
            state.handoff = None;
            state.buffer.clear();
            core::mem::take(&mut state.parked)
        };
        // Dropping the senders resolves the emitters' completion futures.
        drop(released);
        self.readable.notify(usize::MAX);
    }
}

/// Completion of a value parked on a full subscriber.
pub(crate) struct ParkedEmit<T> {
    slot: Arc<SubscriberSlot<T>>,
    ticket: u64,
    accepted: oneshot::Receiver<()>,
    settled: bool,
}

impl<T> Future for ParkedEmit<T> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let this = &mut *self;
        // `Canceled` means the subscription closed: nothing left to wait for.
        if Pin::new(&mut this.accepted).poll(cx).is_pending() {
            return Poll::Pending;
        }
        this.settled = true;
        Poll::Ready(())
    }
}

impl<T> Drop for ParkedEmit<T> {
    fn drop(&mut self) {
        if !self.settled {
            self.slot.withdraw(self.ticket);
        }
    }
}

type Unregister<T> = Box<dyn FnOnce(&Arc<SubscriberSlot<T>>) + Send + Sync>;

/// A live subscription to a hot stream.
///
/// Yields values in emission order. Dropping the subscription unregisters it
/// from its stream, closes its channel and updates the stream's subscription
/// count, exactly once.
pub struct Subscription<T> {
    slot: Arc<SubscriberSlot<T>>,
    listener: Option<EventListener>,
    unregister: Option<Unregister<T>>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(slot: Arc<SubscriberSlot<T>>, unregister: Unregister<T>) -> Self {
        Self {
            slot,
            listener: None,
            unregister: Some(unregister),
        }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let this = &mut *self;
        loop {
            if let Some(listener) = this.listener.as_mut() {
                if Pin::new(listener).poll(cx).is_pending() {
                    return Poll::Pending;
                }
                this.listener = None;
            }

            match this.slot.take() {
                Take::Value(value) => return Poll::Ready(Some(value)),
                Take::Closed => return Poll::Ready(None),
                Take::Empty(listener) => this.listener = Some(listener),
            }
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(unregister) = self.unregister.take() {
            unregister(&self.slot);
        }
        self.slot.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{FutureExt, StreamExt};

    fn detached(slot: &Arc<SubscriberSlot<i32>>) -> Subscription<i32> {
        Subscription::new(slot.clone(), Box::new(|_| {}))
    }

    #[test]
    fn test_zero_capacity_rejects_without_waiting_receiver() {
        let slot = SubscriberSlot::new(0);

        assert_eq!(slot.try_offer(1), Err(1));
        assert!(!slot.offer_dropping_oldest(1));
    }

    #[test]
    fn test_waiting_receiver_takes_hand_off_outside_buffer() {
        // Arrange
        let slot = Arc::new(SubscriberSlot::new(1));
        let mut subscription = detached(&slot);
        assert!(subscription.next().now_or_never().is_none());

        // Act
        assert_eq!(slot.try_offer(1), Ok(()));
        assert_eq!(slot.try_offer(2), Ok(()));

        // Assert
        assert_eq!(slot.try_offer(3), Err(3));
        assert_eq!(subscription.next().now_or_never(), Some(Some(1)));
        assert_eq!(subscription.next().now_or_never(), Some(Some(2)));
    }

    #[test]
    fn test_parked_values_keep_their_place() {
        // Arrange
        let slot = Arc::new(SubscriberSlot::new(1));
        let mut subscription = detached(&slot);
        assert_eq!(slot.try_offer(1), Ok(()));
        let mut accepted = slot.park(2);

        // Act
        assert_eq!(slot.try_offer(3), Err(3));
        assert!((&mut accepted).now_or_never().is_none());

        // Assert
        assert_eq!(subscription.next().now_or_never(), Some(Some(1)));
        assert_eq!((&mut accepted).now_or_never(), Some(()));
        assert_eq!(subscription.next().now_or_never(), Some(Some(2)));
    }

    #[test]
    fn test_drop_releases_parked_emitters() {
        let slot = Arc::new(SubscriberSlot::new(0));
        let subscription = detached(&slot);
        let mut accepted = slot.park(1);

        drop(subscription);

        assert_eq!((&mut accepted).now_or_never(), Some(()));
        assert!(slot.has_room());
    }

    #[test]
    fn test_dropped_parked_emit_withdraws_its_value() {
        // Arrange
        let slot = Arc::new(SubscriberSlot::new(1));
        let mut subscription = detached(&slot);
        assert_eq!(slot.try_offer(1), Ok(()));
        let accepted = slot.park(2);

        // Act
        drop(accepted);

        // Assert
        assert_eq!(subscription.next().now_or_never(), Some(Some(1)));
        assert!(subscription.next().now_or_never().is_none());
        assert_eq!(slot.try_offer(3), Ok(()));
        assert_eq!(subscription.next().now_or_never(), Some(Some(3)));
    }

    #[test]
    fn test_dropping_accepted_parked_emit_keeps_its_value() {
        // Arrange
        let slot = Arc::new(SubscriberSlot::new(1));
        let mut subscription = detached(&slot);
        assert_eq!(slot.try_offer(1), Ok(()));
        let accepted = slot.park(2);
        assert_eq!(subscription.next().now_or_never(), Some(Some(1)));

        // Act
        drop(accepted);

        // Assert
        assert_eq!(subscription.next().now_or_never(), Some(Some(2)));
    }
}
