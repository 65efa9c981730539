// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Runtime-agnostic cancellation tree.
//!
//! A [`CancellationToken`] is a node in a tree of cancellation scopes. Cancelling
//! a token cancels every token derived from it through [`CancellationToken::child_token`],
//! transitively. Cancellation never travels upwards: a child can be cancelled on its
//! own without affecting its parent or siblings.
//!
//! Every collection, sharing engine and upstream run in this workspace receives
//! a token from this tree, so cancelling a scope tears down everything started in it.

use core::future::Future;
use core::pin::Pin;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::{Context, Poll};
use event_listener::{Event, EventListener};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Runtime-agnostic, hierarchical cancellation token.
///
/// A `CancellationToken` can be cloned to create multiple handles to the same
/// cancellation state. When `cancel()` is called on any clone, all waiters on
/// `cancelled()` are notified and every child token is cancelled as well.
///
/// # Example
///
/// ```
/// use flowcast_core::CancellationToken;
///
/// let scope = CancellationToken::new();
/// let collection = scope.child_token();
/// let upstream = collection.child_token();
///
/// scope.cancel();
///
/// assert!(collection.is_cancelled());
/// assert!(upstream.is_cancelled());
/// ```
#[derive(Clone, Debug)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cancelled: AtomicBool,
    event: Event,
    children: Mutex<Vec<Weak<Inner>>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            event: Event::new(),
            children: Mutex::new(Vec::new()),
        }
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        self.event.notify(usize::MAX);

        // Children registered after the flag flipped see it under this lock.
        let children = core::mem::take(&mut *self.children.lock());
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

impl CancellationToken {
    /// Create a new root token.
    ///
    /// The token is initially not cancelled.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner::new()),
        }
    }

    /// Create a token that is cancelled whenever `self` is.
    ///
    /// Cancelling the child does not affect `self`. If `self` is already
    /// cancelled the child starts out cancelled.
    #[must_use]
    pub fn child_token(&self) -> Self {
        let child = Arc::new(Inner::new());
        {
            let mut children = self.inner.children.lock();
            if !self.is_cancelled() {
                children.retain(|weak| weak.strong_count() > 0);
                children.push(Arc::downgrade(&child));
                return Self { inner: child };
            }
        }

        child.cancel();
        Self { inner: child }
    }

    /// Cancel the token and all of its descendants, waking all listeners.
    ///
    /// This method is idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Check if the token has been cancelled (non-blocking).
    ///
    /// # Example
    ///
    /// ```
    /// use flowcast_core::CancellationToken;
    ///
    /// let token = CancellationToken::new();
    /// assert!(!token.is_cancelled());
    ///
    /// token.cancel();
    /// assert!(token.is_cancelled());
    /// ```
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Wait asynchronously until the token is cancelled.
    ///
    /// If the token is already cancelled, this returns immediately.
    pub fn cancelled(&self) -> Cancelled<'_> {
        Cancelled {
            token: self,
            listener: None,
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`CancellationToken::cancelled()`].
///
/// This future resolves when the token is cancelled.
pub struct Cancelled<'a> {
    token: &'a CancellationToken,
    listener: Option<EventListener>,
}

impl Future for Cancelled<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        loop {
            if self.token.is_cancelled() {
                return Poll::Ready(());
            }

            match self.listener.as_mut() {
                Some(listener) => {
                    if Pin::new(listener).poll(cx).is_pending() {
                        return Poll::Pending;
                    }
                    self.listener = None;
                }
                None => {
                    // Re-checked at the top of the loop once registered, so a
                    // cancel() racing with listen() is not lost.
                    self.listener = Some(self.token.inner.event.listen());
                }
            }
        }
    }
}
