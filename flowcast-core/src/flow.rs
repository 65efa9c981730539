// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! The collection contract shared by cold and hot streams.
//!
//! A [`Flow`] is anything that can be collected: it pushes values into a
//! [`FlowCollector`] until it completes, fails, or the supplied
//! [`CancellationToken`] fires. Collections are independent of one another;
//! collecting the same flow twice starts two collections.

use crate::{CancellationToken, Result};
use async_trait::async_trait;
use core::future::Future;

/// Receiving end of a collection.
///
/// `emit` is awaited inline by the delivery loop, so a slow collector slows down
/// the collection that drives it. An error returned here aborts that collection
/// and is handed back from [`Flow::collect`] unchanged.
#[async_trait]
pub trait FlowCollector<T: Send>: Send {
    /// Accept one value.
    async fn emit(&mut self, value: T) -> Result<()>;
}

/// A collectable stream of values.
#[async_trait]
pub trait Flow<T: Send>: Send + Sync {
    /// Deliver values to `collector` until the flow ends or `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Cancelled`](crate::FlowError::Cancelled) when
    /// `cancel` fires, the producer's own error when it fails, or the
    /// collector's error when it rejects a value. Hot streams never complete
    /// with `Ok`.
    async fn collect(
        &self,
        cancel: &CancellationToken,
        collector: &mut (dyn FlowCollector<T> + '_),
    ) -> Result<()>;
}

/// Adapts an async closure into a [`FlowCollector`].
pub struct FnCollector<F> {
    f: F,
}

impl<F> FnCollector<F> {
    /// Wrap `f`; it is called once per delivered value.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<T, F, Fut> FlowCollector<T> for FnCollector<F>
where
    T: Send + 'static,
    F: FnMut(T) -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send,
{
    async fn emit(&mut self, value: T) -> Result<()> {
        (self.f)(value).await
    }
}

/// Convenience methods available on every [`Flow`].
#[async_trait]
pub trait FlowExt<T: Send + 'static>: Flow<T> {
    /// Collect with an async closure instead of a collector type.
    ///
    /// # Errors
    ///
    /// Same outcomes as [`Flow::collect`].
    ///
    /// # Example
    ///
    /// ```
    /// use flowcast_core::{CancellationToken, Flow, FlowCollector, FlowExt, Result};
    /// use async_trait::async_trait;
    ///
    /// struct Three;
    ///
    /// #[async_trait]
    /// impl Flow<u32> for Three {
    ///     async fn collect(
    ///         &self,
    ///         _cancel: &CancellationToken,
    ///         collector: &mut (dyn FlowCollector<u32> + '_),
    ///     ) -> Result<()> {
    ///         for v in 1..=3 {
    ///             collector.emit(v).await?;
    ///         }
    ///         Ok(())
    ///     }
    /// }
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let mut seen = Vec::new();
    /// Three
    ///     .collect_with(&CancellationToken::new(), |v| {
    ///         seen.push(v);
    ///         async { Ok(()) }
    ///     })
    ///     .await
    ///     .unwrap();
    /// assert_eq!(seen, vec![1, 2, 3]);
    /// # }
    /// ```
    async fn collect_with<F, Fut>(&self, cancel: &CancellationToken, f: F) -> Result<()>
    where
        F: FnMut(T) -> Fut + Send,
        Fut: Future<Output = Result<()>> + Send,
    {
        let mut collector = FnCollector::new(f);
        self.collect(cancel, &mut collector).await
    }
}

impl<S, T> FlowExt<T> for S
where
    S: Flow<T> + ?Sized,
    T: Send + 'static,
{
}
