// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Cold streams: a producer that runs once per collection.
//!
//! A [`ColdStream`] stores a factory. Every call to [`Flow::collect`] invokes the
//! factory with a fresh cancellation token and drives the stream it returns,
//! so concurrent collections never share producer state.
//!
//! ## Example
//!
//! ```
//! use flowcast_core::{CancellationToken, FlowExt};
//! use flowcast_stream::ColdStream;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let countdown = ColdStream::new(|_cancel| {
//!     async_stream::try_stream! {
//!         for n in (1..=3).rev() {
//!             yield n;
//!         }
//!     }
//! });
//!
//! let mut seen = Vec::new();
//! countdown
//!     .collect_with(&CancellationToken::new(), |n| {
//!         seen.push(n);
//!         async { Ok(()) }
//!     })
//!     .await
//!     .unwrap();
//!
//! assert_eq!(seen, vec![3, 2, 1]);
//! # }
//! ```

use crate::collect::collect_into;
use async_trait::async_trait;
use flowcast_core::{CancellationToken, Flow, FlowCollector, Result};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use std::sync::Arc;

type Producer<T> = dyn Fn(CancellationToken) -> BoxStream<'static, Result<T>> + Send + Sync;

/// A reusable producer blueprint.
pub struct ColdStream<T> {
    producer: Arc<Producer<T>>,
}

impl<T> Clone for ColdStream<T> {
    fn clone(&self) -> Self {
        Self {
            producer: self.producer.clone(),
        }
    }
}

impl<T: Send + 'static> ColdStream<T> {
    /// Creates a cold stream from a factory.
    ///
    /// The factory receives a token that is cancelled when the collection
    /// ends for any reason; long-running producers should watch it. An `Err`
    /// item ends the collection with that error.
    pub fn new<F, S>(factory: F) -> Self
    where
        F: Fn(CancellationToken) -> S + Send + Sync + 'static,
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Self {
            producer: Arc::new(move |cancel| factory(cancel).boxed()),
        }
    }

    /// A cold stream that emits the given values on every collection.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T> + Clone + Send + Sync + 'static,
        I::IntoIter: Send + 'static,
    {
        Self::new(move |_cancel| stream::iter(values.clone()).map(Ok))
    }
}

#[async_trait]
impl<T: Send + 'static> Flow<T> for ColdStream<T> {
    async fn collect(
        &self,
        cancel: &CancellationToken,
        collector: &mut (dyn FlowCollector<T> + '_),
    ) -> Result<()> {
        let run = cancel.child_token();
        let result = collect_into((self.producer)(run.clone()), cancel, collector).await;
        run.cancel();
        result
    }
}
