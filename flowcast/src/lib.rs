// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! # Flowcast
//!
//! Cold, shared and state streams for async Rust.
//!
//! ## Overview
//!
//! - A [`ColdStream`] is a producer blueprint: every collection runs it again.
//! - A [`SharedStream`] multicasts each emission to every subscriber and
//!   replays recent values to late ones.
//! - A [`StateStream`] holds one current value and lets slow readers skip
//!   straight to the latest.
//! - [`share_in`](ShareInExt::share_in) and [`state_in`](StateInExt::state_in)
//!   run a cold upstream into a hot stream only while a [`SharingStarted`]
//!   strategy says so, for example only while someone is subscribed.
//!
//! Every blocking call takes a [`CancellationToken`]; cancelling a parent token
//! tears down everything started under it.
//!
//! ## Quick Start
//!
//! ```rust
//! use flowcast::prelude::*;
//! use futures::StreamExt;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let scope = CancellationToken::new();
//!     let prices = ColdStream::from_values(vec![101, 102, 103]).share_in(
//!         &scope,
//!         SharingStarted::while_subscribed(Duration::from_secs(1), Duration::MAX),
//!         1,
//!     );
//!
//!     let mut ticker = prices.subscribe();
//!     assert_eq!(ticker.next().await, Some(101));
//!
//!     scope.cancel();
//! }
//! ```

pub use flowcast_core::{
    CancellationToken, Flow, FlowCollector, FlowError, FlowExt, FlowTask, FnCollector,
    IntoFlowError, Result, ResultExt,
};
pub use flowcast_runtime::{runtime::Runtime, timer::Timer, DefaultRuntime};
pub use flowcast_stream::{
    BufferOverflow, ColdStream, EqualityPolicy, ReadOnlySharedStream, ReadOnlyStateStream,
    ShareInExt, SharedConfig, SharedStream, SharingCommand, SharingStarted, SharingStrategy,
    StateInExt, StateStream, StateSubscription, Subscription, DEFAULT_SHARE_BUFFER,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use flowcast_stream::prelude::*;
}
