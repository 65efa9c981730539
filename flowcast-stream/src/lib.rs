// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Cold, shared and state streams.
//!
//! # Architecture
//!
//! - **[`ColdStream`]**: a producer blueprint. Every collection runs the
//!   producer again, with its own cancellation token.
//! - **[`SharedStream`]**: a hot multicast stream with a bounded replay cache
//!   and a per-subscriber [`BufferOverflow`] policy.
//! - **[`StateStream`]**: a hot stream holding exactly one current value.
//!   Equal writes are ignored and slow subscribers skip to the latest value.
//! - **Sharing**: [`share_in`](ShareInExt::share_in) and
//!   [`state_in`](StateInExt::state_in) turn any [`Flow`](flowcast_core::Flow)
//!   into a hot stream whose upstream runs as dictated by a [`SharingStrategy`].
//!
//! All streams implement [`Flow`](flowcast_core::Flow); hot streams can also be
//! read directly as `futures::Stream`s through `subscribe()`.
//!
//! ## Example: sharing while subscribed
//!
//! ```
//! use core::time::Duration;
//! use flowcast_core::CancellationToken;
//! use flowcast_stream::{ColdStream, StateInExt, SharingStarted};
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let scope = CancellationToken::new();
//! let status = ColdStream::from_values(vec!["connecting", "online"]).state_in(
//!     &scope,
//!     SharingStarted::while_subscribed(Duration::from_secs(5), Duration::MAX),
//!     "offline",
//! );
//!
//! assert_eq!(status.value(), "offline");
//!
//! let mut watcher = status.subscribe();
//! let mut last = watcher.next().await;
//! while last != Some("online") {
//!     last = watcher.next().await;
//! }
//!
//! scope.cancel();
//! # }
//! ```

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
mod logging;

pub mod buffer_overflow;
pub mod cold_stream;
mod collect;
pub mod shared_stream;
pub mod sharing;
pub mod state_stream;
pub mod subscriber;

pub use self::buffer_overflow::BufferOverflow;
pub use self::cold_stream::ColdStream;
pub use self::shared_stream::{
    ReadOnlySharedStream, SharedConfig, SharedStream, DEFAULT_SHARE_BUFFER,
};
pub use self::sharing::{ShareInExt, SharingCommand, SharingStarted, SharingStrategy, StateInExt};
pub use self::state_stream::{EqualityPolicy, ReadOnlyStateStream, StateStream, StateSubscription};
pub use self::subscriber::Subscription;

/// Everything needed to build and share streams.
pub mod prelude {
    pub use crate::{
        BufferOverflow, ColdStream, ReadOnlySharedStream, ReadOnlyStateStream, ShareInExt,
        SharedConfig, SharedStream, SharingStarted, StateInExt, StateStream,
    };
    pub use flowcast_core::{CancellationToken, Flow, FlowCollector, FlowExt, FlowError};
}
