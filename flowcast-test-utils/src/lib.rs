// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Test utilities for the flowcast workspace.
//!
//! Intended for development and testing only, not for production code.
//!
//! - [`helpers`]: timed reads and "nothing happened" assertions on any `Stream`
//! - [`RecordingCollector`]: a [`FlowCollector`](flowcast_core::FlowCollector)
//!   that forwards every value it receives into a stream the test can read
//!
//! # Example
//!
//! ```rust
//! use flowcast_core::FlowCollector;
//! use flowcast_test_utils::helpers::unwrap_stream;
//! use flowcast_test_utils::RecordingCollector;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let (mut collector, mut received) = RecordingCollector::new();
//! collector.emit(7).await.unwrap();
//!
//! assert_eq!(unwrap_stream(&mut received, 500).await, 7);
//! # }
//! ```

pub mod helpers;
pub mod recording_collector;

pub use self::recording_collector::RecordingCollector;
