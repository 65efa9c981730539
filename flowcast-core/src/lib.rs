// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Core contracts shared by every flowcast crate.
//!
//! - [`Flow`] / [`FlowCollector`]: the collection contract cold and hot streams implement
//! - [`CancellationToken`]: parent-to-child cancellation tree passed to every blocking call
//! - [`FlowTask`]: spawned task handle that cancels on drop and reports completion
//! - [`FlowError`]: the root error type

#![allow(clippy::multiple_crate_versions, clippy::doc_markdown)]
pub mod cancellation_token;
pub mod error;
pub mod flow;
pub mod flow_task;
mod logging;

pub use self::cancellation_token::{CancellationToken, Cancelled};
pub use self::error::{FlowError, IntoFlowError, Result, ResultExt};
pub use self::flow::{FlowCollector, Flow, FlowExt, FnCollector};
pub use self::flow_task::FlowTask;
