// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

pub mod engine;
pub mod strategy;

pub use engine::{ShareInExt, StateInExt};
pub use strategy::{SharingCommand, SharingStarted, SharingStrategy};
