// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

pub mod impls;
pub mod runtime;
pub mod timer;

#[cfg(feature = "runtime-tokio")]
pub type DefaultRuntime = impls::tokio::TokioRuntime;

#[cfg(all(feature = "runtime-smol", not(feature = "runtime-tokio")))]
pub type DefaultRuntime = impls::smol::SmolRuntime;
