// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Error types for flowcast streams.
//!
//! A single root [`FlowError`] covers every failure mode a collection can end with.
//! Cancellation is part of the enum but is not a failure in the domain sense:
//! collaborators should check [`FlowError::is_cancelled`] and treat it as a
//! normal shutdown.
//!
//! # Examples
//!
//! ```
//! use flowcast_core::{FlowError, Result};
//!
//! fn read_sensor() -> Result<u32> {
//!     Err(FlowError::stream_error("sensor offline"))
//! }
//!
//! assert!(read_sensor().is_err());
//! ```

/// Root error type for all flowcast operations.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// The collection was cancelled through its cancellation token.
    #[error("Collection cancelled")]
    Cancelled,

    /// Stream processing encountered an error
    ///
    /// This is a general error for producer or collector failures that don't
    /// fit other categories.
    #[error("Stream processing error: {context}")]
    StreamProcessingError {
        /// Description of what went wrong during stream processing
        context: String,
    },

    /// Custom error from user code
    ///
    /// Wraps errors produced by user-provided producers and collectors.
    #[error("User error: {0}")]
    UserError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A stream was configured with parameters it cannot honour.
    #[error("Invalid configuration: {context}")]
    InvalidConfiguration {
        /// Which parameter was rejected and why
        context: String,
    },
}

impl FlowError {
    /// Create a stream processing error with the given context
    pub fn stream_error(context: impl Into<String>) -> Self {
        Self::StreamProcessingError {
            context: context.into(),
        }
    }

    /// Create a configuration error with the given context
    pub fn invalid_configuration(context: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            context: context.into(),
        }
    }

    /// Wrap a user error
    pub fn user_error(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::UserError(Box::new(error))
    }

    /// Returns `true` if this is the cancellation outcome rather than a failure.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Specialized Result type for flowcast operations
pub type Result<T> = std::result::Result<T, FlowError>;

/// Extension trait for converting errors into `FlowError`
///
/// Implemented for every `std::error::Error + Send + Sync + 'static`, so
/// producers can turn their own failures into a `FlowError` with `?`-friendly
/// one-liners.
pub trait IntoFlowError {
    /// Convert this error into a `FlowError`
    fn into_flow_error(self) -> FlowError;
}

impl<E: std::error::Error + Send + Sync + 'static> IntoFlowError for E {
    fn into_flow_error(self) -> FlowError {
        FlowError::user_error(self)
    }
}

/// Helper trait for adding context to `Result`s
pub trait ResultExt<T> {
    /// Add context to an error
    ///
    /// User errors are flattened into a `StreamProcessingError` that carries
    /// both the context and the original message; other variants pass through.
    ///
    /// # Errors
    /// Returns `Err(FlowError)` if the underlying result is `Err`.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<FlowError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| match e.into() {
            FlowError::UserError(inner) => FlowError::StreamProcessingError {
                context: format!("{}: {inner}", context.into()),
            },
            other => other,
        })
    }
}

impl Clone for FlowError {
    fn clone(&self) -> Self {
        match self {
            Self::Cancelled => Self::Cancelled,
            Self::StreamProcessingError { context } => Self::StreamProcessingError {
                context: context.clone(),
            },
            // The boxed source can't be cloned, keep its message instead
            Self::UserError(e) => Self::StreamProcessingError {
                context: format!("User error: {e}"),
            },
            Self::InvalidConfiguration { context } => Self::InvalidConfiguration {
                context: context.clone(),
            },
        }
    }
}
