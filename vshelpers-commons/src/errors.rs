use std::collections::TryReserveError;
use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Error value emitted by a stream `error` event. Shared so every listener
/// and the eventual caller observe the same allocation.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by buffer normalization, stream aggregation and process
/// output capture.
#[derive(Debug, Error)]
pub enum Error {
    /// A chain of deferred values never produced a terminal value.
    #[error("maximum depth of {max_depth} reached while resolving deferred value")]
    RecursionLimit { max_depth: usize },

    /// The underlying stream emitted an `error` event.
    #[error("stream error: {0}")]
    Stream(SharedError),

    /// The external command could not be launched.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The external command ran but reported failure.
    #[error("command '{program}' failed ({})", describe_exit(.code, .signal))]
    Execution {
        program: String,
        code: Option<i32>,
        signal: Option<i32>,
    },

    #[error("unknown encoding: {name}")]
    UnknownEncoding { name: String },

    #[error("invalid {encoding} data: {reason}")]
    InvalidEncodedData {
        encoding: &'static str,
        reason: String,
    },

    /// The aggregation buffer could not grow.
    #[error("buffer allocation failed: {0}")]
    Capacity(#[from] TryReserveError),

    /// A deferred-value callable failed with an error of its own.
    #[error("deferred value failed: {0:#}")]
    Deferred(#[source] anyhow::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    /// The operation was torn down before it delivered an outcome.
    #[error("operation dropped before completion")]
    Interrupted,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Wrap an error produced by caller code, keeping crate errors intact.
    pub fn from_deferred(error: anyhow::Error) -> Self {
        match error.downcast::<Error>() {
            Ok(inner) => inner,
            Err(other) => Self::Deferred(other),
        }
    }

    /// Wrap an arbitrary error as a stream failure.
    pub fn stream<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Stream(Arc::new(error))
    }
}

fn describe_exit(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (*code, *signal) {
        (Some(code), _) => format!("exit code {code}"),
        (None, Some(signal)) => format!("terminated by signal {signal}"),
        (None, None) => "no exit status".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
