//! # vshelpers
//!
//! Helpers that turn heterogeneous values into bytes and capture the output
//! of external processes.
//!
//! ## Highlights
//!
//! - **Normalization**: [`normalize`] resolves buffers, nil, deferred values,
//!   readable streams, JSON and anything printable into one [`Bytes`]
//!   buffer, with a bounded depth for chains of deferred values.
//! - **Stream aggregation**: [`aggregate`] drains a [`ReadableStream`],
//!   settles exactly once and detaches its listeners on every exit path.
//! - **Process capture**: [`run`] and [`ProcessRunner`] spawn a command and
//!   return its standard output, standard error and exit handle together, or
//!   the first error.
//! - **Single settlement**: [`CompletionGuard`] is the primitive the other
//!   pieces use to deliver an outcome once.
//!
//! ## Quickstart
//!
//! ```no_run
//! # async fn demo() -> vshelpers::Result<()> {
//! use vshelpers::{RunOptions, Value, normalize, run};
//!
//! let bytes = normalize(serde_json::json!({"ok": true}), None).await?;
//! assert_eq!(bytes.as_deref(), Some(&br#"{"ok":true}"#[..]));
//!
//! let lazy = Value::deferred(|_ctx| async { Ok(Value::from("later")) });
//! let bytes = normalize(lazy, Some("utf8")).await?;
//! assert_eq!(bytes.as_deref(), Some(&b"later"[..]));
//!
//! let output = run("git", ["--version"], RunOptions::new()).await?;
//! println!("{}", output.stdout_text(None)?);
//! # Ok(())
//! # }
//! ```

pub use bytes::Bytes;

pub use vshelpers_buffer::{
    Chunk, Deferred, DeferredContext, EventKind, ListenerId, Normalizer, ReadableStream,
    RecursionState, StreamEvent, Value, aggregate, is_empty_string, normalize, normalize_string,
    to_string_safe, to_string_safe_or,
};
pub use vshelpers_commons::{
    CompletionGuard, DEFAULT_ENCODING, DEFAULT_MAX_DEPTH, Encoding, EnvMap, EnvironmentProvider,
    Error, InheritedEnvironment, NormalizerConfig, Result, RunnerConfig, SharedError,
    StaticEnvironment, encode_text,
};
pub use vshelpers_process::{
    ProcessHandle, ProcessResult, ProcessRunner, RunOptions, ShellKind, run,
};
