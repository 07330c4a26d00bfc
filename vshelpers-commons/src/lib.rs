//! Shared building blocks for the vshelpers crates: the error taxonomy, the
//! single-settlement [`CompletionGuard`], the encoding table used whenever
//! text becomes bytes, serde-backed configuration and the environment
//! providers injected into process execution.

pub mod config;
pub mod encoding;
pub mod env;
pub mod errors;
pub mod guard;

pub use config::{DEFAULT_MAX_DEPTH, NormalizerConfig, RunnerConfig};
pub use encoding::{DEFAULT_ENCODING, Encoding, encode_text, normalize_encoding};
pub use env::{EnvMap, EnvironmentProvider, InheritedEnvironment, StaticEnvironment};
pub use errors::{Error, Result, SharedError};
pub use guard::CompletionGuard;
