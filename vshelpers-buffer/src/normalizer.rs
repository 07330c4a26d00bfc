//! Resolve arbitrary [`Value`]s into a single byte buffer.
//!
//! Deferred values are unwrapped in a loop with an explicit depth counter,
//! so a callable that keeps returning callables ends in
//! [`Error::RecursionLimit`] rather than a blown stack.

use bytes::Bytes;
use vshelpers_commons::{Encoding, Error, NormalizerConfig, Result, normalize_encoding};

use crate::aggregator::aggregate;
use crate::strings::to_string_safe;
use crate::value::{DeferredContext, Value};

/// Progress through one chain of deferred values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecursionState {
    pub depth: usize,
    pub max_depth: usize,
    /// Normalized encoding name; `None` means the normalizer default.
    pub encoding: Option<String>,
}

impl RecursionState {
    pub fn new(encoding: Option<&str>, max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
            encoding: normalize_encoding(encoding),
        }
    }

    fn context(&self) -> DeferredContext {
        DeferredContext {
            encoding: self.encoding.clone(),
            depth: self.depth,
            max_depth: self.max_depth,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    max_depth: usize,
    default_encoding: Encoding,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            max_depth: vshelpers_commons::DEFAULT_MAX_DEPTH,
            default_encoding: Encoding::Utf8,
        }
    }
}

impl Normalizer {
    pub fn new(config: &NormalizerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            max_depth: config.max_depth,
            default_encoding: config.encoding()?,
        })
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn default_encoding(&self) -> Encoding {
        self.default_encoding
    }

    /// Normalize `value` into bytes. Nil in, `None` out; buffers are returned
    /// as they are.
    pub async fn normalize(
        &self,
        value: impl Into<Value>,
        encoding: Option<&str>,
    ) -> Result<Option<Bytes>> {
        let state = RecursionState::new(encoding, self.max_depth);
        self.normalize_with_state(value.into(), state).await
    }

    /// Normalize starting from an explicit recursion state, for callers that
    /// are themselves part of a deferred chain.
    pub async fn normalize_with_state(
        &self,
        value: Value,
        mut state: RecursionState,
    ) -> Result<Option<Bytes>> {
        let mut current = value;
        loop {
            if state.depth > state.max_depth {
                tracing::debug!(
                    max_depth = state.max_depth,
                    "deferred value chain exceeded maximum depth"
                );
                return Err(Error::RecursionLimit {
                    max_depth: state.max_depth,
                });
            }

            current = match current {
                Value::Nil => return Ok(None),
                Value::Buffer(bytes) => return Ok(Some(bytes)),
                Value::Deferred(deferred) => {
                    let next = deferred
                        .invoke(state.context())
                        .await
                        .map_err(Error::from_deferred)?;
                    tracing::trace!(depth = state.depth, next = next.kind(), "resolved deferred value");
                    state.depth += 1;
                    next
                }
                Value::Stream(stream) => {
                    let encoding = self.effective_encoding(&state);
                    return aggregate(Some(&stream), Some(&encoding)).await;
                }
                Value::Json(serde_json::Value::Null) => return Ok(None),
                Value::Json(json @ serde_json::Value::Object(_)) => {
                    return self.encode(&json.to_string(), &state).map(Some);
                }
                other => return self.encode(&to_string_safe(&other), &state).map(Some),
            };
        }
    }

    fn effective_encoding(&self, state: &RecursionState) -> String {
        state
            .encoding
            .clone()
            .unwrap_or_else(|| self.default_encoding.as_str().to_string())
    }

    fn encode(&self, text: &str, state: &RecursionState) -> Result<Bytes> {
        Encoding::resolve(state.encoding.as_deref(), self.default_encoding)?.encode(text)
    }
}

/// Normalize with the default settings (depth 63, UTF-8).
pub async fn normalize(value: impl Into<Value>, encoding: Option<&str>) -> Result<Option<Bytes>> {
    Normalizer::default().normalize(value, encoding).await
}
