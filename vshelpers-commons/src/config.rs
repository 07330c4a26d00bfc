use serde::{Deserialize, Serialize};

use crate::encoding::{Encoding, normalize_encoding};
use crate::errors::{Error, Result};

/// Default bound on chained deferred values.
pub const DEFAULT_MAX_DEPTH: usize = 63;

/// Settings for value-to-buffer normalization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NormalizerConfig {
    /// Maximum number of deferred values that may be unwrapped in a row.
    #[serde(default = "NormalizerConfig::default_max_depth")]
    pub max_depth: usize,
    /// Encoding used when a call passes none (or a blank one).
    #[serde(default = "NormalizerConfig::default_encoding")]
    pub default_encoding: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::default_max_depth(),
            default_encoding: Self::default_encoding(),
        }
    }
}

impl NormalizerConfig {
    const fn default_max_depth() -> usize {
        DEFAULT_MAX_DEPTH
    }

    fn default_encoding() -> String {
        crate::encoding::DEFAULT_ENCODING.to_string()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The configured default encoding, parsed.
    pub fn encoding(&self) -> Result<Encoding> {
        Encoding::resolve(Some(&self.default_encoding), Encoding::Utf8)
    }

    pub fn validate(&self) -> Result<()> {
        self.encoding()
            .map(|_| ())
            .map_err(|err| Error::InvalidConfig(format!("default_encoding: {err}")))
    }
}

/// Settings for external process output capture.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunnerConfig {
    /// Encoding applied when normalizing captured output.
    #[serde(default)]
    pub encoding: Option<String>,
    /// Report a non-zero exit as an execution error instead of a result.
    #[serde(default = "RunnerConfig::default_fail_on_nonzero_exit")]
    pub fail_on_nonzero_exit: bool,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            encoding: None,
            fail_on_nonzero_exit: Self::default_fail_on_nonzero_exit(),
            normalizer: NormalizerConfig::default(),
        }
    }
}

impl RunnerConfig {
    const fn default_fail_on_nonzero_exit() -> bool {
        true
    }

    pub fn validate(&self) -> Result<()> {
        self.normalizer.validate()?;
        if let Some(name) = normalize_encoding(self.encoding.as_deref()) {
            name.parse::<Encoding>()
                .map_err(|err| Error::InvalidConfig(format!("encoding: {err}")))?;
        }
        Ok(())
    }
}
