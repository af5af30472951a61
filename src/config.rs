//! Construction configuration: `SpaceConfig`/`StoreConfig`, loadable from
//! defaults, an optional `vstore.toml`, and `VSTORE_*` environment
//! variables.
//!
//! Layered with a `figment` pipeline (`Serialized::defaults` merged with
//! `Toml::file` merged with `Env::prefixed(...)`). Validation is folded
//! into the crate's single `Error` type instead of a separate config-only
//! error enum, since `StoreConfig::validate()` reports the same
//! precondition violations the rest of the core already reports as
//! `Error::InvalidArgument`.

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{ElementType, Metric, SimdLevel};

/// Vector-space construction parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceConfig {
    /// Logical dimensionality.
    pub dim: usize,
    /// Distance/similarity metric.
    pub metric: Metric,
    /// Element type of stored vectors.
    pub element_type: ElementType,
    /// Requested SIMD acceleration level.
    pub simd_level: SimdLevel,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            dim: 128,
            metric: Metric::L2,
            element_type: ElementType::Float32,
            simd_level: SimdLevel::Scalar,
        }
    }
}

/// Store construction parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Initial `reserved_id`; also the minimum `next_id`.
    pub reserved: u64,
    /// Slots per vector batch.
    pub batch_size: usize,
    /// Upper bound on lid; `add` fails once it would be reached.
    pub max_elements: u64,
    /// Vector-space parameters.
    pub space: SpaceConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            reserved: 0,
            batch_size: 1024,
            max_elements: 1_000_000,
            space: SpaceConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Loads configuration layered as defaults < `vstore.toml` in the
    /// current directory < `VSTORE_`-prefixed environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the layered configuration
    /// fails to parse or deserialize.
    pub fn load() -> Result<Self> {
        Self::load_from_path("vstore.toml")
    }

    /// Loads configuration from a specific file path, same layering as
    /// [`StoreConfig::load`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the layered configuration
    /// fails to parse or deserialize.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("VSTORE_").split("_").lowercase(false));
        figment
            .extract()
            .map_err(|e| Error::InvalidArgument(format!("failed to load config: {e}")))
    }

    /// Builds a configuration from a TOML string layered over defaults,
    /// without consulting environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the TOML fails to parse or
    /// deserialize.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str));
        figment
            .extract()
            .map_err(|e| Error::InvalidArgument(format!("failed to parse config: {e}")))
    }

    /// Rejects `reserved > max_elements`, `batch_size == 0`, and
    /// `dim == 0`, folding the core's scattered precondition checks into
    /// one place callers can run ahead of construction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] describing the first violation
    /// found.
    pub fn validate(&self) -> Result<()> {
        if self.reserved > self.max_elements {
            return Err(Error::InvalidArgument(format!(
                "reserved {} exceeds max_elements {}",
                self.reserved, self.max_elements
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidArgument("batch_size must be nonzero".into()));
        }
        if self.space.dim == 0 {
            return Err(Error::InvalidArgument("dim must be nonzero".into()));
        }
        Ok(())
    }
}
