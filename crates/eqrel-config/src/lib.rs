//! Configuration system for eqrel.
//!
//! Load engine configuration from TOML or YAML files to control numeric
//! tolerances, root ordering and verification without code changes.
//!
//! # Examples
//!
//! Load configuration from TOML string:
//!
//! ```
//! use eqrel_config::{EngineConfig, RootOrder};
//!
//! let config = EngineConfig::from_toml_str(r#"
//!     tolerance = 1e-6
//!     root_order = "ascending"
//!     max_candidates = 16
//! "#).unwrap();
//!
//! assert_eq!(config.tolerance, 1e-6);
//! assert_eq!(config.root_order, RootOrder::Ascending);
//! assert_eq!(config.max_candidates, 16);
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use eqrel_config::EngineConfig;
//!
//! let config = EngineConfig::load("eqrel.toml").unwrap_or_default();
//! // Proceeds with defaults if file doesn't exist
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest strict bound margin used when none is configured.
const DEFAULT_STRICT_STEP: f64 = 1e-6;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", default)]
pub struct EngineConfig {
    /// Absolute tolerance for numeric comparisons.
    pub tolerance: f64,

    /// Margin used to satisfy strict bounds on float variables.
    ///
    /// Unset means `max(1e-6, 10 * tolerance)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_step: Option<f64>,

    /// Order in which the roots of a quadratic equality are tried.
    pub root_order: RootOrder,

    /// Maximum number of candidate branches carried through one solve.
    pub max_candidates: usize,

    /// Whether solved assignments are re-checked.
    pub assert_mode: AssertMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            strict_step: None,
            root_order: RootOrder::Descending,
            max_candidates: 64,
            assert_mode: AssertMode::Off,
        }
    }
}

impl EngineConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file, choosing YAML for `.yaml`/`.yml`
    /// extensions and TOML otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist, fails to parse or fails
    /// validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_file(path),
            _ => Self::from_toml_file(path),
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        let step = self.strict_step();
        if !(step.is_finite() && step > self.tolerance) {
            return Err(ConfigError::Invalid(format!(
                "strict_step must exceed tolerance ({}), got {}",
                self.tolerance, step
            )));
        }
        if self.max_candidates == 0 {
            return Err(ConfigError::Invalid(
                "max_candidates must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the comparison tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the strict bound margin for float variables.
    pub fn with_strict_step(mut self, step: f64) -> Self {
        self.strict_step = Some(step);
        self
    }

    /// Effective strict bound margin: the configured step, or ten times the
    /// tolerance with a floor of `1e-6`.
    pub fn strict_step(&self) -> f64 {
        self.strict_step
            .unwrap_or_else(|| (10.0 * self.tolerance).max(DEFAULT_STRICT_STEP))
    }

    /// Sets the root order.
    pub fn with_root_order(mut self, order: RootOrder) -> Self {
        self.root_order = order;
        self
    }

    /// Sets the candidate cap.
    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates = max;
        self
    }

    /// Sets the assert mode.
    pub fn with_assert_mode(mut self, mode: AssertMode) -> Self {
        self.assert_mode = mode;
        self
    }

    /// Returns true if solved assignments are re-checked.
    pub fn verifies(&self) -> bool {
        self.assert_mode == AssertMode::Verify
    }
}

/// Order in which roots of a quadratic equality become candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootOrder {
    /// Larger root first (`x*x == 144` prefers `12`).
    #[default]
    Descending,

    /// Smaller root first.
    Ascending,
}

impl RootOrder {
    /// Sorts roots in place according to this order.
    pub fn sort(self, roots: &mut [f64]) {
        roots.sort_by(|a, b| a.total_cmp(b));
        if self == RootOrder::Descending {
            roots.reverse();
        }
    }
}

/// Assertion mode affecting solve overhead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertMode {
    /// No re-checking.
    #[default]
    Off,

    /// Re-evaluate every accepted relation on the final assignment.
    Verify,
}
