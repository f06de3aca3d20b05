//! Engine configuration
//!
//! Everything a [`RationingEngine`](super::RationingEngine) needs is in
//! [`EngineConfig`]: the relative tolerance, the RNG seed used for
//! tie-breaks, and which rationing policy to build. Configs are plain serde
//! structs so callers can keep them in JSON next to their market snapshots.
//!
//! ```rust
//! use market_rationing_core_rs::orchestrator::{EngineConfig, PolicyConfig};
//!
//! let config = EngineConfig::from_json_str(r#"{"rng_seed": 7, "policy": {"type": "lottery"}}"#).unwrap();
//! assert_eq!(config.rng_seed, 7);
//! assert_eq!(config.policy, PolicyConfig::Lottery);
//! assert_eq!(config.tolerance, 1e-9);
//! ```

use crate::core::digest::canonical_digest;
use crate::core::tolerance::{Tolerance, DEFAULT_RELATIVE_TOLERANCE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rationing policy selection
///
/// Determines how the oversubscribed side is rationed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyConfig {
    /// Same fill ratio for every node (standard)
    #[default]
    Proportional,

    /// Highest priority first, seeded tie-breaks
    Priority,

    /// Seeded random serving order
    Lottery,
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Relative tolerance ε applied to invariants, scaled by `max(S, D)`
    pub tolerance: f64,

    /// Seed for tie-break randomness; each call starts from this seed
    pub rng_seed: u64,

    pub policy: PolicyConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_RELATIVE_TOLERANCE,
            rng_seed: 0,
            policy: PolicyConfig::default(),
        }
    }
}

/// Configuration could not be loaded or is unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid engine config: {0}")]
    Invalid(String),
}

impl EngineConfig {
    pub fn with_policy(mut self, policy: PolicyConfig) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_seed(mut self, rng_seed: u64) -> Self {
        self.rng_seed = rng_seed;
        self
    }

    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 || self.tolerance >= 1.0 {
            return Err(ConfigError::Invalid(format!(
                "tolerance must be in (0, 1), got {}",
                self.tolerance
            )));
        }
        Ok(())
    }

    pub fn tolerance(&self) -> Tolerance {
        Tolerance::new(self.tolerance)
    }

    /// SHA-256 of the canonical JSON form, for tagging results with the
    /// config that produced them.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        Ok(canonical_digest(self)?)
    }
}
