//! Engine policy switches.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A config document that could not be parsed.
#[derive(Error, Debug)]
#[error("invalid engine config: {0}")]
pub struct ConfigError(#[from] toml::de::Error);

/// Policy knobs for [`SwapEngine`](crate::SwapEngine).
///
/// ```toml
/// allow_self_swap = false
/// allow_cancellation = true
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Permit proposals whose target slot the requester already owns.
    pub allow_self_swap: bool,
    /// Permit requesters to withdraw their own pending requests.
    pub allow_cancellation: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allow_self_swap: false,
            allow_cancellation: true,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }
}
