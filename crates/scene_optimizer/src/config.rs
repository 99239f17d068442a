//! Configuration system
//!
//! Every pass config is a plain serde-derived struct with hand-picked
//! defaults; [`OptimizerConfig`] aggregates them for the orchestrator. The
//! [`Config`] trait adds optional TOML/RON file round-tripping so tools can
//! keep tuned settings next to their assets.

pub use serde::{Deserialize, Serialize};

use crate::optimize::{DedupConfig, InstancingConfig, MergeConfig};

/// Configuration trait: serde-backed load/save over TOML and RON
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file, picking the format by extension
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        if path.ends_with(".toml") {
            let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file, picking the format by extension
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, Default::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Aggregated configuration for the full optimization pipeline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Material deduplication settings
    pub dedup: DedupConfig,
    /// Mesh instancing settings
    pub instancing: InstancingConfig,
    /// Mesh merging settings
    pub merge: MergeConfig,
}

impl OptimizerConfig {
    /// Create a configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the deduplication settings
    pub fn with_dedup(mut self, dedup: DedupConfig) -> Self {
        self.dedup = dedup;
        self
    }

    /// Replace the instancing settings
    pub fn with_instancing(mut self, instancing: InstancingConfig) -> Self {
        self.instancing = instancing;
        self
    }

    /// Replace the merge settings
    pub fn with_merge(mut self, merge: MergeConfig) -> Self {
        self.merge = merge;
        self
    }

    /// Validate all pass settings
    pub fn validate(&self) -> Result<(), String> {
        self.dedup.validate()?;
        self.instancing.validate()?;
        self.merge.validate()?;
        Ok(())
    }
}

impl Config for OptimizerConfig {}
