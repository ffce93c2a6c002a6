//! Configuration system for the tally engine
//! Covers the graph aggregator's failure and padding behavior and the
//! identifier allocator's retry bound.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod parser;
pub mod validation;

pub use parser::{ConfigFormat, ConfigParser, ConfigSerializer, TemplateExpander};
pub use validation::ConfigValidator;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// What the graph aggregator does when the tick store reports a failure
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreFailurePolicy {
    /// Keep publishing the last good state, log the failure, stay subscribed.
    #[default]
    RetainLast,
    /// Publish the failure as the final value and stop.
    Terminate,
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub aggregator: AggregatorConfig,
    pub allocator: AllocatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AggregatorConfig {
    pub failure_policy: StoreFailurePolicy,
    /// Half-width, in seconds, given to a single-instant time domain
    pub degenerate_domain_padding_secs: u64,
    /// Run recomputation on the blocking pool instead of the driver task
    pub offload_recompute: bool,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            failure_policy: StoreFailurePolicy::RetainLast,
            degenerate_domain_padding_secs: 86_400,
            offload_recompute: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AllocatorConfig {
    pub max_attempts: u32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self { max_attempts: 1000 }
    }
}

impl EngineConfig {
    /// Load, expand `${VAR}` references, parse and validate a config file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let config = ConfigParser::parse_file(path)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }
}
