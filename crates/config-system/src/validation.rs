//! Configuration validation utilities

use crate::{AggregatorConfig, AllocatorConfig, ConfigError, EngineConfig, Result};

/// Ten years, the widest padding a single-instant domain may get
const MAX_DOMAIN_PADDING_SECS: u64 = 10 * 365 * 86_400;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a complete configuration
    pub fn validate(config: &EngineConfig) -> Result<()> {
        Self::validate_aggregator(&config.aggregator)?;
        Self::validate_allocator(&config.allocator)?;
        Ok(())
    }

    fn validate_aggregator(aggregator: &AggregatorConfig) -> Result<()> {
        let padding = aggregator.degenerate_domain_padding_secs;
        if padding == 0 || padding > MAX_DOMAIN_PADDING_SECS {
            return Err(ConfigError::Validation(format!(
                "Invalid degenerate_domain_padding_secs: {}. Must be between 1 and {}",
                padding, MAX_DOMAIN_PADDING_SECS
            )));
        }

        if !aggregator.offload_recompute {
            log::debug!("Graph recomputation will run on the driver task");
        }

        Ok(())
    }

    fn validate_allocator(allocator: &AllocatorConfig) -> Result<()> {
        if allocator.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "Allocator max_attempts must be greater than 0".to_string(),
            ));
        }

        if allocator.max_attempts < 10 {
            log::warn!(
                "Allocator max_attempts is {}; collisions may surface as errors",
                allocator.max_attempts
            );
        }

        Ok(())
    }
}
