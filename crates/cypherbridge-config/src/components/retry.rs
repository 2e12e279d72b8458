//! Retry component configuration
//!
//! Backoff settings for statement-level managed retry.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one (>= 1)
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay (>= `initial_delay_ms`)
    pub max_delay_ms: u64,
    /// Exponential backoff multiplier (>= 1.0)
    pub multiplier: f64,
    /// Apply a uniform ±50% perturbation to each delay
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total attempt budget
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the initial delay
    pub fn with_initial_delay(mut self, delay_ms: u64) -> Self {
        self.initial_delay_ms = delay_ms;
        self
    }

    /// Set the maximum delay
    pub fn with_max_delay(mut self, delay_ms: u64) -> Self {
        self.max_delay_ms = delay_ms;
        self
    }

    /// Set the backoff multiplier
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Check the bounds every consumer relies on
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_attempts < 1 {
            return Err(ConfigError::Invalid {
                field: "retry.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ConfigError::Invalid {
                field: "retry.max_delay_ms",
                reason: format!(
                    "{} is smaller than initial_delay_ms ({})",
                    self.max_delay_ms, self.initial_delay_ms
                ),
            });
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                field: "retry.multiplier",
                reason: format!("{} must be a finite value >= 1.0", self.multiplier),
            });
        }
        Ok(())
    }
}
