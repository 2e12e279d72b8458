//! Exponential backoff.

use cypherbridge_config::RetryConfig;
use rand::Rng;
use std::time::Duration;

/// Delay before retrying after `attempt` (1-based) failed.
///
/// `min(initial * multiplier^(attempt-1), max)`, then with jitter a uniform
/// perturbation of ±50%, clamped to non-negative.
pub fn delay_ms(attempt: u32, initial_ms: u64, max_ms: u64, multiplier: f64, jitter: bool) -> u64 {
    delay_with_rng(attempt, initial_ms, max_ms, multiplier, jitter, &mut rand::rng())
}

pub fn delay_with_rng<R: Rng + ?Sized>(
    attempt: u32,
    initial_ms: u64,
    max_ms: u64,
    multiplier: f64,
    jitter: bool,
    rng: &mut R,
) -> u64 {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let base = (initial_ms as f64 * multiplier.powi(exponent)).min(max_ms as f64);
    if !jitter || base <= 0.0 {
        return base.max(0.0) as u64;
    }
    let spread = base * 0.5;
    let perturbed = base + rng.random_range(-spread..=spread);
    perturbed.max(0.0).round() as u64
}

/// [`delay_ms`] with the values from a [`RetryConfig`].
pub fn delay_for(attempt: u32, config: &RetryConfig) -> Duration {
    Duration::from_millis(delay_ms(
        attempt,
        config.initial_delay_ms,
        config.max_delay_ms,
        config.multiplier,
        config.jitter,
    ))
}
