//! Timing validation for lazy-load configuration

use std::time::Duration;

use crate::utils::HarvestError;

/// Maximum trigger interval (10 minutes)
pub const MAX_INTERVAL_MS: u64 = 600_000;

/// Maximum restore / user-scroll pause delay (1 minute)
pub const MAX_DELAY_MS: u64 = 60_000;

/// Validate the trigger interval of an INIT_LAZY_LOAD config
///
/// A zero interval would spin the trigger loop, so it is rejected just like
/// a missing one.
pub fn validate_interval(interval_ms: Option<u64>) -> Result<Duration, HarvestError> {
    let ms = match interval_ms {
        Some(ms) if ms > 0 => ms,
        _ => {
            return Err(HarvestError::InvalidCommand(
                "interval is required and must be greater than 0".to_string(),
            ));
        }
    };

    if ms > MAX_INTERVAL_MS {
        return Err(HarvestError::InvalidConfig(format!(
            "interval cannot exceed {}ms ({} minutes). Received: {}ms ({:.1} minutes)",
            MAX_INTERVAL_MS,
            MAX_INTERVAL_MS / 60_000,
            ms,
            ms as f64 / 60_000.0
        )));
    }

    Ok(Duration::from_millis(ms))
}

/// Validate a restore or pause delay
pub fn validate_delay(name: &str, delay_ms: u64) -> Result<Duration, HarvestError> {
    if delay_ms > MAX_DELAY_MS {
        return Err(HarvestError::InvalidConfig(format!(
            "{} cannot exceed {}ms ({} seconds). Received: {}ms",
            name,
            MAX_DELAY_MS,
            MAX_DELAY_MS / 1000,
            delay_ms
        )));
    }

    Ok(Duration::from_millis(delay_ms))
}
