use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::{HarvestError, validate_delay, validate_interval};

/// INIT_LAZY_LOAD payload, camelCase on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LazyLoadSettings {
    /// Milliseconds between trigger cycles
    #[serde(default)]
    pub interval: Option<u64>,

    /// Trigger cycles before the loop stops by itself
    #[serde(default)]
    pub step_count: Option<u64>,

    #[serde(default)]
    pub debug: bool,

    #[serde(default = "default_true")]
    pub use_actual_scroll: bool,

    #[serde(default = "default_scroll_amount")]
    pub scroll_amount: f64,

    #[serde(default = "default_restore_delay")]
    pub restore_delay: u64,

    #[serde(default = "default_true")]
    pub detect_user_scrolling: bool,

    #[serde(default = "default_user_scroll_pause")]
    pub user_scroll_pause_time: u64,

    /// Expose `trigger_lazy_load()` on the handle
    #[serde(default = "default_true")]
    pub expose_direct_trigger: bool,
}

fn default_true() -> bool {
    true
}

fn default_scroll_amount() -> f64 {
    100.0
}

fn default_restore_delay() -> u64 {
    10
}

fn default_user_scroll_pause() -> u64 {
    1500
}

impl Default for LazyLoadSettings {
    fn default() -> Self {
        Self {
            interval: Some(3000),
            step_count: Some(10_000),
            debug: false,
            use_actual_scroll: true,
            scroll_amount: default_scroll_amount(),
            restore_delay: default_restore_delay(),
            detect_user_scrolling: true,
            user_scroll_pause_time: default_user_scroll_pause(),
            expose_direct_trigger: true,
        }
    }
}

/// Validated, immutable trigger configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerConfig {
    interval: Duration,
    max_steps: Option<u64>,
    scroll_amount_px: f64,
    restore_delay: Duration,
    user_scroll_pause: Duration,
    use_real_scroll: bool,
    detect_user_scroll: bool,
    debug: bool,
}

impl TriggerConfig {
    /// Config with the default scroll settings and the given cadence.
    /// `max_steps: None` runs until stopped.
    pub fn new(interval: Duration, max_steps: Option<u64>) -> Self {
        Self {
            interval,
            max_steps,
            scroll_amount_px: default_scroll_amount(),
            restore_delay: Duration::from_millis(default_restore_delay()),
            user_scroll_pause: Duration::from_millis(default_user_scroll_pause()),
            use_real_scroll: true,
            detect_user_scroll: true,
            debug: false,
        }
    }

    pub fn with_real_scroll(mut self, enabled: bool, amount_px: f64) -> Self {
        self.use_real_scroll = enabled;
        self.scroll_amount_px = amount_px;
        self
    }

    pub fn with_restore_delay(mut self, delay: Duration) -> Self {
        self.restore_delay = delay;
        self
    }

    pub fn with_user_scroll_detection(mut self, enabled: bool, pause: Duration) -> Self {
        self.detect_user_scroll = enabled;
        self.user_scroll_pause = pause;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_steps(&self) -> Option<u64> {
        self.max_steps
    }

    pub fn scroll_amount_px(&self) -> f64 {
        self.scroll_amount_px
    }

    pub fn restore_delay(&self) -> Duration {
        self.restore_delay
    }

    pub fn user_scroll_pause(&self) -> Duration {
        self.user_scroll_pause
    }

    pub fn use_real_scroll(&self) -> bool {
        self.use_real_scroll
    }

    pub fn detect_user_scroll(&self) -> bool {
        self.detect_user_scroll
    }

    pub fn debug(&self) -> bool {
        self.debug
    }
}

impl TryFrom<&LazyLoadSettings> for TriggerConfig {
    type Error = HarvestError;

    fn try_from(settings: &LazyLoadSettings) -> Result<Self, Self::Error> {
        let interval = validate_interval(settings.interval)?;
        let max_steps = match settings.step_count {
            Some(steps) if steps > 0 => steps,
            _ => {
                return Err(HarvestError::InvalidCommand(
                    "stepCount is required and must be greater than 0".to_string(),
                ));
            }
        };
        if !settings.scroll_amount.is_finite() {
            return Err(HarvestError::InvalidConfig(format!(
                "scrollAmount must be a finite number. Received: {}",
                settings.scroll_amount
            )));
        }
        let restore_delay = validate_delay("restoreDelay", settings.restore_delay)?;
        let pause = validate_delay("userScrollPauseTime", settings.user_scroll_pause_time)?;

        Ok(TriggerConfig::new(interval, Some(max_steps))
            .with_real_scroll(settings.use_actual_scroll, settings.scroll_amount)
            .with_restore_delay(restore_delay)
            .with_user_scroll_detection(settings.detect_user_scrolling, pause)
            .with_debug(settings.debug))
    }
}
