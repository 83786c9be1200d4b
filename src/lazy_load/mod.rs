//! Lazy-load triggering: user scroll detection, the synthetic trigger cycle,
//! the repeating controller and the per-page context that owns them.

mod config;
mod context;
mod controller;
mod tracker;
mod trigger;

pub use config::{LazyLoadSettings, TriggerConfig};
pub use context::{LazyLoadCommand, LazyLoadHandle, PageContext};
pub use controller::TriggerLoopController;
pub use tracker::{ScrollBusy, ScrollSignalTracker, ScrollState};
pub use trigger::{FireOutcome, SyntheticActivityTrigger};
