//! Shared configuration constants for the harvester
//!
//! This module contains default values and configuration constants used
//! throughout the codebase to ensure consistency and avoid magic numbers.

/// Quiet period after the last real scroll event before the user counts as idle
pub const USER_SCROLL_QUIET_MS: u64 = 150;

/// Delay between restoring the scroll offset and clearing the script-scroll flag
pub const SCRIPT_SCROLL_SETTLE_MS: u64 = 50;

/// Minimum wait past one trigger interval after starting the loop, so the
/// rescan runs after the first tick rather than alongside it
pub const CONTROLLER_TICK_MARGIN_MS: u64 = 500;

/// Custom events the host page's list component listens for, in dispatch order
pub const SEMANTIC_EVENTS: [&str; 3] = [
    "bills-loaded",
    "bills-list-loaded",
    "before-scrolling-to-page-bottom",
];

/// Selector for images a lazy loader has not resolved yet
pub const LAZY_ELEMENT_SELECTOR: &str = r#"img[data-src], img.lazy, img[loading="lazy"]"#;

/// Attribute stamped on detail buttons so they can be addressed after a scan
pub const ELEMENT_REF_ATTRIBUTE: &str = "data-harvester-ref";

/// Name of the CDP runtime binding that forwards trusted scroll input
pub const SCROLL_BINDING_NAME: &str = "__harvesterScrollSignal";
