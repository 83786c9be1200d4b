pub mod constants;
mod errors;
mod timeout;
mod wait_for_element;

pub use errors::{HarvestError, HarvestResult};
pub use timeout::{MAX_DELAY_MS, MAX_INTERVAL_MS, validate_delay, validate_interval};
pub use wait_for_element::wait_for_element;
