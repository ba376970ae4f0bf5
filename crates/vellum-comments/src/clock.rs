//! Canonical time source for comment timestamps.

use jiff::Timestamp;

/// Supplies the canonical current timestamp for created/updated/deleted
/// fields.
///
/// The service receives its clock through the constructor, so tests can pin
/// time with a manual implementation instead of reaching for the system
/// clock ambiently.
pub trait Clock: Send + Sync {
    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
