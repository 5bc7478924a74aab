//! Time and timestamp helpers.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// UTC timestamp used for snapshot and event times.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Time-based gate for event-triggered refreshes.
///
/// Owned by whoever schedules refreshes; one per device. An event is let
/// through when at least `window` has passed since the last accepted one.
#[derive(Debug, Clone)]
pub struct Debounce {
    window: Duration,
    last_event: Option<Timestamp>,
}

impl Debounce {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_event: None,
        }
    }

    /// Whether an event at `at` should trigger a refresh. Accepted events
    /// restart the window.
    pub fn should_refresh(&mut self, at: Timestamp) -> bool {
        let elapsed = self
            .last_event
            .map(|last| (at - last).to_std().unwrap_or_default());

        match elapsed {
            Some(elapsed) if elapsed < self.window => false,
            _ => {
                self.last_event = Some(at);
                true
            }
        }
    }
}
