//! Session configuration

use std::time::Duration;

use mtrust_core::constants;

/// Tuning knobs for a [`CardSession`](crate::CardSession)
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Per-operation response deadline
    pub response_timeout: Duration,

    /// Bound of the event channel; events are dropped (with a warning)
    /// when the consumer lags behind
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            response_timeout: constants::RESPONSE_TIMEOUT,
            event_capacity: 32,
        }
    }
}

impl SessionConfig {
    /// Set the response timeout
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set the event channel capacity
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}
