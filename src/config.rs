//! Capture session configuration.

use crate::error::{Error, Result};
use crate::queue::DEFAULT_CAPACITY;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which source events are recorded into the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CaptureMode {
    /// Record `KeyTyped` events that carry a character.
    #[default]
    Typed,
    /// Record every `KeyPressed` event. Keys without a character are
    /// recorded as NUL.
    Pressed,
}

/// Settings for a [`KeyCapture`](crate::KeyCapture) session.
///
/// # Example
///
/// ```
/// use keyqueue::{CaptureConfig, CaptureMode};
///
/// let config = CaptureConfig::default()
///     .with_capacity(64)
///     .with_redispatch(false)
///     .with_capture_mode(CaptureMode::Pressed);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CaptureConfig {
    /// Unread events held before the queue overflows.
    pub capacity: usize,
    /// Whether captured events are also forwarded to the host's ordinary
    /// input handling. `false` consumes them (exclusive capture).
    pub redispatch: bool,
    /// Which source events are recorded.
    pub capture_mode: CaptureMode,
    /// Polling interval of the blocking wait.
    pub wait_poll_interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            redispatch: true,
            capture_mode: CaptureMode::Typed,
            wait_poll_interval: Duration::from_millis(5),
        }
    }
}

impl CaptureConfig {
    /// Set how many unread events the queue holds before overflowing.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set whether captured events are forwarded to the host.
    pub fn with_redispatch(mut self, redispatch: bool) -> Self {
        self.redispatch = redispatch;
        self
    }

    /// Set which key events are recorded.
    pub fn with_capture_mode(mut self, capture_mode: CaptureMode) -> Self {
        self.capture_mode = capture_mode;
        self
    }

    /// Set how often [`wait_for_key`](crate::KeyCapture::wait_for_key) rechecks the queue.
    pub fn with_wait_poll_interval(mut self, interval: Duration) -> Self {
        self.wait_poll_interval = interval;
        self
    }

    /// Check that the settings describe a usable session.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidConfig(
                "queue capacity must be at least 1".into(),
            ));
        }
        if self.wait_poll_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "wait poll interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CaptureConfig::default();
        assert_eq!(config.capacity, 1000);
        assert!(config.redispatch);
        assert_eq!(config.capture_mode, CaptureMode::Typed);
        assert_eq!(config.wait_poll_interval, Duration::from_millis(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = CaptureConfig::default().with_capacity(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        let config = CaptureConfig::default().with_wait_poll_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
