//! Source event shape and the monotonic clock events are stamped with.

use crate::modifiers::Modifiers;
use std::time::{Duration, Instant};

/// The type of event delivered by an event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// The capturing surface gained keyboard focus.
    FocusGained,
    /// The capturing surface lost keyboard focus.
    FocusLost,

    /// A key was pressed down.
    KeyPressed,
    /// A key was released.
    KeyReleased,
    /// A character was typed (after dead key processing).
    KeyTyped,
}

/// Point in time on the monotonic clock.
///
/// Timestamps are comparable with each other but carry no epoch shared with
/// other subsystems. Use [`Clock`] to express them in seconds and to read the
/// current time in the same domain for reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Instant);

impl Timestamp {
    /// The current instant.
    #[inline]
    pub fn now() -> Self {
        Timestamp(Instant::now())
    }

    /// The underlying instant.
    #[inline]
    pub fn instant(self) -> Instant {
        self.0
    }

    /// Time elapsed from `earlier` to `self`.
    ///
    /// Panics if `earlier` is later than `self`, like [`Instant::duration_since`].
    #[inline]
    pub fn duration_since(self, earlier: Timestamp) -> Duration {
        self.0.duration_since(earlier.0)
    }

    /// Time elapsed from `earlier` to `self`, or zero if `earlier` is later.
    #[inline]
    pub fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
        self.0.saturating_duration_since(earlier.0)
    }
}

impl From<Instant> for Timestamp {
    fn from(instant: Instant) -> Self {
        Timestamp(instant)
    }
}

impl std::ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs)
    }
}

/// Per-session time base.
///
/// Converts [`Timestamp`]s into seconds since the clock was created. Events
/// stamped before the epoch report 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    epoch: Timestamp,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    /// Start a clock whose epoch is now.
    pub fn new() -> Self {
        Self {
            epoch: Timestamp::now(),
        }
    }

    /// Start a clock with an explicit epoch.
    pub fn with_epoch(epoch: Timestamp) -> Self {
        Self { epoch }
    }

    /// The instant this clock counts from.
    pub fn epoch(&self) -> Timestamp {
        self.epoch
    }

    /// Seconds from the epoch to `ts`.
    pub fn secs(&self, ts: Timestamp) -> f64 {
        ts.saturating_duration_since(self.epoch).as_secs_f64()
    }

    /// Seconds from the epoch to now.
    pub fn now_secs(&self) -> f64 {
        self.secs(Timestamp::now())
    }
}

/// Keyboard event data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardData {
    /// The raw platform-specific keycode.
    pub raw_code: u32,
    /// The Unicode character, if the platform produced one.
    pub char: Option<char>,
}

/// A complete source event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// The type of event.
    pub event_type: EventType,
    /// When the event occurred.
    pub time: Timestamp,
    /// Modifier mask held when the event occurred.
    pub mask: Modifiers,
    /// Keyboard-specific data.
    pub keyboard: Option<KeyboardData>,
}

impl Event {
    /// Create a new event with the given type, stamped now.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            time: Timestamp::now(),
            mask: Modifiers::empty(),
            keyboard: None,
        }
    }

    /// Create a focus gained event.
    pub fn focus_gained() -> Self {
        Self::new(EventType::FocusGained)
    }

    /// Create a focus lost event.
    pub fn focus_lost() -> Self {
        Self::new(EventType::FocusLost)
    }

    /// Create a key pressed event.
    pub fn key_pressed(raw_code: u32, mask: Modifiers) -> Self {
        Self::keyboard(EventType::KeyPressed, raw_code, None, mask)
    }

    /// Create a key released event.
    pub fn key_released(raw_code: u32, mask: Modifiers) -> Self {
        Self::keyboard(EventType::KeyReleased, raw_code, None, mask)
    }

    /// Create a key typed event.
    pub fn key_typed(char: char, raw_code: u32, mask: Modifiers) -> Self {
        Self::keyboard(EventType::KeyTyped, raw_code, Some(char), mask)
    }

    /// Replace the timestamp, e.g. with the platform's own event time.
    pub fn with_time(mut self, time: Timestamp) -> Self {
        self.time = time;
        self
    }

    /// Attach a character to a key event.
    pub fn with_char(mut self, char: char) -> Self {
        if let Some(kb) = self.keyboard.as_mut() {
            kb.char = Some(char);
        }
        self
    }

    fn keyboard(event_type: EventType, raw_code: u32, char: Option<char>, mask: Modifiers) -> Self {
        let mut event = Self::new(event_type);
        event.mask = mask;
        event.keyboard = Some(KeyboardData { raw_code, char });
        event
    }

    /// Check if this is a keyboard event.
    pub fn is_keyboard(&self) -> bool {
        matches!(
            self.event_type,
            EventType::KeyPressed | EventType::KeyReleased | EventType::KeyTyped
        )
    }

    /// Check if this is a focus change.
    pub fn is_focus(&self) -> bool {
        matches!(
            self.event_type,
            EventType::FocusGained | EventType::FocusLost
        )
    }

    /// The character carried by this event, if any.
    pub fn char(&self) -> Option<char> {
        self.keyboard.and_then(|kb| kb.char)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_typed_carries_char_and_mask() {
        let event = Event::key_typed('a', 30, Modifiers::SHIFT);

        assert_eq!(event.event_type, EventType::KeyTyped);
        assert!(event.is_keyboard());
        assert!(!event.is_focus());
        assert_eq!(event.char(), Some('a'));
        assert_eq!(event.keyboard.map(|kb| kb.raw_code), Some(30));
        assert_eq!(event.mask, Modifiers::SHIFT);
    }

    #[test]
    fn test_key_pressed_has_no_char_until_attached() {
        let event = Event::key_pressed(36, Modifiers::empty());
        assert_eq!(event.char(), None);
        assert_eq!(event.with_char('\r').char(), Some('\r'));
        assert_eq!(Event::focus_lost().with_char('x').char(), None);
    }

    #[test]
    fn test_timestamps_are_ordered() {
        let t1 = Timestamp::now();
        let t2 = t1 + Duration::from_millis(5);

        assert!(t1 < t2);
        assert_eq!(t2.duration_since(t1), Duration::from_millis(5));
        assert_eq!(t1.saturating_duration_since(t2), Duration::ZERO);
    }

    #[test]
    fn test_clock_seconds() {
        let epoch = Timestamp::now();
        let clock = Clock::with_epoch(epoch);

        assert_eq!(clock.secs(epoch), 0.0);
        assert!((clock.secs(epoch + Duration::from_millis(1500)) - 1.5).abs() < 1e-9);
        assert!(clock.now_secs() >= 0.0);
    }
}
