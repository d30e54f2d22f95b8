//! # keyqueue
//!
//! Timestamped keyboard capture into a bounded ring buffer, built for
//! reaction-time measurement.
//!
//! ## Features
//!
//! - Every captured keypress keeps its character, modifier mask and
//!   monotonic timestamp
//! - Fixed-capacity FIFO queue; pushes and pops never block or allocate
//! - Overflow is detected, latched and reported instead of silently dropping
//!   events
//! - Idempotent register/unregister, with unregister guaranteed on drop
//! - Optional exclusive capture that releases itself on Control+C
//! - Pluggable [`EventSource`] for whatever surface delivers the keys
//!
//! ## Quick Start
//!
//! ```
//! use keyqueue::{CaptureConfig, KeyCapture, PendingCount, QueueRead, SimulatedSource};
//!
//! let source = SimulatedSource::new();
//! let keys = source.handle();
//! let mut capture = KeyCapture::new(source, CaptureConfig::default()).unwrap();
//! capture.register().unwrap();
//!
//! keys.key_typed('f');
//! keys.key_typed('j');
//!
//! assert_eq!(capture.count(), PendingCount::Events(2));
//! while let QueueRead::Key(event) = capture.pop() {
//!     println!("{:?} at {:.4}s", event.character, capture.event_time_secs());
//! }
//! ```
//!
//! ## Overflow
//!
//! Once more than `capacity` events are unread the queue latches an overflow
//! condition: [`KeyCapture::count`] reports [`PendingCount::Overflow`] and
//! [`KeyCapture::pop`] reports [`QueueRead::Overflow`] until
//! [`KeyCapture::clear`] is called or the capture is registered again.
//!
//! ## Timing
//!
//! Timestamps come from the monotonic clock and share no epoch with other
//! subsystems. [`KeyCapture::event_time_secs`] and [`KeyCapture::now_secs`]
//! report seconds on the same session [`Clock`], which is what a caller needs
//! to reconcile key times with its own timing source.

pub mod capture;
pub mod config;
pub mod error;
pub mod event;
pub mod modifiers;
pub mod queue;
pub mod source;

// Re-exports
pub use capture::{FocusState, KeyCapture, RegistrationState, WaitOutcome};
pub use config::{CaptureConfig, CaptureMode};
pub use error::{Error, Result};
pub use event::{Clock, Event, EventType, KeyboardData, Timestamp};
pub use modifiers::{ModifierFlags, Modifiers};
pub use queue::{
    DEFAULT_CAPACITY, OVERFLOW_SENTINEL, PendingCount, QueueRead, QueuedKeyEvent, RingBuffer,
};
pub use source::{EventSource, KeyEventHandler, SimulatedSource, SimulatedSourceHandle};
