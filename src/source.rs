//! Event source seam and the handler trait sources deliver to.
//!
//! An [`EventSource`] is the platform facility that produces raw key and
//! focus events: an invisible focused window, a terminal, an OS hook. A
//! capture session subscribes a [`KeyEventHandler`] to it and unsubscribes
//! when capture stops.
//!
//! [`SimulatedSource`] is an in-process source for tests, demos and headless
//! setups.

use crate::error::{Error, Result};
use crate::event::Event;
use crate::modifiers::Modifiers;
use std::sync::{Arc, Mutex, MutexGuard};

/// Receives events from a source.
///
/// Return `None` to consume the event (keep it from the host's ordinary
/// input handling), or `Some(event)` to pass it through.
///
/// Handlers run on the source's delivery path and must not block.
pub trait KeyEventHandler: Send + Sync {
    /// Called when an input event occurs.
    fn handle_event(&self, event: &Event) -> Option<Event>;
}

/// Implement KeyEventHandler for closures.
impl<F> KeyEventHandler for F
where
    F: Fn(&Event) -> Option<Event> + Send + Sync,
{
    fn handle_event(&self, event: &Event) -> Option<Event> {
        self(event)
    }
}

/// A platform facility delivering key and focus events.
pub trait EventSource {
    /// Start delivering events to `handler`.
    ///
    /// Fails with [`Error::AlreadyRunning`] if a handler is already subscribed.
    fn subscribe(&mut self, handler: Arc<dyn KeyEventHandler>) -> Result<()>;

    /// Stop delivering events.
    ///
    /// Fails with [`Error::NotRunning`] if nothing is subscribed. Events
    /// emitted after this returns must not reach the old handler.
    fn unsubscribe(&mut self) -> Result<()>;
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn subscribe(&mut self, handler: Arc<dyn KeyEventHandler>) -> Result<()> {
        (**self).subscribe(handler)
    }

    fn unsubscribe(&mut self) -> Result<()> {
        (**self).unsubscribe()
    }
}

#[derive(Default)]
struct SimulatedState {
    handler: Option<Arc<dyn KeyEventHandler>>,
    forwarded: Vec<Event>,
}

/// In-process event source driven by [`SimulatedSourceHandle`]s.
///
/// # Example
///
/// ```
/// use keyqueue::{CaptureConfig, KeyCapture, SimulatedSource};
///
/// let source = SimulatedSource::new();
/// let keys = source.handle();
///
/// let mut capture = KeyCapture::new(source, CaptureConfig::default()).unwrap();
/// capture.register().unwrap();
///
/// keys.key_typed('y');
/// assert_eq!(capture.pop().key().map(|e| e.character), Some('y'));
/// ```
#[derive(Default)]
pub struct SimulatedSource {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedSource {
    /// Create a source with no subscriber.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that emits events into this source from any thread.
    pub fn handle(&self) -> SimulatedSourceHandle {
        SimulatedSourceHandle {
            state: Arc::clone(&self.state),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SimulatedState>> {
        self.state
            .lock()
            .map_err(|_| Error::ThreadError("simulated source mutex poisoned".into()))
    }
}

impl EventSource for SimulatedSource {
    fn subscribe(&mut self, handler: Arc<dyn KeyEventHandler>) -> Result<()> {
        let mut state = self.lock()?;
        if state.handler.is_some() {
            return Err(Error::AlreadyRunning);
        }
        state.handler = Some(handler);
        Ok(())
    }

    fn unsubscribe(&mut self) -> Result<()> {
        let mut state = self.lock()?;
        if state.handler.take().is_none() {
            return Err(Error::NotRunning);
        }
        Ok(())
    }
}

/// Cloneable emitter for a [`SimulatedSource`].
#[derive(Clone)]
pub struct SimulatedSourceHandle {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedSourceHandle {
    /// Deliver `event` to the subscribed handler.
    ///
    /// Returns the event as forwarded to the host, or `None` if it was
    /// consumed. With no subscriber every event passes straight through.
    /// Forwarded events are recorded until collected with
    /// [`take_forwarded`](Self::take_forwarded).
    pub fn emit(&self, event: Event) -> Option<Event> {
        // Delivery happens under the lock so an unsubscribe cannot race
        // with an in-flight event.
        let Ok(mut state) = self.state.lock() else {
            return Some(event);
        };
        let result = match &state.handler {
            Some(handler) => handler.handle_event(&event),
            None => Some(event),
        };
        if let Some(forwarded) = result {
            state.forwarded.push(forwarded);
        }
        result
    }

    /// Type a character with no modifiers.
    pub fn key_typed(&self, char: char) -> Option<Event> {
        self.key_typed_with(char, Modifiers::empty())
    }

    /// Type a character with the given modifiers held.
    pub fn key_typed_with(&self, char: char, mask: Modifiers) -> Option<Event> {
        self.emit(Event::key_typed(char, char as u32, mask))
    }

    /// Report that the capturing surface gained focus.
    pub fn focus_gained(&self) -> Option<Event> {
        self.emit(Event::focus_gained())
    }

    /// Report that the capturing surface lost focus.
    pub fn focus_lost(&self) -> Option<Event> {
        self.emit(Event::focus_lost())
    }

    /// Events that were passed through to the host so far.
    pub fn forwarded(&self) -> Vec<Event> {
        self.state
            .lock()
            .map(|state| state.forwarded.clone())
            .unwrap_or_default()
    }

    /// Remove and return the recorded forwarded events.
    pub fn take_forwarded(&self) -> Vec<Event> {
        self.state
            .lock()
            .map(|mut state| std::mem::take(&mut state.forwarded))
            .unwrap_or_default()
    }

    /// Whether a handler is currently subscribed.
    pub fn is_subscribed(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.handler.is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    #[test]
    fn test_subscribe_twice_fails() {
        let mut source = SimulatedSource::new();
        source.subscribe(Arc::new(|e: &Event| Some(*e))).unwrap();

        let result = source.subscribe(Arc::new(|e: &Event| Some(*e)));
        assert!(matches!(result, Err(Error::AlreadyRunning)));
    }

    #[test]
    fn test_unsubscribe_when_idle_fails() {
        let mut source = SimulatedSource::new();
        assert!(matches!(source.unsubscribe(), Err(Error::NotRunning)));
    }

    #[test]
    fn test_emit_without_subscriber_passes_through() {
        let source = SimulatedSource::new();
        let handle = source.handle();

        assert!(!handle.is_subscribed());
        let forwarded = handle.key_typed('a');
        assert_eq!(forwarded.and_then(|e| e.char()), Some('a'));
        assert_eq!(handle.forwarded().len(), 1);
    }

    #[test]
    fn test_consumed_events_are_not_forwarded() {
        let mut source = SimulatedSource::new();
        let handle = source.handle();
        source
            .subscribe(Arc::new(|e: &Event| {
                (e.event_type != EventType::KeyTyped).then_some(*e)
            }))
            .unwrap();

        assert!(handle.key_typed('z').is_none());
        assert!(handle.focus_lost().is_some());

        let forwarded = handle.forwarded();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].event_type, EventType::FocusLost);
    }

    #[test]
    fn test_take_forwarded_drains_record() {
        let source = SimulatedSource::new();
        let handle = source.handle();
        handle.key_typed('a');
        handle.key_typed('b');

        let taken: String = handle
            .take_forwarded()
            .iter()
            .filter_map(|e| e.char())
            .collect();
        assert_eq!(taken, "ab");
        assert!(handle.forwarded().is_empty());

        handle.key_typed('c');
        assert_eq!(handle.take_forwarded().len(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut source = SimulatedSource::new();
        let handle = source.handle();
        source
            .subscribe(Arc::new(|_: &Event| -> Option<Event> { None }))
            .unwrap();
        assert!(handle.key_typed('a').is_none());

        source.unsubscribe().unwrap();
        assert!(!handle.is_subscribed());
        assert!(handle.key_typed('a').is_some());
    }
}
