//! Capture sessions: registration lifecycle and the drain/query API.
//!
//! A [`KeyCapture`] owns one [`RingBuffer`] and one [`EventSource`]. While
//! registered, every qualifying key event the source delivers is pushed into
//! the buffer by a handler running on the source's delivery path; the owner
//! polls [`count`](KeyCapture::count) and [`pop`](KeyCapture::pop) from its own
//! thread. Dropping the capture unregisters it.

use crate::config::{CaptureConfig, CaptureMode};
use crate::error::{Error, Result};
use crate::event::{Clock, Event, EventType, Timestamp};
use crate::modifiers::{ModifierFlags, Modifiers};
use crate::queue::{PendingCount, QueueRead, QueuedKeyEvent, RingBuffer};
use crate::source::{EventSource, KeyEventHandler};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};

/// Whether a capture is subscribed to its event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RegistrationState {
    #[default]
    Unregistered,
    Registered,
}

/// Keyboard focus of the capturing surface, as last reported by the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FocusState {
    /// The source has not reported focus yet.
    #[default]
    Unknown,
    Focused,
    Unfocused,
}

impl FocusState {
    fn to_u8(self) -> u8 {
        match self {
            FocusState::Unknown => 0,
            FocusState::Focused => 1,
            FocusState::Unfocused => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => FocusState::Focused,
            2 => FocusState::Unfocused,
            _ => FocusState::Unknown,
        }
    }
}

/// Result of a blocking wait for the next key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A key was popped.
    Key(QueuedKeyEvent),
    /// The queue is overflowed; clear it before waiting again.
    Overflow,
    /// The capturing surface lost focus, so no key can arrive.
    FocusLost,
    /// The timeout elapsed.
    TimedOut,
}

/// State shared between the consumer and the producer handler.
struct Shared {
    queue: RingBuffer,
    registered: AtomicBool,
    redispatch: AtomicBool,
    focus: AtomicU8,
    capture_mode: CaptureMode,
    #[cfg(feature = "tokio")]
    notify: tokio::sync::Notify,
}

impl Shared {
    fn set_focus(&self, state: FocusState) {
        self.focus.store(state.to_u8(), Ordering::SeqCst);
    }

    fn focus(&self) -> FocusState {
        FocusState::from_u8(self.focus.load(Ordering::SeqCst))
    }

    fn wake(&self) {
        #[cfg(feature = "tokio")]
        self.notify.notify_one();
    }

    /// Build the queue entry for `event`, if this session records it.
    fn qualify(&self, event: &Event) -> Option<QueuedKeyEvent> {
        let kb = event.keyboard?;
        let character = match (self.capture_mode, event.event_type) {
            (CaptureMode::Typed, EventType::KeyTyped) => kb.char?,
            (CaptureMode::Pressed, EventType::KeyPressed) => kb.char.unwrap_or('\0'),
            _ => return None,
        };

        Some(QueuedKeyEvent {
            character,
            modifiers: event.mask,
            timestamp: event.time,
            raw_code: kb.raw_code,
        })
    }
}

/// Control+C, the combination that releases exclusive capture.
fn is_interrupt(event: &Event) -> bool {
    event.mask.contains(Modifiers::CONTROL)
        && matches!(event.char(), Some('c' | 'C' | '\u{3}'))
}

/// Producer side, subscribed to the event source.
struct CaptureHandler {
    shared: Arc<Shared>,
}

impl KeyEventHandler for CaptureHandler {
    fn handle_event(&self, event: &Event) -> Option<Event> {
        let shared = &self.shared;

        match event.event_type {
            EventType::FocusGained => {
                shared.set_focus(FocusState::Focused);
                return Some(*event);
            }
            EventType::FocusLost => {
                shared.set_focus(FocusState::Unfocused);
                shared.wake();
                return Some(*event);
            }
            _ => {}
        }

        if !shared.registered.load(Ordering::SeqCst) {
            return Some(*event);
        }

        if let Some(queued) = shared.qualify(event) {
            shared.queue.push(queued);
            shared.wake();
        }

        if is_interrupt(event) && !shared.redispatch.swap(true, Ordering::SeqCst) {
            log::warn!("Control+C captured, releasing exclusive keyboard capture");
        }

        if shared.redispatch.load(Ordering::SeqCst) {
            Some(*event)
        } else {
            None
        }
    }
}

/// A keyboard capture session.
///
/// # Example
///
/// ```
/// use keyqueue::{CaptureConfig, KeyCapture, Modifiers, QueueRead, SimulatedSource};
///
/// let source = SimulatedSource::new();
/// let keys = source.handle();
/// let mut capture = KeyCapture::new(source, CaptureConfig::default()).unwrap();
///
/// capture.register().unwrap();
/// keys.key_typed_with('a', Modifiers::CONTROL | Modifiers::SHIFT);
///
/// match capture.pop() {
///     QueueRead::Key(event) => {
///         assert_eq!(event.character, 'a');
///         assert!(capture.is_control());
///         assert!(capture.is_shift());
///     }
///     QueueRead::Empty => unreachable!(),
///     QueueRead::Overflow => eprintln!("keys were lost"),
/// }
/// ```
pub struct KeyCapture<S: EventSource> {
    shared: Arc<Shared>,
    source: S,
    state: RegistrationState,
    clock: Clock,
    wait_poll_interval: Duration,
}

impl<S: EventSource> KeyCapture<S> {
    /// Create an unregistered capture over `source`.
    pub fn new(source: S, config: CaptureConfig) -> Result<Self> {
        config.validate()?;

        let shared = Shared {
            queue: RingBuffer::new(config.capacity)?,
            registered: AtomicBool::new(false),
            redispatch: AtomicBool::new(config.redispatch),
            focus: AtomicU8::new(FocusState::Unknown.to_u8()),
            capture_mode: config.capture_mode,
            #[cfg(feature = "tokio")]
            notify: tokio::sync::Notify::new(),
        };

        Ok(Self {
            shared: Arc::new(shared),
            source,
            state: RegistrationState::Unregistered,
            clock: Clock::new(),
            wait_poll_interval: config.wait_poll_interval,
        })
    }

    /// Start capturing. No-op if already registered.
    ///
    /// Resets both cursors and the overflow latch and forgets the last popped
    /// event, then subscribes to the source.
    pub fn register(&mut self) -> Result<()> {
        if self.state == RegistrationState::Registered {
            return Ok(());
        }

        self.shared.queue.reset();
        self.shared.registered.store(true, Ordering::SeqCst);

        let handler = CaptureHandler {
            shared: Arc::clone(&self.shared),
        };
        if let Err(e) = self.source.subscribe(Arc::new(handler)) {
            self.shared.registered.store(false, Ordering::SeqCst);
            return Err(e);
        }

        self.state = RegistrationState::Registered;
        log::debug!(
            "key capture registered (capacity {})",
            self.shared.queue.capacity()
        );
        Ok(())
    }

    /// Stop capturing. No-op if not registered.
    ///
    /// Events already buffered stay readable until the next
    /// [`clear`](Self::clear).
    pub fn unregister(&mut self) -> Result<()> {
        if self.state == RegistrationState::Unregistered {
            return Ok(());
        }

        self.shared.registered.store(false, Ordering::SeqCst);
        if let Err(e) = self.source.unsubscribe() {
            self.shared.registered.store(true, Ordering::SeqCst);
            return Err(e);
        }

        self.state = RegistrationState::Unregistered;
        self.shared.wake();
        log::debug!("key capture unregistered");
        Ok(())
    }

    /// Current registration state.
    pub fn registration_state(&self) -> RegistrationState {
        self.state
    }

    /// Whether the capture is subscribed to its source.
    pub fn is_registered(&self) -> bool {
        self.state == RegistrationState::Registered
    }

    /// Discard buffered events and release the overflow latch.
    pub fn clear(&self) {
        self.shared.queue.clear();
    }

    /// Number of pending events, or `Overflow`.
    pub fn count(&self) -> PendingCount {
        self.shared.queue.count()
    }

    /// Whether an event can be popped right now.
    pub fn char_available(&self) -> bool {
        self.count().is_available()
    }

    /// The next event, without removing it.
    pub fn peek(&self) -> QueueRead {
        self.shared.queue.peek()
    }

    /// Remove and return the oldest pending event. Never blocks.
    pub fn pop(&self) -> QueueRead {
        self.shared.queue.pop()
    }

    /// Pop every pending event in order.
    pub fn drain(&self) -> Vec<QueuedKeyEvent> {
        self.shared.queue.drain()
    }

    /// Pending events held before overflow.
    pub fn capacity(&self) -> usize {
        self.shared.queue.capacity()
    }

    /// Whether the overflow latch is set.
    pub fn is_overflowed(&self) -> bool {
        self.shared.queue.is_overflowed()
    }

    /// The most recently popped event.
    pub fn last_event(&self) -> Option<QueuedKeyEvent> {
        self.shared.queue.last_popped()
    }

    /// Modifier flags of the most recently popped event.
    ///
    /// All-false before the first successful pop.
    pub fn modifier_flags(&self) -> ModifierFlags {
        self.last_event()
            .map(|event| event.modifiers.decode())
            .unwrap_or_default()
    }

    /// Command (Meta) was held for the last popped event.
    pub fn is_command(&self) -> bool {
        self.modifier_flags().command
    }

    /// Control was held for the last popped event.
    pub fn is_control(&self) -> bool {
        self.modifier_flags().control
    }

    /// Option (Alt) was held for the last popped event.
    pub fn is_option(&self) -> bool {
        self.modifier_flags().option
    }

    /// Shift was held for the last popped event.
    pub fn is_shift(&self) -> bool {
        self.modifier_flags().shift
    }

    /// Raw modifier mask of the most recently popped event, 0 before the first pop.
    pub fn modifier_value(&self) -> u32 {
        self.last_event().map_or(0, |event| event.modifiers.bits())
    }

    /// Modifier names of the most recently popped event.
    pub fn modifier_names(&self) -> String {
        self.last_event()
            .map(|event| event.modifiers.names())
            .unwrap_or_default()
    }

    /// Timestamp of the most recently popped event.
    pub fn event_time(&self) -> Option<Timestamp> {
        self.last_event().map(|event| event.timestamp)
    }

    /// [`event_time`](Self::event_time) in seconds on this session's
    /// [`clock`](Self::clock), 0.0 before the first pop.
    pub fn event_time_secs(&self) -> f64 {
        self.event_time().map_or(0.0, |ts| self.clock.secs(ts))
    }

    /// Current time in the same domain as [`event_time_secs`](Self::event_time_secs).
    pub fn now_secs(&self) -> f64 {
        self.clock.now_secs()
    }

    /// The session clock. Its epoch is when the capture was created.
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Forward captured events to the host (`true`) or consume them (`false`).
    pub fn set_redispatch(&self, redispatch: bool) {
        self.shared.redispatch.store(redispatch, Ordering::SeqCst);
    }

    /// Whether captured events are currently forwarded to the host.
    pub fn redispatch(&self) -> bool {
        self.shared.redispatch.load(Ordering::SeqCst)
    }

    /// Whether the capturing surface holds keyboard focus.
    pub fn is_focused(&self) -> bool {
        self.focus_state() == FocusState::Focused
    }

    /// Focus as last reported by the source.
    pub fn focus_state(&self) -> FocusState {
        self.shared.focus()
    }

    /// The underlying event source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Block until a key is available, the queue overflows, focus is lost or
    /// `timeout` elapses. `None` waits without limit.
    ///
    /// Polls every `wait_poll_interval`. Fails with
    /// [`Error::NotRegistered`] once nothing is buffered and capture is
    /// stopped.
    pub fn wait_for_key(&self, timeout: Option<Duration>) -> Result<WaitOutcome> {
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if let Some(outcome) = self.poll_wait()? {
                return Ok(outcome);
            }

            let mut interval = self.wait_poll_interval;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return Ok(WaitOutcome::TimedOut);
                }
                interval = interval.min(deadline - now);
            }
            std::thread::sleep(interval);
        }
    }

    /// Wait for the next key without blocking the executor.
    ///
    /// Woken by the producer on every push, focus loss and unregister.
    #[cfg(feature = "tokio")]
    pub async fn wait_for_key_async(&self) -> Result<WaitOutcome> {
        loop {
            if let Some(outcome) = self.poll_wait()? {
                return Ok(outcome);
            }
            self.shared.notify.notified().await;
        }
    }

    fn poll_wait(&self) -> Result<Option<WaitOutcome>> {
        match self.pop() {
            QueueRead::Key(event) => return Ok(Some(WaitOutcome::Key(event))),
            QueueRead::Overflow => return Ok(Some(WaitOutcome::Overflow)),
            QueueRead::Empty => {}
        }
        if !self.shared.registered.load(Ordering::SeqCst) {
            return Err(Error::NotRegistered);
        }
        if self.focus_state() == FocusState::Unfocused {
            return Ok(Some(WaitOutcome::FocusLost));
        }
        Ok(None)
    }
}

impl<S: EventSource> Drop for KeyCapture<S> {
    fn drop(&mut self) {
        if let Err(e) = self.unregister() {
            log::warn!("failed to unregister key capture on drop: {}", e);
        }
    }
}

impl<S: EventSource> std::fmt::Debug for KeyCapture<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCapture")
            .field("state", &self.state)
            .field("queue", &self.shared.queue)
            .field("redispatch", &self.redispatch())
            .field("focus", &self.focus_state())
            .finish()
    }
}
