//! Fixed-capacity ring buffer of captured key events.
//!
//! # Ordering and overflow
//!
//! - Reads are FIFO: [`RingBuffer::pop`] always returns the oldest unread
//!   event.
//! - Overflow is latched: the first push that leaves more than `capacity`
//!   events unread sets a flag that makes [`count`](RingBuffer::count),
//!   [`peek`](RingBuffer::peek) and [`pop`](RingBuffer::pop) report
//!   `Overflow` until [`clear`](RingBuffer::clear) or
//!   [`reset`](RingBuffer::reset). Draining the backlog does not release it.
//!
//! The buffer is shared by exactly one producer (the event source handler)
//! and one consumer (the polling caller). A single mutex guards the slots,
//! both cursors, the overflow latch and the last popped event; it is held only
//! for one slot access plus the cursor update, so neither side ever waits on
//! anything but the other side's single-slot critical section.

use crate::error::{Error, Result};
use crate::event::Timestamp;
use crate::modifiers::Modifiers;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default number of events a queue holds before overflowing.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Legacy numeric value reported for an overflowed queue.
pub const OVERFLOW_SENTINEL: f64 = -1.0;

/// One captured keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedKeyEvent {
    /// Character produced by the platform. NUL when the key produced none.
    pub character: char,
    /// Modifier keys held at the instant of the event.
    pub modifiers: Modifiers,
    /// When the event occurred, on the monotonic clock.
    pub timestamp: Timestamp,
    /// Raw platform keycode.
    pub raw_code: u32,
}

impl QueuedKeyEvent {
    /// The character as an integer code point.
    #[inline]
    pub fn code_point(&self) -> u32 {
        self.character as u32
    }
}

/// Outcome of a [`RingBuffer::pop`] or [`RingBuffer::peek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueRead {
    /// The next event.
    Key(QueuedKeyEvent),
    /// No event pending. A normal steady state.
    Empty,
    /// Unread events exceeded capacity and some were lost.
    Overflow,
}

impl QueueRead {
    /// Value reported to scripting callers: the code point, 0 for `Empty`
    /// and -1 for `Overflow`.
    pub fn legacy_code(&self) -> f64 {
        match self {
            QueueRead::Key(event) => f64::from(event.code_point()),
            QueueRead::Empty => 0.0,
            QueueRead::Overflow => OVERFLOW_SENTINEL,
        }
    }

    /// The event, if one was read.
    pub fn key(self) -> Option<QueuedKeyEvent> {
        match self {
            QueueRead::Key(event) => Some(event),
            _ => None,
        }
    }

    /// Whether nothing was pending.
    pub fn is_empty(&self) -> bool {
        matches!(self, QueueRead::Empty)
    }

    /// Whether the read hit the overflow latch.
    pub fn is_overflow(&self) -> bool {
        matches!(self, QueueRead::Overflow)
    }
}

/// Outcome of [`RingBuffer::count`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PendingCount {
    /// Number of unread events.
    Events(usize),
    /// The queue has overflowed.
    Overflow,
}

impl PendingCount {
    /// Value reported to scripting callers: the count, or -1 for `Overflow`.
    pub fn legacy_value(&self) -> f64 {
        match self {
            PendingCount::Events(n) => *n as f64,
            PendingCount::Overflow => OVERFLOW_SENTINEL,
        }
    }

    /// Whether at least one event can be popped.
    pub fn is_available(&self) -> bool {
        matches!(self, PendingCount::Events(n) if *n > 0)
    }
}

struct Inner {
    slots: Box<[Option<QueuedKeyEvent>]>,
    write_cursor: u64,
    read_cursor: u64,
    overflowed: bool,
    last_popped: Option<QueuedKeyEvent>,
}

impl Inner {
    #[inline]
    fn pending(&self) -> u64 {
        self.write_cursor - self.read_cursor
    }

    #[inline]
    fn slot_index(&self, cursor: u64) -> usize {
        (cursor % self.slots.len() as u64) as usize
    }

    fn head(&self) -> QueueRead {
        if self.overflowed {
            return QueueRead::Overflow;
        }
        if self.pending() == 0 {
            return QueueRead::Empty;
        }
        match self.slots[self.slot_index(self.read_cursor)] {
            Some(event) => QueueRead::Key(event),
            None => QueueRead::Empty,
        }
    }

    fn reset_cursors(&mut self) {
        self.write_cursor = 0;
        self.read_cursor = 0;
        self.overflowed = false;
    }
}

/// Fixed-capacity FIFO of [`QueuedKeyEvent`]s with latched overflow.
pub struct RingBuffer {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl RingBuffer {
    /// Allocate a buffer holding up to `capacity` unread events.
    ///
    /// All storage is allocated here; pushes never allocate.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "queue capacity must be at least 1".into(),
            ));
        }

        Ok(Self {
            capacity,
            inner: Mutex::new(Inner {
                slots: vec![None; capacity].into_boxed_slice(),
                write_cursor: 0,
                read_cursor: 0,
                overflowed: false,
                last_popped: None,
            }),
        })
    }

    // A panic while holding the lock cannot leave the cursors inconsistent,
    // so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of unread events the buffer holds without loss.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an event. Never fails and never blocks beyond the slot write.
    ///
    /// Once more than `capacity` events are unread the oldest slot is
    /// overwritten and the overflow latch is set.
    pub fn push(&self, event: QueuedKeyEvent) {
        let mut inner = self.lock();
        let index = inner.slot_index(inner.write_cursor);
        inner.slots[index] = Some(event);
        inner.write_cursor += 1;

        if !inner.overflowed && inner.pending() > self.capacity as u64 {
            inner.overflowed = true;
            drop(inner);
            log::warn!(
                "key queue overflowed: more than {} unread events, oldest events lost",
                self.capacity
            );
        }
    }

    /// Remove and return the oldest unread event.
    ///
    /// A returned event becomes the "last popped" event used by modifier and
    /// time queries.
    pub fn pop(&self) -> QueueRead {
        let mut inner = self.lock();
        let read = inner.head();
        if let QueueRead::Key(event) = read {
            inner.read_cursor += 1;
            inner.last_popped = Some(event);
        }
        read
    }

    /// The event the next [`pop`](Self::pop) would return, without removing it.
    pub fn peek(&self) -> QueueRead {
        self.lock().head()
    }

    /// Number of unread events, or `Overflow`.
    pub fn count(&self) -> PendingCount {
        let inner = self.lock();
        if inner.overflowed {
            PendingCount::Overflow
        } else {
            PendingCount::Events(inner.pending() as usize)
        }
    }

    /// Whether the overflow latch is set.
    pub fn is_overflowed(&self) -> bool {
        self.lock().overflowed
    }

    /// Discard every unread event and release the overflow latch.
    ///
    /// The last popped event is kept so modifier queries stay answerable.
    pub fn clear(&self) {
        self.lock().reset_cursors();
    }

    /// Like [`clear`](Self::clear), but also forgets the last popped event.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.reset_cursors();
        inner.last_popped = None;
    }

    /// Pop every available event in order.
    ///
    /// Stops at `Empty` or `Overflow`; an overflowed queue yields nothing.
    pub fn drain(&self) -> Vec<QueuedKeyEvent> {
        let mut events = Vec::new();
        while let QueueRead::Key(event) = self.pop() {
            events.push(event);
        }
        events
    }

    /// The most recently popped event, if any.
    pub fn last_popped(&self) -> Option<QueuedKeyEvent> {
        self.lock().last_popped
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("write_cursor", &inner.write_cursor)
            .field("read_cursor", &inner.read_cursor)
            .field("overflowed", &inner.overflowed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn key(character: char, timestamp: Timestamp) -> QueuedKeyEvent {
        QueuedKeyEvent {
            character,
            modifiers: Modifiers::empty(),
            timestamp,
            raw_code: 0,
        }
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(RingBuffer::new(0), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_pop() {
        let queue = RingBuffer::new(4).unwrap();

        let read = queue.pop();
        assert_eq!(read, QueueRead::Empty);
        assert_eq!(read.legacy_code(), 0.0);
        assert_eq!(queue.peek(), QueueRead::Empty);
        assert_eq!(queue.count(), PendingCount::Events(0));
        assert!(queue.last_popped().is_none());
    }

    #[test]
    fn test_fifo_round_trip() {
        let queue = RingBuffer::new(1000).unwrap();
        let t1 = Timestamp::now();
        let t2 = t1 + Duration::from_millis(10);
        let t3 = t2 + Duration::from_millis(10);

        let a = QueuedKeyEvent {
            character: 'a',
            modifiers: Modifiers::SHIFT,
            timestamp: t1,
            raw_code: 4,
        };
        let b = QueuedKeyEvent {
            character: 'b',
            modifiers: Modifiers::CONTROL | Modifiers::ALT,
            timestamp: t2,
            raw_code: 5,
        };
        let c = key('c', t3);
        for event in [a, b, c] {
            queue.push(event);
        }

        assert_eq!(queue.count(), PendingCount::Events(3));
        assert_eq!(queue.peek(), QueueRead::Key(a));
        assert_eq!(queue.pop(), QueueRead::Key(a));
        assert_eq!(queue.pop(), QueueRead::Key(b));
        assert_eq!(queue.pop(), QueueRead::Key(c));
        assert_eq!(queue.pop(), QueueRead::Empty);
        assert_eq!(queue.last_popped(), Some(c));
    }

    #[test]
    fn test_peek_does_not_advance() {
        let queue = RingBuffer::new(2).unwrap();
        let event = key('x', Timestamp::now());
        queue.push(event);

        assert_eq!(queue.peek(), QueueRead::Key(event));
        assert_eq!(queue.peek(), QueueRead::Key(event));
        assert_eq!(queue.count(), PendingCount::Events(1));
        assert!(queue.last_popped().is_none());
    }

    #[test]
    fn test_exact_capacity_does_not_overflow() {
        let queue = RingBuffer::new(4).unwrap();
        let now = Timestamp::now();
        for c in ['a', 'b', 'c', 'd'] {
            queue.push(key(c, now));
        }

        assert_eq!(queue.count(), PendingCount::Events(4));
        assert!(!queue.is_overflowed());
        let drained: String = queue.drain().iter().map(|e| e.character).collect();
        assert_eq!(drained, "abcd");
    }

    #[test]
    fn test_overflow_then_clear() {
        let queue = RingBuffer::new(4).unwrap();
        let now = Timestamp::now();
        for c in ['A', 'B', 'C', 'D', 'E'] {
            queue.push(key(c, now));
        }

        assert_eq!(queue.count(), PendingCount::Overflow);
        assert_eq!(queue.count().legacy_value(), -1.0);
        assert_eq!(queue.peek(), QueueRead::Overflow);
        assert_eq!(queue.pop(), QueueRead::Overflow);
        assert_eq!(queue.pop().legacy_code(), -1.0);
        assert!(queue.drain().is_empty());

        queue.clear();
        assert_eq!(queue.count(), PendingCount::Events(0));
        assert!(!queue.is_overflowed());
        assert_eq!(queue.pop(), QueueRead::Empty);
    }

    #[test]
    fn test_overflow_is_latched() {
        let queue = RingBuffer::new(2).unwrap();
        let now = Timestamp::now();
        queue.push(key('a', now));
        queue.push(key('b', now));
        assert_eq!(queue.pop(), QueueRead::Key(key('a', now)));

        queue.push(key('c', now));
        queue.push(key('d', now));
        assert_eq!(queue.count(), PendingCount::Overflow);

        // Popping never happens while latched, and more pushes keep it latched.
        for _ in 0..10 {
            assert_eq!(queue.pop(), QueueRead::Overflow);
        }
        queue.push(key('e', now));
        assert_eq!(queue.count(), PendingCount::Overflow);
    }

    #[test]
    fn test_wraps_without_overflow_when_drained() {
        let queue = RingBuffer::new(3).unwrap();
        let now = Timestamp::now();

        for round in 0..10u32 {
            let c = char::from_u32('a' as u32 + round).unwrap();
            queue.push(key(c, now));
            queue.push(key(c.to_ascii_uppercase(), now));
            assert_eq!(queue.pop().key().map(|e| e.character), Some(c));
            assert_eq!(
                queue.pop().key().map(|e| e.character),
                Some(c.to_ascii_uppercase())
            );
        }

        assert_eq!(queue.count(), PendingCount::Events(0));
        assert!(!queue.is_overflowed());
    }

    #[test]
    fn test_clear_keeps_last_popped_reset_does_not() {
        let queue = RingBuffer::new(2).unwrap();
        let event = key('q', Timestamp::now());
        queue.push(event);
        queue.pop();

        queue.clear();
        assert_eq!(queue.last_popped(), Some(event));

        queue.reset();
        assert_eq!(queue.last_popped(), None);
    }

    #[test]
    fn test_legacy_values() {
        let event = key('A', Timestamp::now());
        assert_eq!(QueueRead::Key(event).legacy_code(), 65.0);
        assert_eq!(event.code_point(), 65);
        assert!(PendingCount::Events(2).is_available());
        assert!(!PendingCount::Events(0).is_available());
        assert!(!PendingCount::Overflow.is_available());
        assert_eq!(PendingCount::Events(7).legacy_value(), 7.0);
    }

    #[test]
    fn test_concurrent_producer_preserves_order() {
        let queue = Arc::new(RingBuffer::new(10_000).unwrap());
        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                let base = Timestamp::now();
                for i in 0..5_000u32 {
                    queue.push(QueuedKeyEvent {
                        character: 'k',
                        modifiers: Modifiers::empty(),
                        timestamp: base + Duration::from_micros(u64::from(i)),
                        raw_code: i,
                    });
                }
            })
        };

        let mut seen = Vec::new();
        while seen.len() < 5_000 {
            match queue.pop() {
                QueueRead::Key(event) => seen.push(event.raw_code),
                QueueRead::Empty => std::thread::yield_now(),
                QueueRead::Overflow => panic!("queue should not overflow"),
            }
        }
        producer.join().unwrap();

        assert!(seen.iter().copied().eq(0..5_000));
        assert_eq!(queue.pop(), QueueRead::Empty);
    }
}
