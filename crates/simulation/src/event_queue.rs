//! Event queue with deterministic ordering.

use meshkit_core::Actor;
use meshkit_types::{Address, Message};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Key for ordering events in the queue.
///
/// Events are ordered by:
/// 1. Trigger time (earlier first)
/// 2. Sequence number (FIFO for events at the same time)
///
/// The sequence number is assigned at insertion and strictly increasing,
/// so events scheduled at an identical timestamp preserve insertion
/// order and replays are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EventKey {
    /// When this event should be processed.
    pub time: Duration,
    /// Sequence number for deterministic FIFO ordering.
    pub sequence: u64,
}

/// One unit of scheduled work. Consumed exactly once when popped.
pub enum Event {
    /// Register an actor and deliver its priming messages.
    Join {
        address: Address,
        actor: Box<dyn Actor>,
        /// Added to the virtual clock for this actor's local view of time.
        time_offset: Duration,
        /// Delivered synchronously from the management source, in order,
        /// before the join finishes processing.
        priming: Vec<Message>,
    },
    /// Remove the actor registered at `address`.
    Leave { address: Address },
    /// Deliver one message to whichever actor resolves for `destination`.
    Message {
        source: Address,
        destination: Address,
        message: Message,
    },
    /// Invoke an arbitrary callback with the current virtual time.
    Custom { callback: Box<dyn FnOnce(Duration)> },
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Join {
                address,
                time_offset,
                priming,
                ..
            } => f
                .debug_struct("Join")
                .field("address", address)
                .field("time_offset", time_offset)
                .field("priming", &priming.len())
                .finish(),
            Event::Leave { address } => f.debug_struct("Leave").field("address", address).finish(),
            Event::Message {
                source,
                destination,
                message,
            } => f
                .debug_struct("Message")
                .field("source", source)
                .field("destination", destination)
                .field("message", message)
                .finish(),
            Event::Custom { .. } => f.debug_struct("Custom").finish_non_exhaustive(),
        }
    }
}

/// Priority queue of timestamped events plus the virtual clock.
///
/// Popping an event advances the externally visible current time to that
/// event's trigger time; time is monotonic non-decreasing because the
/// runner refuses to enqueue anything earlier than the last popped time.
pub struct EventQueue {
    events: BTreeMap<EventKey, Event>,
    /// Sole source of insertion tie-breaking; every push draws the next value.
    sequence: u64,
    /// Current virtual time: the trigger time of the last popped event.
    now: Duration,
}

impl EventQueue {
    /// Create an empty queue at virtual time zero.
    pub fn new() -> Self {
        Self {
            events: BTreeMap::new(),
            sequence: 0,
            now: Duration::ZERO,
        }
    }

    /// Enqueue an event at `time`, returning its assigned key.
    pub fn push(&mut self, time: Duration, event: Event) -> EventKey {
        self.sequence += 1;
        let key = EventKey {
            time,
            sequence: self.sequence,
        };
        self.events.insert(key, event);
        key
    }

    /// Pop the earliest event and advance the current time to its trigger
    /// time. Returns `None` when the queue is empty.
    pub fn pop_earliest(&mut self) -> Option<(EventKey, Event)> {
        let (key, event) = self.events.pop_first()?;
        self.now = key.time;
        Some((key, event))
    }

    /// Trigger time of the next event without removing it.
    pub fn peek_next_time(&self) -> Option<Duration> {
        self.events.first_key_value().map(|(key, _)| key.time)
    }

    /// Whether any events are pending.
    pub fn has_more(&self) -> bool {
        !self.events.is_empty()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Advance the clock without popping, never moving it backwards.
    /// Used by the runner's `run_until` so polling callers always observe
    /// time reaching their requested bound.
    pub(crate) fn advance_to(&mut self, time: Duration) {
        if time > self.now {
            self.now = time;
        }
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
