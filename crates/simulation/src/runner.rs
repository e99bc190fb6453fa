//! Deterministic simulation runner.
//!
//! The runner owns the event queue and the live actor registry. Each
//! `step` pops the earliest event, advances the virtual clock to its
//! trigger time, and dispatches: registry mutation for join/leave, a
//! callback invocation for custom events, or one actor step for message
//! delivery. Messages the actor emits are translated back into events —
//! same-time delivery for ordinary destinations, or a delayed callback
//! when the destination falls under the reserved timer prefix.

use crate::event_queue::{Event, EventQueue};
use crate::router::{AddressRouter, RouterError};
use meshkit_core::{Actor, Outgoing, StepContext, StopReason};
use meshkit_types::{Address, Message};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Reserved address prefixes recognized by the runner.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Prefix reinterpreted as "schedule a timer callback". An emitted
    /// message to `<timer_prefix>:<millis>[:...]` is delivered back to
    /// its sender after that many milliseconds.
    pub timer_prefix: Address,
    /// Source address used for priming messages. No actor may register
    /// under it.
    pub management_prefix: Address,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            timer_prefix: Address::parse("timer").expect("valid literal address"),
            management_prefix: Address::parse("mgmt").expect("valid literal address"),
        }
    }
}

/// An expected-condition drop, reported through the optional hook.
///
/// These are normal in an asynchronous, lossy-by-design model; the hook
/// exists for observability and never changes control flow.
#[derive(Debug, Clone)]
pub enum DropReason {
    /// No registered address is a prefix of the destination (the actor
    /// may simply have left already).
    UnroutableMessage {
        source: Address,
        destination: Address,
    },
    /// Timer-prefixed destination whose duration segment is missing or
    /// not an integer.
    MalformedTimerAddress {
        source: Address,
        destination: Address,
    },
    /// An emitted message carried a source suffix that does not parse as
    /// address segments.
    InvalidSourceSuffix { address: Address, suffix: String },
}

type DropHook = Box<dyn FnMut(&DropReason)>;

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone)]
pub struct SimulationStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Custom callbacks invoked.
    pub custom_callbacks_run: u64,
    /// Actors registered via join events.
    pub actors_joined: u64,
    /// Actors removed via leave events.
    pub actors_left: u64,
    /// Actors removed by crash-stop.
    pub actors_crashed: u64,
    /// Messages delivered to an actor step (priming included).
    pub messages_delivered: u64,
    /// Priming messages delivered during join processing.
    pub priming_messages_delivered: u64,
    /// Messages dropped because no actor resolved for the destination.
    pub messages_dropped_unroutable: u64,
    /// Timer-prefixed emissions dropped for a malformed duration segment.
    pub malformed_timer_drops: u64,
    /// Timer callbacks scheduled via the timer-address convention.
    pub timer_callbacks_scheduled: u64,
}

impl SimulationStats {
    /// Total messages dropped (unroutable + malformed timer).
    pub fn messages_dropped(&self) -> u64 {
        self.messages_dropped_unroutable + self.malformed_timer_drops
    }
}

/// Errors from the `schedule_*` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("cannot schedule at {when:?}: virtual time has already reached {now:?}")]
    OrderingViolation { when: Duration, now: Duration },
}

/// Errors from `step`.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("no events pending")]
    EmptyQueue,
    /// A join event targeted a reserved or already-owned address.
    #[error(transparent)]
    Conflict(#[from] RouterError),
    /// A leave event targeted an address with no registered actor.
    #[error("no actor registered at {0}")]
    NotRegistered(Address),
}

/// One live actor and its clock skew.
struct ActorSlot {
    actor: Box<dyn Actor>,
    time_offset: Duration,
}

enum Delivery {
    Delivered,
    Dropped,
    Crashed,
}

/// Deterministic simulation runner.
///
/// Single-threaded, run-to-completion per event: no other actor's event
/// can interleave mid-step. Replaying an identical sequence of
/// `schedule_*` calls produces an identical sequence of actor-step
/// invocations. For independent simulations, create independent runners;
/// nothing is shared.
pub struct SimulationRunner {
    config: SimulationConfig,
    queue: EventQueue,
    actors: AddressRouter<ActorSlot>,
    stats: SimulationStats,
    on_drop: Option<DropHook>,
}

impl SimulationRunner {
    /// Create a runner with the given reserved prefixes.
    pub fn new(config: SimulationConfig) -> Self {
        let reserved = vec![
            config.timer_prefix.clone(),
            config.management_prefix.clone(),
        ];
        Self {
            config,
            queue: EventQueue::new(),
            actors: AddressRouter::new(reserved),
            stats: SimulationStats::default(),
            on_drop: None,
        }
    }

    /// Register a hook invoked on every expected-condition drop.
    pub fn set_drop_hook(&mut self, hook: impl FnMut(&DropReason) + 'static) {
        self.on_drop = Some(Box::new(hook));
    }

    // ─── Scheduling ───

    /// Schedule an actor to join at `when`.
    ///
    /// `time_offset` is added to the virtual clock whenever this actor's
    /// local view of time is computed, modelling per-actor clock skew.
    /// `priming` messages are delivered to the actor synchronously from
    /// the management source as part of join processing, before any other
    /// event reaches it. Address conflicts surface from the `step` that
    /// processes the join, not from this call.
    pub fn schedule_join(
        &mut self,
        address: Address,
        actor: Box<dyn Actor>,
        time_offset: Duration,
        when: Duration,
        priming: Vec<Message>,
    ) -> Result<(), ScheduleError> {
        self.check_ordering(when)?;
        self.queue.push(
            when,
            Event::Join {
                address,
                actor,
                time_offset,
                priming,
            },
        );
        Ok(())
    }

    /// Schedule the actor at `address` to be removed at `when`.
    pub fn schedule_leave(&mut self, address: Address, when: Duration) -> Result<(), ScheduleError> {
        self.check_ordering(when)?;
        self.queue.push(when, Event::Leave { address });
        Ok(())
    }

    /// Schedule delivery of a message at `when`.
    pub fn schedule_message(
        &mut self,
        source: Address,
        destination: Address,
        message: Message,
        when: Duration,
    ) -> Result<(), ScheduleError> {
        self.check_ordering(when)?;
        self.queue.push(
            when,
            Event::Message {
                source,
                destination,
                message,
            },
        );
        Ok(())
    }

    /// Schedule an arbitrary callback at `when`. The callback receives
    /// the virtual time it runs at.
    pub fn schedule_custom(
        &mut self,
        callback: impl FnOnce(Duration) + 'static,
        when: Duration,
    ) -> Result<(), ScheduleError> {
        self.check_ordering(when)?;
        self.queue.push(
            when,
            Event::Custom {
                callback: Box::new(callback),
            },
        );
        Ok(())
    }

    fn check_ordering(&self, when: Duration) -> Result<(), ScheduleError> {
        let now = self.queue.now();
        if when < now {
            return Err(ScheduleError::OrderingViolation { when, now });
        }
        Ok(())
    }

    // ─── Execution ───

    /// Whether any events are pending.
    pub fn has_more(&self) -> bool {
        self.queue.has_more()
    }

    /// Trigger time of the next event, if any.
    pub fn peek_next_time(&self) -> Option<Duration> {
        self.queue.peek_next_time()
    }

    /// Current virtual time (trigger time of the last processed event).
    pub fn now(&self) -> Duration {
        self.queue.now()
    }

    /// Process one event: pop the earliest, advance the clock to its
    /// trigger time, dispatch, and return the new current time.
    ///
    /// Contract violations (join conflict, leave of an unregistered
    /// address, empty queue) surface as errors. Actor step failures do
    /// NOT: crash-stop removes the offending actor and `step` succeeds,
    /// so one misbehaving actor cannot halt the simulation.
    pub fn step(&mut self) -> Result<Duration, StepError> {
        let (key, event) = self.queue.pop_earliest().ok_or(StepError::EmptyQueue)?;
        let now = key.time;
        self.stats.events_processed += 1;
        trace!(time = ?now, event = ?event, "processing event");

        match event {
            Event::Custom { callback } => {
                callback(now);
                self.stats.custom_callbacks_run += 1;
            }

            Event::Join {
                address,
                actor,
                time_offset,
                priming,
            } => {
                self.actors
                    .register(address.clone(), ActorSlot { actor, time_offset })?;
                self.stats.actors_joined += 1;
                debug!(%address, "actor joined");

                // Priming runs synchronously before the join finishes; a
                // crash aborts the remaining messages.
                for message in priming {
                    let source = self.config.management_prefix.clone();
                    match self.deliver(source, address.clone(), message) {
                        Delivery::Delivered => self.stats.priming_messages_delivered += 1,
                        Delivery::Dropped | Delivery::Crashed => break,
                    }
                }
            }

            Event::Leave { address } => match self.actors.unregister(&address) {
                Some(mut slot) => {
                    slot.actor.on_stop(StopReason::Left);
                    self.stats.actors_left += 1;
                    debug!(%address, "actor left");
                }
                None => return Err(StepError::NotRegistered(address)),
            },

            Event::Message {
                source,
                destination,
                message,
            } => {
                self.deliver(source, destination, message);
            }
        }

        Ok(now)
    }

    /// Process events until the next trigger time exceeds `end_time` or
    /// the queue drains, then advance the clock to `end_time`.
    pub fn run_until(&mut self, end_time: Duration) -> Result<(), StepError> {
        while let Some(next) = self.queue.peek_next_time() {
            if next > end_time {
                break;
            }
            self.step()?;
        }
        // Always reach end_time so polling callers make progress even
        // when the queue drains early.
        self.queue.advance_to(end_time);
        Ok(())
    }

    // ─── Introspection ───

    /// Simulation statistics.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// The registered address a message to `destination` would route to.
    pub fn resolve(&self, destination: &Address) -> Option<&Address> {
        self.actors.resolve(destination)
    }

    /// Whether an actor is registered at exactly `address`.
    pub fn is_registered(&self, address: &Address) -> bool {
        self.actors.contains(address)
    }

    /// Number of live actors.
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    // ─── Dispatch internals ───

    /// Deliver one message to whichever actor resolves for `destination`,
    /// translating its emissions into new events.
    fn deliver(&mut self, source: Address, destination: Address, message: Message) -> Delivery {
        let Some(self_address) = self.actors.resolve(&destination).cloned() else {
            self.stats.messages_dropped_unroutable += 1;
            debug!(%source, %destination, "message to unknown destination dropped");
            self.notify_drop(DropReason::UnroutableMessage {
                source,
                destination,
            });
            return Delivery::Dropped;
        };

        let step_result = match self.actors.get_mut(&self_address) {
            Some(slot) => {
                let ctx = StepContext {
                    time: self.queue.now() + slot.time_offset,
                    source,
                    destination,
                    self_address: self_address.clone(),
                    message,
                };
                slot.actor.step(ctx)
            }
            // resolve() just returned this address; absence is impossible.
            None => return Delivery::Dropped,
        };

        match step_result {
            Ok(outgoing) => {
                self.stats.messages_delivered += 1;
                for emitted in outgoing {
                    self.route_outgoing(&self_address, emitted);
                }
                Delivery::Delivered
            }
            Err(error) => {
                debug!(address = %self_address, %error, "actor step failed, applying crash-stop");
                if let Some(mut slot) = self.actors.unregister(&self_address) {
                    slot.actor.on_stop(StopReason::Crashed);
                }
                self.stats.actors_crashed += 1;
                Delivery::Crashed
            }
        }
    }

    /// Translate one emitted message into a new event.
    fn route_outgoing(&mut self, self_address: &Address, emitted: Outgoing) {
        let Outgoing {
            source_suffix,
            destination,
            message,
        } = emitted;

        let new_source = match source_suffix {
            None => self_address.clone(),
            Some(suffix) => match self_address.child(&suffix) {
                Ok(address) => address,
                Err(_) => {
                    debug!(address = %self_address, suffix, "invalid source suffix on emission, dropping");
                    self.notify_drop(DropReason::InvalidSourceSuffix {
                        address: self_address.clone(),
                        suffix,
                    });
                    return;
                }
            },
        };

        if destination.starts_with(&self.config.timer_prefix) {
            // Timer convention: the segment right after the prefix is a
            // millisecond count; the message comes back to the sender
            // with source and destination swapped after that long.
            let duration_segment = destination.segment(self.config.timer_prefix.len());
            match duration_segment.and_then(|s| s.parse::<u64>().ok()) {
                Some(millis) => {
                    let trigger = self.queue.now() + Duration::from_millis(millis);
                    self.stats.timer_callbacks_scheduled += 1;
                    trace!(to = %new_source, timer = %destination, at = ?trigger, "scheduling timer callback");
                    self.queue.push(
                        trigger,
                        Event::Message {
                            source: destination,
                            destination: new_source,
                            message,
                        },
                    );
                }
                None => {
                    self.stats.malformed_timer_drops += 1;
                    debug!(from = %new_source, timer = %destination, "malformed timer address, dropping message");
                    self.notify_drop(DropReason::MalformedTimerAddress {
                        source: new_source,
                        destination,
                    });
                }
            }
        } else {
            // Same-time delivery: message passing within one step never
            // advances time; only the timer convention does.
            self.queue.push(
                self.queue.now(),
                Event::Message {
                    source: new_source,
                    destination,
                    message,
                },
            );
        }
    }

    fn notify_drop(&mut self, reason: DropReason) {
        if let Some(hook) = self.on_drop.as_mut() {
            hook(&reason);
        }
    }
}

impl Default for SimulationRunner {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}
