//! The actor step capability.

use meshkit_types::{Address, Message};
use std::time::Duration;

/// Error type for actor step failures.
///
/// Step failures carry arbitrary user errors; the harness reacts to any
/// failure the same way (crash-stop removal), so no structured taxonomy
/// is needed here.
pub type ActorError = Box<dyn std::error::Error + Send + Sync>;

/// Why an actor was removed from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A scheduled leave removed the actor.
    Left,
    /// The actor's step failed and crash-stop removed it.
    Crashed,
}

/// Inputs for one actor step, constructed fresh per invocation.
///
/// `time` is the actor's local view of the virtual clock: the harness
/// adds the actor's configured time offset, modelling per-actor clock
/// skew. `destination` may be longer than `self_address` when the message
/// was routed to this actor by prefix (addressing a sub-component).
#[derive(Debug, Clone)]
pub struct StepContext {
    /// The actor's local time for this step.
    pub time: Duration,
    /// Address the incoming message was sent from.
    pub source: Address,
    /// Address the incoming message was sent to.
    pub destination: Address,
    /// The address this actor is registered at.
    pub self_address: Address,
    /// The incoming message.
    pub message: Message,
}

/// One message emitted by an actor step.
#[derive(Debug, Clone)]
pub struct Outgoing {
    /// Optional suffix appended to the actor's registered address to form
    /// the outgoing source (lets sub-components identify themselves).
    pub source_suffix: Option<String>,
    /// Where to deliver the message.
    pub destination: Address,
    /// The message to deliver.
    pub message: Message,
}

impl Outgoing {
    /// Emit from the actor's registered address.
    pub fn new(destination: Address, message: Message) -> Self {
        Self {
            source_suffix: None,
            destination,
            message,
        }
    }

    /// Emit from a sub-component of the actor's registered address.
    pub fn from_suffix(suffix: impl Into<String>, destination: Address, message: Message) -> Self {
        Self {
            source_suffix: Some(suffix.into()),
            destination,
            message,
        }
    }
}

/// A simulated participant: one step function plus whatever state closes
/// over it.
///
/// # Guarantees required of implementations
///
/// - **Synchronous**: `step` never blocks
/// - **Deterministic**: given the same state and context, always returns
///   the same emissions
/// - **No I/O**: all effects flow through the returned [`Outgoing`] list
///
/// A step returning `Err` triggers crash-stop: the harness removes the
/// actor and the rest of the simulation continues unaffected.
pub trait Actor {
    /// Advance one step, producing zero or more outgoing messages.
    fn step(&mut self, ctx: StepContext) -> Result<Vec<Outgoing>, ActorError>;

    /// Teardown hook, called once when the actor is removed (leave or
    /// crash-stop). Default is a no-op; the primary harness sends no
    /// notification on removal, so only override this when the actor
    /// holds external state worth releasing.
    fn on_stop(&mut self, reason: StopReason) {
        let _ = reason;
    }
}
