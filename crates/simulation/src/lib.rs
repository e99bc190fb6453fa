//! Deterministic simulation harness.
//!
//! This crate provides a fully deterministic environment for driving
//! actors on a shared virtual clock. Given the same schedule of calls, it
//! produces identical results every run — which is the entire point:
//! protocol bugs reproduce bit-for-bit.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   SimulationRunner                      │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │      EventQueue (BTreeMap<EventKey, Event>)        │ │
//! │  │      Ordered by: (trigger time, sequence)          │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │      AddressRouter → registered actors             │ │
//! │  │      longest-prefix resolution, one step per event │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │      Emitted messages → new events                 │ │
//! │  │      (timer prefix ⇒ delayed callback to sender)   │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on one thread, run-to-completion per event: an actor's
//! step and the translation of its emissions are atomic with respect to
//! the rest of the simulation.

mod event_queue;
mod router;
mod runner;

pub use event_queue::{Event, EventKey, EventQueue};
pub use router::{AddressRouter, RouterError};
pub use runner::{
    DropReason, ScheduleError, SimulationConfig, SimulationRunner, SimulationStats, StepError,
};
