//! Core abstractions for meshkit actors.
//!
//! This crate provides:
//!
//! - [`Actor`]: the single step capability every simulated participant
//!   implements
//! - [`StepContext`] / [`Outgoing`]: the explicit per-step input and
//!   output shapes
//! - [`TimeoutTracker`]: a generic deadline-ordered set shared by the
//!   correlation engine and any embedding runtime
//!
//! # Architecture
//!
//! Actors are:
//!
//! - **Synchronous**: no async, no `.await`
//! - **Deterministic**: same state + context = same emissions
//! - **Pure at the boundary**: a fresh [`StepContext`] is built per
//!   invocation and emissions are returned, never pushed through shared
//!   mutable state
//!
//! All I/O and time advancement is handled by whatever drives the actor
//! (the simulation harness, or a transport adapter in a real deployment).

mod actor;
mod timeout;

pub use actor::{Actor, ActorError, Outgoing, StepContext, StopReason};
pub use timeout::{TimeoutError, TimeoutTracker};
