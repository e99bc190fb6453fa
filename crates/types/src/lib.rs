//! Foundation types for meshkit.
//!
//! This crate provides the types shared by every layer of the framework:
//!
//! - **Addresses**: hierarchical, `:`-separated actor addresses with
//!   prefix arithmetic ([`Address`])
//! - **Messages**: opaque payloads with a runtime type discriminator
//!   ([`Message`], [`Payload`])
//! - **Envelopes**: the request/response wire shapes used by the
//!   correlation engine ([`RequestEnvelope`], [`ResponseEnvelope`],
//!   [`CorrelationKey`])
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not
//! depend on any other workspace crates, making it the foundation layer.

mod address;
mod envelope;
mod message;

pub use address::{Address, AddressError, SEPARATOR};
pub use envelope::{CorrelationKey, RequestEnvelope, ResponseEnvelope};
pub use message::{downcast_ref, message, Message, Payload};
