//! Request/response correlation with bounded retry.
//!
//! [`RequestCorrelator`] pairs outbound requests with their eventual
//! responses and retries on a bounded schedule when no reply arrives.
//! It performs no I/O and owns no clock: callers hand it the current time
//! and a transport sink on every [`process`](RequestCorrelator::process)
//! call, which is what makes it usable both inside a deterministic
//! simulation step and behind a real transport.
//!
//! # Transmission model
//!
//! `send_request` only enqueues intent — attempt #1 is transmitted by the
//! first `process` call at or after the send time. Retransmissions follow
//! every `retry_timeout` thereafter, and the handler's terminal callback
//! fires exactly once: `on_complete` when a matching response arrives, or
//! `on_timed_out` after exactly `max_attempts` transmissions went
//! unanswered. `max_attempts` bounds sends, not just retries.
//!
//! The symmetric inbound path unwraps request envelopes, dispatches the
//! content to a per-type handler, and queues the produced response —
//! carrying the original correlation key — for the next `process` flush.

mod handlers;

pub use handlers::RequestHandlerRegistry;

use meshkit_core::{ActorError, TimeoutTracker};
use meshkit_types::{downcast_ref, Address, CorrelationKey, Message, RequestEnvelope, ResponseEnvelope};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};

/// Errors from correlator contract violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelatorError {
    #[error("max_attempts must be at least 1")]
    InvalidMaxAttempts,
    #[error("a request handler is already registered for {0}")]
    HandlerConflict(&'static str),
}

/// Terminal outcome receiver for one outbound request.
///
/// Exactly one of the two methods is invoked, exactly once, always
/// synchronously from within `process` or `on_incoming_message`.
pub trait ResponseHandler {
    /// A matching response arrived; `response` is its unwrapped content.
    fn on_complete(&mut self, response: Message);

    /// All transmission attempts went unanswered.
    fn on_timed_out(&mut self);
}

/// Outbound transmission boundary handed to [`RequestCorrelator::process`].
///
/// Fire-and-forget and non-blocking from the correlator's point of view.
pub trait TransportSink {
    /// Hand a payload to the transport for delivery to `destination`.
    fn push(&mut self, destination: Address, payload: Message);
}

impl<F: FnMut(Address, Message)> TransportSink for F {
    fn push(&mut self, destination: Address, payload: Message) {
        self(destination, payload)
    }
}

impl TransportSink for Vec<(Address, Message)> {
    fn push(&mut self, destination: Address, payload: Message) {
        self.push((destination, payload));
    }
}

/// One in-flight outbound request.
struct PendingRequest {
    /// The envelope retransmitted verbatim on every attempt.
    envelope: RequestEnvelope,
    destination: Address,
    handler: Box<dyn ResponseHandler>,
    max_attempts: u32,
    attempts_made: u32,
    retry_timeout: Duration,
}

/// Request/response correlation and retry engine.
///
/// Owns the pending-request table, the deadline tracker, the inbound
/// handler registry, and the queue of responses awaiting flush. Single
/// ownership, no interior mutability: one correlator belongs to one actor
/// (or one transport loop) and is never shared.
pub struct RequestCorrelator {
    pending: HashMap<CorrelationKey, PendingRequest>,
    timeouts: TimeoutTracker<CorrelationKey>,
    /// Responses produced by inbound handlers, awaiting the next
    /// `process` flush.
    outbound_responses: Vec<(Address, Message)>,
    handlers: RequestHandlerRegistry,
    /// Nonce source for correlation keys. Seeded for deterministic tests.
    rng: ChaCha8Rng,
}

impl RequestCorrelator {
    /// Create a correlator with an entropy-seeded nonce source.
    pub fn new() -> Self {
        Self::from_rng(ChaCha8Rng::from_entropy())
    }

    /// Create a correlator with a fixed nonce seed, for deterministic
    /// replay in tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    fn from_rng(rng: ChaCha8Rng) -> Self {
        Self {
            pending: HashMap::new(),
            timeouts: TimeoutTracker::new(),
            outbound_responses: Vec::new(),
            handlers: RequestHandlerRegistry::new(),
            rng,
        }
    }

    /// Track a new outbound request.
    ///
    /// Generates a fresh correlation key, wraps `content` into a request
    /// envelope, and arms the first transmission for the next `process`
    /// call at or after `now`. No I/O happens here.
    ///
    /// Returns the generated key (useful for test introspection). Fails
    /// if `max_attempts` is zero; a zero `retry_timeout` is legal and
    /// means every `process` call retransmits.
    pub fn send_request(
        &mut self,
        now: Duration,
        content: Message,
        destination: Address,
        handler: Box<dyn ResponseHandler>,
        retry_timeout: Duration,
        max_attempts: u32,
    ) -> Result<CorrelationKey, CorrelatorError> {
        if max_attempts < 1 {
            return Err(CorrelatorError::InvalidMaxAttempts);
        }

        // 8 random bytes + 8 time-derived bytes; regenerate on the
        // (negligible) chance of colliding with a live request.
        let mut key = self.generate_key(now);
        while self.pending.contains_key(&key) {
            key = self.generate_key(now);
        }

        trace!(?key, %destination, max_attempts, "tracking outbound request");
        self.pending.insert(
            key,
            PendingRequest {
                envelope: RequestEnvelope { key, content },
                destination,
                handler,
                max_attempts,
                attempts_made: 0,
                retry_timeout,
            },
        );
        // Due immediately: the first process() call transmits attempt #1.
        self.timeouts
            .add(key, now)
            .expect("freshly generated correlation key already tracked");
        Ok(key)
    }

    /// Drive transmissions and timeouts.
    ///
    /// Expires due deadlines: each expired request either retransmits its
    /// envelope to `sink` (re-arming the deadline at `now + retry_timeout`)
    /// or, once `max_attempts` transmissions have been made, is removed
    /// with `on_timed_out` invoked. Also flushes responses queued by the
    /// inbound path. Returns the next wake-up time, or `None` when
    /// nothing is pending.
    pub fn process<S: TransportSink>(&mut self, now: Duration, sink: &mut S) -> Option<Duration> {
        let (expired, _) = self.timeouts.process(now);
        for key in expired {
            // Cancelled-but-not-yet-processed keys have no pending entry.
            let Some(mut request) = self.pending.remove(&key) else {
                continue;
            };
            if request.attempts_made < request.max_attempts {
                request.attempts_made += 1;
                if request.attempts_made > 1 {
                    debug!(
                        ?key,
                        destination = %request.destination,
                        attempt = request.attempts_made,
                        max_attempts = request.max_attempts,
                        "retransmitting request"
                    );
                }
                sink.push(
                    request.destination.clone(),
                    Arc::new(request.envelope.clone()) as Message,
                );
                let next_deadline = now + request.retry_timeout;
                self.pending.insert(key, request);
                self.timeouts
                    .add(key, next_deadline)
                    .expect("expired correlation key still tracked");
            } else {
                debug!(
                    ?key,
                    destination = %request.destination,
                    attempts = request.attempts_made,
                    "request exhausted all attempts"
                );
                request.handler.on_timed_out();
            }
        }

        for (destination, payload) in self.outbound_responses.drain(..) {
            sink.push(destination, payload);
        }

        self.timeouts.next_deadline()
    }

    /// Feed one incoming message to the correlator.
    ///
    /// Response envelopes complete their pending request (late, duplicate,
    /// or unknown keys are ignored — normal in a lossy system). Request
    /// envelopes dispatch to the registered handler for their content
    /// type; the produced response is queued for the next `process` flush,
    /// addressed to `source` and carrying the request's key. Any other
    /// message shape is ignored.
    ///
    /// Handler errors propagate uncaught — containment belongs to the
    /// owning actor's crash-stop boundary, not to the correlator.
    pub fn on_incoming_message(
        &mut self,
        now: Duration,
        source: &Address,
        message: &Message,
    ) -> Result<(), ActorError> {
        if let Some(response) = downcast_ref::<ResponseEnvelope>(message) {
            match self.pending.remove(&response.key) {
                Some(mut request) => {
                    self.timeouts.cancel(&response.key);
                    trace!(key = ?response.key, "request completed");
                    request.handler.on_complete(response.content.clone());
                }
                None => {
                    trace!(key = ?response.key, "ignoring response with no pending request");
                }
            }
            return Ok(());
        }

        if let Some(request) = downcast_ref::<RequestEnvelope>(message) {
            if let Some(content) = self.handlers.dispatch(now, &request.content)? {
                let envelope = ResponseEnvelope {
                    key: request.key,
                    content,
                };
                self.outbound_responses
                    .push((source.clone(), Arc::new(envelope) as Message));
            }
            return Ok(());
        }

        trace!("ignoring message that is neither request nor response envelope");
        Ok(())
    }

    /// Register a typed handler for inbound request content of type `M`.
    ///
    /// See [`RequestHandlerRegistry::register`].
    pub fn register_request_handler<M, F>(&mut self, handler: F) -> Result<(), CorrelatorError>
    where
        M: Any,
        F: FnMut(Duration, &M) -> Result<Option<Message>, ActorError> + 'static,
    {
        self.handlers.register::<M, F>(handler)
    }

    /// Remove the handler for request content of type `M`.
    pub fn unregister_request_handler<M: Any>(&mut self) -> bool {
        self.handlers.unregister::<M>()
    }

    /// Number of requests currently in flight.
    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    /// The next deadline the caller should `process` at, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timeouts.next_deadline()
    }

    fn generate_key(&mut self, now: Duration) -> CorrelationKey {
        CorrelationKey::from_parts(self.rng.next_u64(), now.as_nanos() as u64)
    }
}

impl Default for RequestCorrelator {
    fn default() -> Self {
        Self::new()
    }
}
