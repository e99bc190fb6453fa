//! Type-erased registry for inbound request handlers.
//!
//! Stores typed handlers keyed by the `TypeId` of the unwrapped request
//! content and dispatches incoming requests to the matching handler.
//! Dispatch is in-process (no serialization), so the runtime type is the
//! discriminator; a wire transport would key on a stable type-id string
//! instead.

use meshkit_core::ActorError;
use meshkit_types::Message;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Duration;
use tracing::trace;

use crate::CorrelatorError;

/// Type-erased handler that downcasts the content and calls the typed handler.
type RawHandler = Box<dyn FnMut(Duration, &Message) -> Result<Option<Message>, ActorError>>;

/// Registry of typed request handlers, keyed by content type.
///
/// Unknown request types are dropped silently — the correlator may be
/// shared across many protocols, and requests for types nobody registered
/// are normal. Handler errors are NOT swallowed; they propagate to the
/// caller so the owning actor's crash-stop boundary can contain them.
pub struct RequestHandlerRegistry {
    handlers: HashMap<TypeId, (&'static str, RawHandler)>,
}

impl RequestHandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a typed handler for request content of type `M`.
    ///
    /// The handler receives the current time and the unwrapped content,
    /// and returns the response content — or `None` to decline answering
    /// (e.g. a malformed sub-request), in which case the request is
    /// dropped.
    pub fn register<M, F>(&mut self, handler: F) -> Result<(), CorrelatorError>
    where
        M: Any,
        F: FnMut(Duration, &M) -> Result<Option<Message>, ActorError> + 'static,
    {
        let type_name = std::any::type_name::<M>();
        if self.handlers.contains_key(&TypeId::of::<M>()) {
            return Err(CorrelatorError::HandlerConflict(type_name));
        }
        let mut handler = handler;
        let erased: RawHandler = Box::new(move |now, content| {
            match content.as_any().downcast_ref::<M>() {
                Some(typed) => handler(now, typed),
                // Keyed lookup guarantees the downcast succeeds; an entry
                // under the wrong key would be a registry bug.
                None => Ok(None),
            }
        });
        self.handlers.insert(TypeId::of::<M>(), (type_name, erased));
        Ok(())
    }

    /// Remove the handler for content type `M`. Returns whether one was
    /// registered.
    pub fn unregister<M: Any>(&mut self) -> bool {
        self.handlers.remove(&TypeId::of::<M>()).is_some()
    }

    /// Dispatch unwrapped request content to its handler.
    ///
    /// Returns `Ok(None)` when no handler is registered for the content
    /// type or the handler declined to answer.
    pub fn dispatch(
        &mut self,
        now: Duration,
        content: &Message,
    ) -> Result<Option<Message>, ActorError> {
        let type_id = content.as_any().type_id();
        match self.handlers.get_mut(&type_id) {
            Some((_, handler)) => handler(now, content),
            None => {
                trace!(content = ?content, "no handler registered for request type, dropping");
                Ok(None)
            }
        }
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for RequestHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshkit_types::{downcast_ref, message};

    #[derive(Debug)]
    struct Ping(u32);

    #[test]
    fn test_typed_dispatch() {
        let mut registry = RequestHandlerRegistry::new();
        registry
            .register::<Ping, _>(|_, ping| Ok(Some(message(ping.0 + 1))))
            .unwrap();

        let response = registry
            .dispatch(Duration::ZERO, &message(Ping(41)))
            .unwrap()
            .unwrap();
        assert_eq!(*downcast_ref::<u32>(&response).unwrap(), 42);
    }

    #[test]
    fn test_unknown_type_dropped() {
        let mut registry = RequestHandlerRegistry::new();
        registry
            .register::<Ping, _>(|_, _| Ok(Some(message(0u8))))
            .unwrap();
        let result = registry.dispatch(Duration::ZERO, &message("wrong type"));
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_conflict_on_double_registration() {
        let mut registry = RequestHandlerRegistry::new();
        registry.register::<Ping, _>(|_, _| Ok(None)).unwrap();
        let err = registry.register::<Ping, _>(|_, _| Ok(None)).unwrap_err();
        assert!(matches!(err, CorrelatorError::HandlerConflict(_)));
    }

    #[test]
    fn test_unregister_allows_reregistration() {
        let mut registry = RequestHandlerRegistry::new();
        registry.register::<Ping, _>(|_, _| Ok(None)).unwrap();
        assert!(registry.unregister::<Ping>());
        assert!(!registry.unregister::<Ping>());
        registry.register::<Ping, _>(|_, _| Ok(None)).unwrap();
    }

    #[test]
    fn test_handler_error_propagates() {
        let mut registry = RequestHandlerRegistry::new();
        registry
            .register::<Ping, _>(|_, _| Err("handler exploded".into()))
            .unwrap();
        let err = registry
            .dispatch(Duration::ZERO, &message(Ping(0)))
            .unwrap_err();
        assert_eq!(err.to_string(), "handler exploded");
    }
}
