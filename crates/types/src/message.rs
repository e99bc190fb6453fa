//! Opaque message payloads.
//!
//! The core never interprets message contents; it only needs a runtime
//! type discriminator so the correlation engine can dispatch inbound
//! requests to typed handlers. Payloads are type-erased behind [`Payload`]
//! and shared via `Arc` so fan-out (priming, broadcast-style emission)
//! never copies the content.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A type-erased message payload.
///
/// Blanket-implemented for every `Any + Debug + Send + Sync` type; user
/// code never implements this directly.
pub trait Payload: Any + fmt::Debug + Send + Sync {
    /// Access the payload as `Any` for downcasting and `TypeId` lookup.
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug + Send + Sync> Payload for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An opaque, shareable message.
pub type Message = Arc<dyn Payload>;

/// Wrap a value into an opaque [`Message`].
pub fn message<T: Any + fmt::Debug + Send + Sync>(value: T) -> Message {
    Arc::new(value)
}

/// Downcast a message to a concrete payload type.
pub fn downcast_ref<T: Any>(message: &Message) -> Option<&T> {
    message.as_ref().as_any().downcast_ref::<T>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downcast_matches_concrete_type() {
        let m = message("hello".to_string());
        assert_eq!(downcast_ref::<String>(&m).unwrap(), "hello");
        assert!(downcast_ref::<u64>(&m).is_none());
    }

    #[test]
    fn test_type_id_is_concrete() {
        let m = message(42u32);
        assert_eq!(m.as_any().type_id(), std::any::TypeId::of::<u32>());
    }

    #[test]
    fn test_clone_shares_content() {
        let m = message(vec![1u8, 2, 3]);
        let n = m.clone();
        assert!(Arc::ptr_eq(&m, &n));
    }
}
