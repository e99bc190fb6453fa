//! Hierarchical address routing with longest-prefix resolution.

use meshkit_types::Address;
use std::collections::HashMap;
use thiserror::Error;

/// Errors from route registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("address {0} is already registered")]
    AddressInUse(Address),
    #[error("address {address} falls under reserved prefix {prefix}")]
    ReservedPrefix { address: Address, prefix: Address },
}

/// Registry mapping exact addresses to targets, resolved by longest
/// registered prefix.
///
/// Only exact registered addresses are stored; lookup walks the
/// destination's prefixes from longest to shortest and returns the first
/// hit. This lets a message to `worker:task7` route to the actor
/// registered at `worker`.
#[derive(Debug)]
pub struct AddressRouter<T> {
    reserved: Vec<Address>,
    routes: HashMap<Address, T>,
}

impl<T> AddressRouter<T> {
    /// Create a router. Registrations at or under any `reserved` prefix
    /// are rejected.
    pub fn new(reserved: Vec<Address>) -> Self {
        Self {
            reserved,
            routes: HashMap::new(),
        }
    }

    /// Register `target` at `address`.
    ///
    /// Fails if `address` falls under a reserved prefix or an existing
    /// registration already owns it exactly. Registrations where one
    /// address is a strict prefix of another are legal; resolution picks
    /// the most specific.
    pub fn register(&mut self, address: Address, target: T) -> Result<(), RouterError> {
        if let Some(prefix) = self.reserved.iter().find(|p| address.starts_with(p)) {
            return Err(RouterError::ReservedPrefix {
                address,
                prefix: prefix.clone(),
            });
        }
        if self.routes.contains_key(&address) {
            return Err(RouterError::AddressInUse(address));
        }
        self.routes.insert(address, target);
        Ok(())
    }

    /// Remove the registration at exactly `address`, returning its target.
    pub fn unregister(&mut self, address: &Address) -> Option<T> {
        self.routes.remove(address)
    }

    /// The longest registered prefix of `destination`, or `None` if no
    /// registered address is a prefix of it.
    pub fn resolve(&self, destination: &Address) -> Option<&Address> {
        let mut probe = Some(destination.clone());
        while let Some(candidate) = probe {
            if let Some((registered, _)) = self.routes.get_key_value(&candidate) {
                return Some(registered);
            }
            probe = candidate.parent();
        }
        None
    }

    /// The target registered at exactly `address`.
    pub fn get_mut(&mut self, address: &Address) -> Option<&mut T> {
        self.routes.get_mut(address)
    }

    /// Whether `address` is registered exactly.
    pub fn contains(&self, address: &Address) -> bool {
        self.routes.contains_key(address)
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no addresses are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterate over registered addresses (arbitrary order).
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.routes.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(text: &str) -> Address {
        Address::parse(text).unwrap()
    }

    fn router() -> AddressRouter<u32> {
        AddressRouter::new(vec![addr("timer"), addr("mgmt")])
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut r = router();
        r.register(addr("a"), 1).unwrap();
        r.register(addr("a:b"), 2).unwrap();

        assert_eq!(r.resolve(&addr("a:b:c")), Some(&addr("a:b")));
        assert_eq!(r.resolve(&addr("a:x")), Some(&addr("a")));
        assert_eq!(r.resolve(&addr("a")), Some(&addr("a")));
        assert_eq!(r.resolve(&addr("z")), None);
    }

    #[test]
    fn test_exact_duplicate_rejected() {
        let mut r = router();
        r.register(addr("a"), 1).unwrap();
        assert_eq!(
            r.register(addr("a"), 2),
            Err(RouterError::AddressInUse(addr("a")))
        );
    }

    #[test]
    fn test_reserved_prefixes_rejected() {
        let mut r = router();
        assert!(matches!(
            r.register(addr("timer"), 1),
            Err(RouterError::ReservedPrefix { .. })
        ));
        assert!(matches!(
            r.register(addr("timer:500"), 1),
            Err(RouterError::ReservedPrefix { .. })
        ));
        assert!(matches!(
            r.register(addr("mgmt:x"), 1),
            Err(RouterError::ReservedPrefix { .. })
        ));
        // Similar-looking but distinct first segment is fine.
        r.register(addr("timers"), 1).unwrap();
    }

    #[test]
    fn test_unregister_frees_address() {
        let mut r = router();
        r.register(addr("a"), 1).unwrap();
        assert_eq!(r.unregister(&addr("a")), Some(1));
        assert_eq!(r.unregister(&addr("a")), None);
        assert_eq!(r.resolve(&addr("a")), None);
        r.register(addr("a"), 2).unwrap();
    }

    #[test]
    fn test_resolution_after_specific_leaves() {
        let mut r = router();
        r.register(addr("a"), 1).unwrap();
        r.register(addr("a:b"), 2).unwrap();
        r.unregister(&addr("a:b"));
        // Falls back to the prefix ancestor.
        assert_eq!(r.resolve(&addr("a:b:c")), Some(&addr("a")));
    }
}
