//! Hierarchical actor addresses.
//!
//! An address is a non-empty sequence of opaque string segments joined by
//! [`SEPARATOR`]. Addresses identify actors and engine capabilities (the
//! timer facility, the management source) and are compared either exactly
//! or by prefix: `a:b` is a prefix of `a:b:c`, which is how a message to a
//! sub-component (`worker:task7`) routes to the actor registered at
//! `worker`.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between address segments.
pub const SEPARATOR: char = ':';

/// Errors from address construction and parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address must have at least one segment")]
    Empty,
    #[error("address segment must not be empty")]
    EmptySegment,
}

/// A hierarchical address: one or more non-empty segments.
///
/// Segments are opaque strings; the separator character inside a segment
/// is impossible by construction (parsing splits on it, and the segment
/// constructors reject empty pieces).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    segments: Vec<String>,
}

impl Address {
    /// Build an address from pre-split segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, AddressError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(AddressError::Empty);
        }
        if segments.iter().any(|s| s.is_empty() || s.contains(SEPARATOR)) {
            return Err(AddressError::EmptySegment);
        }
        Ok(Self { segments })
    }

    /// Parse an address from its textual form, e.g. `"timer:5000"`.
    pub fn parse(text: &str) -> Result<Self, AddressError> {
        if text.is_empty() {
            return Err(AddressError::Empty);
        }
        Self::from_segments(text.split(SEPARATOR))
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`: addresses have at least one segment. Provided for
    /// API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Get a segment by index.
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.segments.get(index).map(String::as_str)
    }

    /// Iterate over the segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }

    /// Whether `prefix` is a leading-segment prefix of this address.
    ///
    /// Every address is a prefix of itself.
    pub fn starts_with(&self, prefix: &Address) -> bool {
        prefix.segments.len() <= self.segments.len()
            && self.segments[..prefix.segments.len()] == prefix.segments[..]
    }

    /// The address one segment shorter, or `None` for a single-segment
    /// address. Used by the router's longest-prefix walk.
    pub fn parent(&self) -> Option<Address> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Address {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Append a suffix (itself one or more `:`-separated segments).
    pub fn child(&self, suffix: &str) -> Result<Address, AddressError> {
        let tail = Address::parse(suffix)?;
        let mut segments = self.segments.clone();
        segments.extend(tail.segments);
        Ok(Address { segments })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                write!(f, "{SEPARATOR}")?;
            }
            write!(f, "{segment}")?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(text: &str) -> Address {
        Address::parse(text).unwrap()
    }

    #[test]
    fn test_parse_and_display_roundtrip() {
        let a = addr("a:b:c");
        assert_eq!(a.len(), 3);
        assert_eq!(a.to_string(), "a:b:c");
        assert_eq!(a.segment(1), Some("b"));
        assert_eq!(a.segment(3), None);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(Address::parse(""), Err(AddressError::Empty));
        assert_eq!(Address::parse("a::b"), Err(AddressError::EmptySegment));
        assert_eq!(Address::parse(":a"), Err(AddressError::EmptySegment));
        assert_eq!(Address::parse("a:"), Err(AddressError::EmptySegment));
    }

    #[test]
    fn test_from_segments_rejects_separator_in_segment() {
        assert_eq!(
            Address::from_segments(["a:b"]),
            Err(AddressError::EmptySegment)
        );
    }

    #[test]
    fn test_prefix_relation() {
        let full = addr("a:b:c");
        assert!(full.starts_with(&addr("a")));
        assert!(full.starts_with(&addr("a:b")));
        assert!(full.starts_with(&addr("a:b:c")));
        assert!(!full.starts_with(&addr("a:b:c:d")));
        assert!(!full.starts_with(&addr("b")));
        // Prefix is per-segment, not per-character.
        assert!(!addr("abc").starts_with(&addr("ab")));
    }

    #[test]
    fn test_parent_walk() {
        let a = addr("a:b:c");
        let b = a.parent().unwrap();
        assert_eq!(b, addr("a:b"));
        let c = b.parent().unwrap();
        assert_eq!(c, addr("a"));
        assert_eq!(c.parent(), None);
    }

    #[test]
    fn test_child() {
        assert_eq!(addr("a").child("b:c").unwrap(), addr("a:b:c"));
        assert!(addr("a").child("").is_err());
        assert!(addr("a").child(":x").is_err());
    }
}
