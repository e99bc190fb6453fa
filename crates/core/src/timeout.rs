//! Generic deadline tracking.
//!
//! [`TimeoutTracker`] maps tracked items to deadlines and expires them in
//! bulk when time advances. Nothing fires on its own: callers drive the
//! tracker by calling [`process`](TimeoutTracker::process) with the
//! current time, and use the returned next deadline to know how long they
//! may sleep before anything is due.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::Duration;
use thiserror::Error;

/// Errors from deadline registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeoutError {
    #[error("item is already tracked; cancel it before rescheduling")]
    DuplicateItem,
}

/// A deadline-ordered set of tracked items.
///
/// Each item appears at most once. Insertion and cancellation are
/// O(log n); expiring the k items due at a given time is O(k log n).
/// Items sharing a deadline expire together; their relative order within
/// one `process` call is unspecified.
#[derive(Debug, Clone)]
pub struct TimeoutTracker<K> {
    /// Deadline-ordered storage. The sequence component keeps entries
    /// with equal deadlines distinct.
    by_deadline: BTreeMap<(Duration, u64), K>,
    /// Reverse index for O(log n) cancellation.
    index: HashMap<K, (Duration, u64)>,
    sequence: u64,
}

impl<K: Clone + Eq + Hash> TimeoutTracker<K> {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            by_deadline: BTreeMap::new(),
            index: HashMap::new(),
            sequence: 0,
        }
    }

    /// Register `item` to expire at `deadline`.
    ///
    /// Fails if `item` is already tracked; callers must [`cancel`](Self::cancel)
    /// first to reschedule.
    pub fn add(&mut self, item: K, deadline: Duration) -> Result<(), TimeoutError> {
        if self.index.contains_key(&item) {
            return Err(TimeoutError::DuplicateItem);
        }
        self.sequence += 1;
        let slot = (deadline, self.sequence);
        self.index.insert(item.clone(), slot);
        self.by_deadline.insert(slot, item);
        Ok(())
    }

    /// Remove `item` if tracked. Returns whether it was present.
    ///
    /// Cancelling an absent item is not an error: callers rely on this to
    /// safely cancel items that already expired but were not yet observed.
    pub fn cancel(&mut self, item: &K) -> bool {
        match self.index.remove(item) {
            Some(slot) => {
                self.by_deadline.remove(&slot);
                true
            }
            None => false,
        }
    }

    /// Remove and return every item whose deadline is at or before `now`,
    /// along with the minimum deadline among what remains.
    pub fn process(&mut self, now: Duration) -> (Vec<K>, Option<Duration>) {
        let mut expired = Vec::new();
        while let Some((slot, item)) = self.by_deadline.pop_first() {
            if slot.0 > now {
                // Not due yet; put it back and stop.
                self.by_deadline.insert(slot, item);
                break;
            }
            self.index.remove(&item);
            expired.push(item);
        }
        (expired, self.next_deadline())
    }

    /// The earliest tracked deadline, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.by_deadline.first_key_value().map(|(&(d, _), _)| d)
    }

    /// Whether `item` is currently tracked.
    pub fn contains(&self, item: &K) -> bool {
        self.index.contains_key(item)
    }

    /// Number of tracked items.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the tracker is empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl<K: Clone + Eq + Hash> Default for TimeoutTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}
