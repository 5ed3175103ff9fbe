//! Priorities
//!
//! Lower numeric value = more urgent. A scheduler instance accepts
//! priorities `0..maximum_priority`; `maximum_priority` itself is reserved
//! for the idle threads.

pub mod aggregation;

pub use aggregation::{PriorityAggregation, PriorityChange, PrioritySource};

/// Thread priority
pub type Priority = u64;

/// Largest priority a `PriorityKey` can carry without losing its top bit
pub const PRIORITY_LIMIT: Priority = Priority::MAX >> 1;

/// Priority value tagged with its insert position among equals
///
/// The priority is stored shifted by one; bit 0 set means append (after
/// every ready thread of the same priority), clear means prepend (before
/// them). Comparing a key against the unshifted priority of a queued
/// thread gives the ordered-insert position directly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PriorityKey(u64);

const APPEND_FLAG: u64 = 1;

impl PriorityKey {
    /// FIFO within the priority band
    pub const fn append(priority: Priority) -> Self {
        Self((priority << 1) | APPEND_FLAG)
    }

    /// LIFO within the priority band
    pub const fn prepend(priority: Priority) -> Self {
        Self(priority << 1)
    }

    pub const fn new(priority: Priority, prepend: bool) -> Self {
        if prepend {
            Self::prepend(priority)
        } else {
            Self::append(priority)
        }
    }

    pub const fn priority(self) -> Priority {
        self.0 >> 1
    }

    pub const fn is_append(self) -> bool {
        self.0 & APPEND_FLAG != 0
    }

    /// Same priority, append position
    pub const fn purify(self) -> Self {
        Self::append(self.priority())
    }

    /// Does a thread inserted with this key go before a queued thread of
    /// priority `queued`?
    pub const fn goes_before(self, queued: Priority) -> bool {
        self.0 <= (queued << 1)
    }
}

impl core::fmt::Debug for PriorityKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let position = if self.is_append() { "append" } else { "prepend" };
        write!(f, "PriorityKey({}, {})", self.priority(), position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_goes_after_equal_priority() {
        let key = PriorityKey::append(5);
        assert!(!key.goes_before(5));
        assert!(key.goes_before(6));
        assert!(!key.goes_before(4));
    }

    #[test]
    fn test_prepend_goes_before_equal_priority() {
        let key = PriorityKey::prepend(5);
        assert!(key.goes_before(5));
        assert!(!key.goes_before(4));
        assert_eq!(key.priority(), 5);
        assert!(key.purify().is_append());
    }
}
