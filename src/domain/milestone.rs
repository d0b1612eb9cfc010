//! Counter threshold detection.

use serde::Serialize;

/// Default view count that triggers the milestone notification.
pub const DEFAULT_VIEW_MILESTONE: i64 = 100;

/// True iff the counter moved from below `threshold` to at/above it.
///
/// Must be evaluated on the before/after pair of a single write: checking only
/// the new value would fire again on every later save.
pub fn check_crossing(old_value: i64, new_value: i64, threshold: i64) -> bool {
    old_value < threshold && threshold <= new_value
}

/// Counter values on either side of one committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterChange {
    pub previous: i64,
    pub current: i64,
}

impl CounterChange {
    pub fn new(previous: i64, current: i64) -> Self {
        Self { previous, current }
    }

    pub fn crossed(&self, threshold: i64) -> bool {
        check_crossing(self.previous, self.current, threshold)
    }
}
