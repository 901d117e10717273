//! Regular-activity classification over a newest-first event stream.
//!
//! Time before `now` is cut into buckets of `interval_days` days; bucket 0
//! holds events younger than one interval. Walking events from newest to
//! oldest, every bucket skipped between two consecutive events (or between
//! `now` and the newest event) costs one unit of tolerance. A user who runs
//! out of tolerance went quiet for too long at some point.
//!
//! [`ActivityTracker`] consumes one event at a time and never looks across
//! events, so feeding it page by page gives the same answer as feeding it a
//! fully materialised list.

use chrono::{DateTime, Utc};

/// Incremental form of [`is_regularly_active`].
#[derive(Debug, Clone)]
pub struct ActivityTracker {
  now:         DateTime<Utc>,
  interval:    i64,
  budget:      i64,
  last_bucket: i64,
}

impl ActivityTracker {
  /// `interval_days` of zero is treated as one.
  pub fn new(interval_days: u32, tolerance: u32, now: DateTime<Utc>) -> Self {
    Self {
      now,
      interval: i64::from(interval_days.max(1)),
      budget: i64::from(tolerance),
      last_bucket: -1,
    }
  }

  /// The bucket an event falls into. Future timestamps land in bucket 0.
  pub fn bucket(&self, at: DateTime<Utc>) -> i64 {
    (self.now - at).num_days().max(0) / self.interval
  }

  /// Feed the next (older or equal) event. Returns `false` once the
  /// tolerance is exhausted; later calls keep returning `false`.
  pub fn observe(&mut self, at: DateTime<Utc>) -> bool {
    if !self.is_active() {
      return false;
    }
    let bucket = self.bucket(at);
    let gap = (bucket - self.last_bucket - 1).max(0);
    self.budget -= gap;
    self.last_bucket = self.last_bucket.max(bucket);
    self.is_active()
  }

  pub fn is_active(&self) -> bool { self.budget >= 0 }

  /// Tolerance left; negative once the tracker has failed.
  pub fn remaining(&self) -> i64 { self.budget }
}

/// `true` when no run of empty buckets inside `events` exceeds the tolerance.
///
/// `events` must be ordered newest first. An empty stream passes; callers
/// gate on record counts separately.
pub fn is_regularly_active<I>(
  events: I,
  interval_days: u32,
  tolerance: u32,
  now: DateTime<Utc>,
) -> bool
where
  I: IntoIterator<Item = DateTime<Utc>>,
{
  let mut tracker = ActivityTracker::new(interval_days, tolerance, now);
  events.into_iter().all(|at| tracker.observe(at))
}
