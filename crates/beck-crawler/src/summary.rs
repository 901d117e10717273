//! Per-run tallies.

use std::{fmt, ops::AddAssign};

/// What happened to one user during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOutcome {
  /// New user qualified and was persisted.
  Accepted,
  /// New user did not qualify.
  Rejected,
  /// Stored user gained records or a newer watermark.
  Refreshed,
  /// Stored user is active but had nothing new.
  Unchanged,
  /// Stored user went inactive and was removed.
  Deleted,
  /// Skipped because the worker's request budget ran out.
  Deferred,
  /// Upstream or store failure, or the user's deadline passed.
  Errored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
  pub evaluated: usize,
  pub accepted:  usize,
  pub rejected:  usize,
  pub refreshed: usize,
  pub unchanged: usize,
  pub deleted:   usize,
  pub deferred:  usize,
  pub errored:   usize,
}

impl RunSummary {
  pub fn record(&mut self, outcome: UserOutcome) {
    self.evaluated += 1;
    let slot = match outcome {
      UserOutcome::Accepted => &mut self.accepted,
      UserOutcome::Rejected => &mut self.rejected,
      UserOutcome::Refreshed => &mut self.refreshed,
      UserOutcome::Unchanged => &mut self.unchanged,
      UserOutcome::Deleted => &mut self.deleted,
      UserOutcome::Deferred => &mut self.deferred,
      UserOutcome::Errored => &mut self.errored,
    };
    *slot += 1;
  }
}

impl AddAssign for RunSummary {
  fn add_assign(&mut self, rhs: Self) {
    self.evaluated += rhs.evaluated;
    self.accepted += rhs.accepted;
    self.rejected += rhs.rejected;
    self.refreshed += rhs.refreshed;
    self.unchanged += rhs.unchanged;
    self.deleted += rhs.deleted;
    self.deferred += rhs.deferred;
    self.errored += rhs.errored;
  }
}

impl fmt::Display for RunSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "evaluated={} accepted={} rejected={} refreshed={} unchanged={} deleted={} deferred={} errored={}",
      self.evaluated,
      self.accepted,
      self.rejected,
      self.refreshed,
      self.unchanged,
      self.deleted,
      self.deferred,
      self.errored,
    )
  }
}
