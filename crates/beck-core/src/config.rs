//! Eligibility thresholds, consolidated in one place.
//!
//! Every constant the evaluator and refresh policy use lives in
//! [`VipConfig`]. Defaults reproduce the production values; deployments
//! override them through the crawler's config file.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, filter::RecordFilter};

/// One `(record-count threshold, required reporting interval)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityTier {
  /// Minimum total `Watched` count for this tier to apply.
  pub count_threshold: u64,
  /// Width of one activity bucket, in days.
  pub interval_days:   u32,
}

impl EligibilityTier {
  pub const fn new(count_threshold: u64, interval_days: u32) -> Self {
    Self { count_threshold, interval_days }
  }
}

/// Tags whose subjects are excluded from a user's record set by default.
pub const DEFAULT_REJECT_TAGS: &[&str] = &[
  "国产", "国产动画", "中国", "欧美", "美国", "童年", "短片", "PV", "民工", "MV",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VipConfig {
  /// Ascending by `count_threshold`. The first entry is the intake floor.
  pub tiers:                 Vec<EligibilityTier>,
  /// Empty buckets a user may accumulate inside the activity window.
  pub tolerance:             u32,
  /// The oldest record must be at least this old.
  pub min_loyalty_days:      i64,
  /// How far back the activity check looks.
  pub activity_window_days:  i64,
  /// `Watching` entries inside the window that rescue an irregular user.
  pub min_in_progress_count: usize,
  /// Filtered `Watched` records required at intake.
  pub min_filtered_count:    usize,
  /// Subjects with fewer collectors than this are ignored.
  pub popularity_floor:      u64,
  pub reject_tags:           Vec<String>,
  /// Counts above this are treated as spam accounts. Off when `None`.
  pub max_watched_count:     Option<u64>,
  /// Records requested per upstream page.
  pub page_size:             usize,
}

impl Default for VipConfig {
  fn default() -> Self {
    Self {
      tiers:                 vec![
        EligibilityTier::new(400, 10),
        EligibilityTier::new(800, 20),
        EligibilityTier::new(1200, 30),
      ],
      tolerance:             3,
      min_loyalty_days:      365,
      activity_window_days:  180,
      min_in_progress_count: 10,
      min_filtered_count:    300,
      popularity_floor:      100,
      reject_tags:           DEFAULT_REJECT_TAGS.iter().map(|t| (*t).to_owned()).collect(),
      max_watched_count:     None,
      page_size:             50,
    }
  }
}

impl VipConfig {
  /// Reject configurations the evaluator cannot run with.
  pub fn validate(&self) -> Result<()> {
    let first = self.tiers.first().ok_or(Error::NoTiers)?;
    if first.count_threshold == 0 {
      return Err(Error::ZeroThreshold);
    }
    if first.interval_days == 0 {
      return Err(Error::ZeroInterval(first.count_threshold));
    }
    for pair in self.tiers.windows(2) {
      let (prev, next) = (pair[0], pair[1]);
      if next.count_threshold <= prev.count_threshold {
        return Err(Error::UnorderedTiers {
          prev: prev.count_threshold,
          next: next.count_threshold,
        });
      }
      if next.interval_days == 0 {
        return Err(Error::ZeroInterval(next.count_threshold));
      }
    }
    if self.page_size == 0 {
      return Err(Error::ZeroPageSize);
    }
    Ok(())
  }

  /// The count a new user needs before anything else is fetched.
  pub fn intake_floor(&self) -> u64 {
    self.tiers.first().map_or(0, |t| t.count_threshold)
  }

  /// The highest tier whose threshold does not exceed `total`. Users below
  /// every threshold (only possible on refresh) get the strictest tier.
  pub fn tier_for(&self, total: u64) -> EligibilityTier {
    self
      .tiers
      .iter()
      .rev()
      .find(|t| t.count_threshold <= total)
      .or_else(|| self.tiers.first())
      .copied()
      .unwrap_or(EligibilityTier::new(0, 1))
  }

  pub fn record_filter(&self) -> RecordFilter {
    RecordFilter::new(self.reject_tags.iter().cloned(), self.popularity_floor)
  }
}
