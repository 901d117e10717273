//! Tiered eligibility evaluation for users seen for the first time.
//!
//! Checks run cheapest first and stop at the first failure:
//!
//! 1. total `Watched` count against the lowest tier threshold,
//! 2. age of the oldest record against the loyalty window,
//! 3. + 4. tiered activity check over the recent window, with the
//!    `Watching` count as a fallback signal,
//! 5. size of the full filtered history.
//!
//! Source errors never escape [`EligibilityEvaluator::evaluate`]; they turn
//! into [`Rejection::FetchFailed`] so one bad user cannot stop a batch.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::{
  activity::is_regularly_active,
  config::VipConfig,
  filter::RecordFilter,
  record::{ActivityRecord, StatusType, SubjectCategory},
  source::{ActivitySource, Listing, collect},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Why a user did not qualify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
  TooFewRecords { total: u64, required: u64 },
  /// More records than any person plausibly logs.
  ImplausibleHistory { total: u64, max: u64 },
  TooRecent { oldest_age_days: i64, required: i64 },
  Inactive { interval_days: u32, in_progress: usize },
  TooFewFiltered { filtered: usize, required: usize },
  FetchFailed(String),
}

impl Rejection {
  /// `true` for rejections caused by an upstream failure rather than by the
  /// user's history.
  pub fn is_error(&self) -> bool { matches!(self, Self::FetchFailed(_)) }
}

impl fmt::Display for Rejection {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::TooFewRecords { total, required } => {
        write!(f, "{total} watched records, {required} required")
      }
      Self::ImplausibleHistory { total, max } => {
        write!(f, "{total} watched records exceeds plausible maximum {max}")
      }
      Self::TooRecent { oldest_age_days, required } => {
        write!(f, "oldest record is {oldest_age_days} days old, {required} required")
      }
      Self::Inactive { interval_days, in_progress } => write!(
        f,
        "irregular at {interval_days}-day interval with {in_progress} in-progress records"
      ),
      Self::TooFewFiltered { filtered, required } => {
        write!(f, "{filtered} filtered records, {required} required")
      }
      Self::FetchFailed(cause) => write!(f, "fetch failed: {cause}"),
    }
  }
}

/// The result of evaluating one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
  Accepted {
    /// The full filtered `Watched` history, newest first.
    records:     Vec<ActivityRecord>,
    /// Newest record timestamp; becomes the user's watermark.
    last_active: DateTime<Utc>,
  },
  Rejected(Rejection),
}

impl Verdict {
  pub fn is_accepted(&self) -> bool { matches!(self, Self::Accepted { .. }) }

  /// `(accepted, qualifying records)`.
  pub fn into_parts(self) -> (bool, Vec<ActivityRecord>) {
    match self {
      Self::Accepted { records, .. } => (true, records),
      Self::Rejected(_) => (false, Vec::new()),
    }
  }
}

// ─── Activity probe ──────────────────────────────────────────────────────────

/// Result of the tiered activity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
  /// The recent `Watched` stream is regular for the user's tier.
  Regular,
  /// Irregular, but enough `Watching` entries in the window.
  InProgress(usize),
  Inactive { interval_days: u32, in_progress: usize },
}

impl Activity {
  pub fn is_active(self) -> bool { !matches!(self, Self::Inactive { .. }) }
}

/// The tier-governed activity check shared by intake and refresh.
///
/// An empty recent window counts as irregular: the classifier passes empty
/// input vacuously, so absence has to be caught here.
pub async fn probe_activity<S: ActivitySource>(
  source: &S,
  config: &VipConfig,
  filter: &RecordFilter,
  user_id: &str,
  total: u64,
  now: DateTime<Utc>,
) -> Result<Activity, S::Error> {
  let tier = config.tier_for(total);
  let window_start = now - Duration::days(config.activity_window_days);

  let recent = collect(source, user_id, Listing {
    status:    StatusType::Watched,
    category:  SubjectCategory::Anime,
    after:     Some(window_start),
    filter:    Some(filter),
    page_size: config.page_size,
  })
  .await?;

  let regular = !recent.records.is_empty()
    && is_regularly_active(
      recent.records.iter().map(|r| r.recorded_at),
      tier.interval_days,
      config.tolerance,
      now,
    );
  debug!(
    user_id,
    total,
    interval_days = tier.interval_days,
    recent = recent.records.len(),
    regular,
    "activity check"
  );
  if regular {
    return Ok(Activity::Regular);
  }

  let in_progress = collect(source, user_id, Listing {
    status:    StatusType::Watching,
    category:  SubjectCategory::Anime,
    after:     Some(window_start),
    filter:    None,
    page_size: config.page_size,
  })
  .await?
  .records
  .len();

  if in_progress >= config.min_in_progress_count {
    Ok(Activity::InProgress(in_progress))
  } else {
    Ok(Activity::Inactive { interval_days: tier.interval_days, in_progress })
  }
}

// ─── Evaluator ───────────────────────────────────────────────────────────────

/// Decides whether a new user is a VIP worth persisting.
pub struct EligibilityEvaluator<S> {
  source: S,
  config: VipConfig,
  filter: RecordFilter,
}

impl<S: ActivitySource> EligibilityEvaluator<S> {
  pub fn new(source: S, config: VipConfig) -> Self {
    let filter = config.record_filter();
    Self { source, config, filter }
  }

  pub fn source(&self) -> &S { &self.source }

  pub fn config(&self) -> &VipConfig { &self.config }

  pub async fn evaluate(&self, user_id: &str) -> Verdict {
    self.evaluate_at(user_id, Utc::now()).await
  }

  /// [`evaluate`](Self::evaluate) against a fixed clock.
  pub async fn evaluate_at(&self, user_id: &str, now: DateTime<Utc>) -> Verdict {
    let verdict = match self.run(user_id, now).await {
      Ok(verdict) => verdict,
      Err(e) => {
        warn!(user_id, error = %e, "evaluation aborted");
        Verdict::Rejected(Rejection::FetchFailed(e.to_string()))
      }
    };
    match &verdict {
      Verdict::Accepted { records, .. } => {
        info!(user_id, records = records.len(), "user accepted")
      }
      Verdict::Rejected(reason) => info!(user_id, %reason, "user rejected"),
    }
    verdict
  }

  async fn run(&self, user_id: &str, now: DateTime<Utc>) -> Result<Verdict, S::Error> {
    let cfg = &self.config;
    let source = &self.source;

    // 1. raw count
    let total = source
      .count_records(user_id, StatusType::Watched, SubjectCategory::Anime)
      .await?;
    let floor = cfg.intake_floor();
    if total < floor {
      return Ok(Verdict::Rejected(Rejection::TooFewRecords { total, required: floor }));
    }
    if let Some(max) = cfg.max_watched_count
      && total > max
    {
      return Ok(Verdict::Rejected(Rejection::ImplausibleHistory { total, max }));
    }
    let Some(last_offset) = total.checked_sub(1) else {
      return Ok(Verdict::Rejected(Rejection::TooFewRecords { total, required: floor.max(1) }));
    };

    // 2. loyalty
    let oldest = source
      .record_timestamp_at(user_id, last_offset, StatusType::Watched, SubjectCategory::Anime)
      .await?;
    let oldest_age_days = (now - oldest).num_days();
    if oldest_age_days < cfg.min_loyalty_days {
      return Ok(Verdict::Rejected(Rejection::TooRecent {
        oldest_age_days,
        required: cfg.min_loyalty_days,
      }));
    }

    // 3. + 4. tiered activity
    if let Activity::Inactive { interval_days, in_progress } =
      probe_activity(source, cfg, &self.filter, user_id, total, now).await?
    {
      return Ok(Verdict::Rejected(Rejection::Inactive { interval_days, in_progress }));
    }

    // 5. filtered history
    let history = collect(source, user_id, Listing {
      status:    StatusType::Watched,
      category:  SubjectCategory::Anime,
      after:     None,
      filter:    Some(&self.filter),
      page_size: cfg.page_size,
    })
    .await?;
    if history.records.len() < cfg.min_filtered_count {
      return Ok(Verdict::Rejected(Rejection::TooFewFiltered {
        filtered: history.records.len(),
        required: cfg.min_filtered_count,
      }));
    }

    let last_active = match history.newest {
      Some(at) => at,
      None => {
        source
          .record_timestamp_at(user_id, 0, StatusType::Watched, SubjectCategory::Anime)
          .await?
      }
    };

    Ok(Verdict::Accepted { records: history.records, last_active })
  }
}
