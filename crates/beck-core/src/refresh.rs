//! Incremental refresh of users already in the store.
//!
//! A stored user cleared the count, loyalty and history bars at intake, so a
//! refresh only re-runs the tiered activity check and then fetches records
//! newer than the user's watermark, re-reading the profile of users that
//! have something new. Each policy owns a metered source; once
//! its request budget is spent, remaining users are deferred to the next
//! scheduled run.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
  config::VipConfig,
  evaluator::probe_activity,
  filter::RecordFilter,
  record::{ActivityRecord, StatusType, SubjectCategory, User},
  source::{ActivitySource, Listing, Metered, collect},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
  /// New activity since the watermark. `user` carries the advanced
  /// watermark and the current profile; `records` holds the filtered delta (possibly empty when
  /// every new record was filtered out).
  Updated { user: User, records: Vec<ActivityRecord> },
  /// Still active, but nothing was recorded after the watermark.
  StillInactive,
  /// Inactive by both signals; the caller removes the user and its records.
  Deleted,
  /// The request budget is spent; the user was not examined.
  Deferred,
}

pub struct RefreshPolicy<S> {
  source: Metered<S>,
  config: VipConfig,
  filter: RecordFilter,
  budget: Option<u64>,
}

impl<S: ActivitySource> RefreshPolicy<S> {
  pub fn new(source: S, config: VipConfig) -> Self {
    let filter = config.record_filter();
    Self { source: Metered::new(source), config, filter, budget: None }
  }

  /// Stop examining users once this many upstream requests have been made.
  pub fn with_budget(mut self, budget: Option<u64>) -> Self {
    self.budget = budget;
    self
  }

  pub fn source(&self) -> &Metered<S> { &self.source }

  pub fn requests_made(&self) -> u64 { self.source.requests() }

  pub fn is_exhausted(&self) -> bool {
    self.budget.is_some_and(|b| self.source.requests() >= b)
  }

  pub async fn refresh(&self, user: &User) -> Result<RefreshOutcome, S::Error> {
    self.refresh_at(user, Utc::now()).await
  }

  /// [`refresh`](Self::refresh) against a fixed clock.
  pub async fn refresh_at(
    &self,
    user: &User,
    now: DateTime<Utc>,
  ) -> Result<RefreshOutcome, S::Error> {
    if self.is_exhausted() {
      debug!(user_id = %user.id, requests = self.requests_made(), "refresh deferred");
      return Ok(RefreshOutcome::Deferred);
    }

    let total = self
      .source
      .count_records(&user.id, StatusType::Watched, SubjectCategory::Anime)
      .await?;
    let activity =
      probe_activity(&self.source, &self.config, &self.filter, &user.id, total, now).await?;
    if !activity.is_active() {
      info!(user_id = %user.id, total, ?activity, "user no longer active");
      return Ok(RefreshOutcome::Deleted);
    }

    let delta = collect(&self.source, &user.id, Listing {
      status:    StatusType::Watched,
      category:  SubjectCategory::Anime,
      after:     Some(user.last_active_time),
      filter:    Some(&self.filter),
      page_size: self.config.page_size,
    })
    .await?;

    let Some(newest) = delta.newest else {
      debug!(user_id = %user.id, "no records since watermark");
      return Ok(RefreshOutcome::StillInactive);
    };

    let profile = self.source.fetch_user_profile(&user.id).await?;

    info!(
      user_id = %user.id,
      records = delta.records.len(),
      watermark = %newest,
      "user refreshed"
    );
    Ok(RefreshOutcome::Updated {
      user:    User::from_profile(user.id.clone(), profile, newest),
      records: delta.records,
    })
  }
}
