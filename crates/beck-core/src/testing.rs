//! In-memory `ActivitySource` used by the evaluator and refresh tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};
use thiserror::Error;

use crate::{
  record::{
    ActivityRecord, SourcedRecord, StatusType, SubjectCategory, SubjectMetadata,
    UserProfile,
  },
  source::{ActivitySource, RecordPage},
};

pub fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() }

fn records(status: StatusType, ages_in_days: &[i64], rating: u8) -> Vec<SourcedRecord> {
  ages_in_days
    .iter()
    .enumerate()
    .map(|(i, age)| SourcedRecord {
      record:   ActivityRecord {
        user_id: String::new(),
        subject_id: format!("{status}-{i}"),
        category: SubjectCategory::Anime,
        status,
        recorded_at: now() - Duration::days(*age),
        rating,
      },
      metadata: SubjectMetadata {
        tags:            vec!["日本动画".into()],
        collector_count: 1_000,
      },
    })
    .collect()
}

/// Rated, popular `Watched` records at the given ages (newest first).
pub fn watched(ages_in_days: &[i64]) -> Vec<SourcedRecord> {
  records(StatusType::Watched, ages_in_days, 8)
}

/// Unrated `Watching` records at the given ages (newest first).
pub fn watching(ages_in_days: &[i64]) -> Vec<SourcedRecord> {
  records(StatusType::Watching, ages_in_days, 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Count     = 0,
  Timestamp = 1,
  Fetch     = 2,
  Profile   = 3,
}

#[derive(Debug, Error)]
pub enum FakeError {
  #[error("injected failure in {0:?}")]
  Injected(Method),
  #[error("no record at offset {0}")]
  OutOfRange(u64),
}

#[derive(Debug, Default)]
pub struct FakeSource {
  watched:  Vec<SourcedRecord>,
  watching: Vec<SourcedRecord>,
  total:    Option<u64>,
  failing:  Option<Method>,
  calls:    [AtomicUsize; 4],
}

impl FakeSource {
  pub fn new() -> Self { Self::default() }

  pub fn with_watched(mut self, records: Vec<SourcedRecord>) -> Self {
    self.watched = records;
    self
  }

  pub fn with_watching(mut self, records: Vec<SourcedRecord>) -> Self {
    self.watching = records;
    self
  }

  /// Report this many `Watched` records regardless of the stored list.
  pub fn with_total(mut self, total: u64) -> Self {
    self.total = Some(total);
    self
  }

  pub fn failing_on(mut self, method: Method) -> Self {
    self.failing = Some(method);
    self
  }

  pub fn calls(&self, method: Method) -> usize {
    self.calls[method as usize].load(Ordering::Relaxed)
  }

  pub fn total_calls(&self) -> usize {
    self.calls.iter().map(|c| c.load(Ordering::Relaxed)).sum()
  }

  fn enter(&self, method: Method) -> Result<(), FakeError> {
    self.calls[method as usize].fetch_add(1, Ordering::Relaxed);
    match self.failing {
      Some(m) if m == method => Err(FakeError::Injected(method)),
      _ => Ok(()),
    }
  }

  fn list(&self, status: StatusType) -> &[SourcedRecord] {
    match status {
      StatusType::Watched => &self.watched,
      StatusType::Watching => &self.watching,
      _ => &[],
    }
  }
}

impl ActivitySource for FakeSource {
  type Error = FakeError;

  async fn count_records(
    &self,
    _user_id: &str,
    status: StatusType,
    _category: SubjectCategory,
  ) -> Result<u64, FakeError> {
    self.enter(Method::Count)?;
    Ok(match (status, self.total) {
      (StatusType::Watched, Some(total)) => total,
      _ => self.list(status).len() as u64,
    })
  }

  async fn record_timestamp_at(
    &self,
    _user_id: &str,
    offset: u64,
    status: StatusType,
    _category: SubjectCategory,
  ) -> Result<DateTime<Utc>, FakeError> {
    self.enter(Method::Timestamp)?;
    self
      .list(status)
      .get(offset as usize)
      .map(|r| r.record.recorded_at)
      .ok_or(FakeError::OutOfRange(offset))
  }

  async fn fetch_records(
    &self,
    user_id: &str,
    status: StatusType,
    _category: SubjectCategory,
    offset: u64,
    limit: usize,
  ) -> Result<RecordPage, FakeError> {
    self.enter(Method::Fetch)?;
    let list = self.list(status);
    let start = (offset as usize).min(list.len());
    let end = (start + limit).min(list.len());
    let records: Vec<SourcedRecord> = list[start..end]
      .iter()
      .cloned()
      .map(|mut r| {
        r.record.user_id = user_id.to_owned();
        r
      })
      .collect();
    Ok(RecordPage { fetched: records.len(), records })
  }

  async fn fetch_user_profile(&self, user_id: &str) -> Result<UserProfile, FakeError> {
    self.enter(Method::Profile)?;
    Ok(UserProfile {
      display_name: format!("viewer {user_id}"),
      avatar_url:   format!("https://example.invalid/{user_id}.jpg"),
    })
  }
}
