//! In-memory `ActivitySource` and a slow store for the worker-pool tests.

use std::{
  collections::HashMap,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};

use beck_core::{
  record::{
    ActivityRecord, SourcedRecord, StatusType, SubjectCategory, SubjectMetadata, User,
    UserProfile,
  },
  source::{ActivitySource, RecordPage},
  store::PersistentStore,
};
use beck_store_sqlite::SqliteStore;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// One record every 5 days for the last half year, then older history
/// reaching back about 600 days. Qualifies under the default config.
pub fn busy_history() -> Vec<i64> { (0..36).map(|i| i * 5).chain(200..600).collect() }

/// Nothing in the last 200 days.
pub fn silent_history() -> Vec<i64> { (200..700).collect() }

pub fn record_for(user_id: &str, subject_id: &str, age_days: i64) -> ActivityRecord {
  ActivityRecord {
    user_id:     user_id.into(),
    subject_id:  subject_id.into(),
    category:    SubjectCategory::Anime,
    status:      StatusType::Watched,
    recorded_at: Utc::now() - chrono::Duration::days(age_days),
    rating:      8,
  }
}

#[derive(Debug, Error)]
pub enum StubError {
  #[error("user {0} not found")]
  UnknownUser(String),
  #[error("no record at offset {0}")]
  OutOfRange(u64),
}

/// `Watched` histories keyed by user id; `Watching` lists are always empty.
#[derive(Debug, Clone)]
pub struct StubSource {
  users:    Arc<HashMap<String, Vec<SourcedRecord>>>,
  stall:    Option<Duration>,
  requests: Arc<AtomicUsize>,
}

impl StubSource {
  pub fn new<'a>(users: impl IntoIterator<Item = (&'a str, Vec<i64>)>) -> Self {
    let anchor = Utc::now();
    let users = users
      .into_iter()
      .map(|(id, ages)| {
        let records = ages
          .iter()
          .enumerate()
          .map(|(i, age)| SourcedRecord {
            record:   ActivityRecord {
              recorded_at: anchor - chrono::Duration::days(*age),
              ..record_for(id, &i.to_string(), 0)
            },
            metadata: SubjectMetadata {
              tags:            vec!["日本动画".into()],
              collector_count: 1_000,
            },
          })
          .collect();
        (id.to_owned(), records)
      })
      .collect();
    Self { users: Arc::new(users), stall: None, requests: Arc::default() }
  }

  /// Delay every count request by `by`.
  pub fn stalling(mut self, by: Duration) -> Self {
    self.stall = Some(by);
    self
  }

  /// Requests served across every clone.
  pub fn requests(&self) -> usize { self.requests.load(Ordering::Relaxed) }

  fn list(&self, user_id: &str, status: StatusType) -> Result<&[SourcedRecord], StubError> {
    self.requests.fetch_add(1, Ordering::Relaxed);
    let records = self
      .users
      .get(user_id)
      .ok_or_else(|| StubError::UnknownUser(user_id.to_owned()))?;
    Ok(match status {
      StatusType::Watched => records.as_slice(),
      _ => &[],
    })
  }
}

impl ActivitySource for StubSource {
  type Error = StubError;

  async fn count_records(
    &self,
    user_id: &str,
    status: StatusType,
    _category: SubjectCategory,
  ) -> Result<u64, StubError> {
    if let Some(by) = self.stall {
      tokio::time::sleep(by).await;
    }
    Ok(self.list(user_id, status)?.len() as u64)
  }

  async fn record_timestamp_at(
    &self,
    user_id: &str,
    offset: u64,
    status: StatusType,
    _category: SubjectCategory,
  ) -> Result<DateTime<Utc>, StubError> {
    self
      .list(user_id, status)?
      .get(offset as usize)
      .map(|r| r.record.recorded_at)
      .ok_or(StubError::OutOfRange(offset))
  }

  async fn fetch_records(
    &self,
    user_id: &str,
    status: StatusType,
    _category: SubjectCategory,
    offset: u64,
    limit: usize,
  ) -> Result<RecordPage, StubError> {
    let list = self.list(user_id, status)?;
    let start = (offset as usize).min(list.len());
    let end = (start + limit).min(list.len());
    let records = list[start..end].to_vec();
    Ok(RecordPage { fetched: records.len(), records })
  }

  async fn fetch_user_profile(&self, user_id: &str) -> Result<UserProfile, StubError> {
    self.list(user_id, StatusType::Watched)?;
    Ok(UserProfile {
      display_name: format!("viewer {user_id}"),
      avatar_url:   format!("https://lain.bgm.tv/pic/user/l/{user_id}.jpg"),
    })
  }
}

/// A [`SqliteStore`] whose record writes take `delay` before they start.
#[derive(Clone)]
pub struct SlowWrites {
  inner: SqliteStore,
  delay: Duration,
}

impl SlowWrites {
  pub fn new(inner: SqliteStore, delay: Duration) -> Self { Self { inner, delay } }
}

impl PersistentStore for SlowWrites {
  type Error = beck_store_sqlite::Error;

  async fn get_user(&self, id: &str) -> Result<Option<User>, Self::Error> {
    self.inner.get_user(id).await
  }

  async fn upsert_user(&self, user: &User) -> Result<(), Self::Error> {
    self.inner.upsert_user(user).await
  }

  async fn delete_user(&self, id: &str) -> Result<(), Self::Error> {
    self.inner.delete_user(id).await
  }

  async fn count_users(&self) -> Result<u64, Self::Error> { self.inner.count_users().await }

  async fn list_user_ids(&self, offset: u64, limit: u64) -> Result<Vec<String>, Self::Error> {
    self.inner.list_user_ids(offset, limit).await
  }

  async fn upsert_records(
    &self,
    records: &[ActivityRecord],
    batch_size: usize,
  ) -> Result<(), Self::Error> {
    tokio::time::sleep(self.delay).await;
    self.inner.upsert_records(records, batch_size).await
  }

  async fn delete_records_by_user(&self, id: &str) -> Result<(), Self::Error> {
    self.inner.delete_records_by_user(id).await
  }
}
