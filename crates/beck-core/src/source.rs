//! The `ActivitySource` trait and the paging loop built on it.
//!
//! The trait is implemented by upstream adapters (e.g. `beck-bgm`). The
//! evaluator and refresh policy only ever talk to this abstraction.

use std::{
  future::Future,
  sync::atomic::{AtomicU64, Ordering},
};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
  filter::RecordFilter,
  record::{ActivityRecord, SourcedRecord, StatusType, SubjectCategory, UserProfile},
};

// ─── Pages ───────────────────────────────────────────────────────────────────

/// One page of records, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPage {
  /// Records that parsed cleanly.
  pub records: Vec<SourcedRecord>,
  /// Entries the upstream returned, including any that failed to parse.
  /// Paging stops when this falls below the requested limit.
  pub fetched: usize,
}

impl RecordPage {
  pub fn empty() -> Self { Self::default() }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Read access to a user's upstream activity history.
///
/// Pagination contract: results are ordered newest first, with no gaps or
/// duplicates across page boundaries.
pub trait ActivitySource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Total number of records with the given status and category.
  fn count_records<'a>(
    &'a self,
    user_id: &'a str,
    status: StatusType,
    category: SubjectCategory,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Timestamp of the record at `offset` (0 is the newest).
  fn record_timestamp_at<'a>(
    &'a self,
    user_id: &'a str,
    offset: u64,
    status: StatusType,
    category: SubjectCategory,
  ) -> impl Future<Output = Result<DateTime<Utc>, Self::Error>> + Send + 'a;

  /// One page of records. An offset past the end yields an empty page.
  fn fetch_records<'a>(
    &'a self,
    user_id: &'a str,
    status: StatusType,
    category: SubjectCategory,
    offset: u64,
    limit: usize,
  ) -> impl Future<Output = Result<RecordPage, Self::Error>> + Send + 'a;

  fn fetch_user_profile<'a>(
    &'a self,
    user_id: &'a str,
  ) -> impl Future<Output = Result<UserProfile, Self::Error>> + Send + 'a;
}

// ─── Metering ────────────────────────────────────────────────────────────────

/// Counts the calls made through it. Each worker owns its own instance, so
/// the counter is never contended.
#[derive(Debug, Default)]
pub struct Metered<S> {
  inner:    S,
  requests: AtomicU64,
}

impl<S> Metered<S> {
  pub fn new(inner: S) -> Self { Self { inner, requests: AtomicU64::new(0) } }

  pub fn requests(&self) -> u64 { self.requests.load(Ordering::Relaxed) }

  pub fn inner(&self) -> &S { &self.inner }

  fn tick(&self) { self.requests.fetch_add(1, Ordering::Relaxed); }
}

impl<S: ActivitySource> ActivitySource for Metered<S> {
  type Error = S::Error;

  async fn count_records(
    &self,
    user_id: &str,
    status: StatusType,
    category: SubjectCategory,
  ) -> Result<u64, S::Error> {
    self.tick();
    self.inner.count_records(user_id, status, category).await
  }

  async fn record_timestamp_at(
    &self,
    user_id: &str,
    offset: u64,
    status: StatusType,
    category: SubjectCategory,
  ) -> Result<DateTime<Utc>, S::Error> {
    self.tick();
    self.inner.record_timestamp_at(user_id, offset, status, category).await
  }

  async fn fetch_records(
    &self,
    user_id: &str,
    status: StatusType,
    category: SubjectCategory,
    offset: u64,
    limit: usize,
  ) -> Result<RecordPage, S::Error> {
    self.tick();
    self.inner.fetch_records(user_id, status, category, offset, limit).await
  }

  async fn fetch_user_profile(&self, user_id: &str) -> Result<UserProfile, S::Error> {
    self.tick();
    self.inner.fetch_user_profile(user_id).await
  }
}

// ─── Paging ──────────────────────────────────────────────────────────────────

/// What to pull out of a paged listing.
#[derive(Debug, Clone, Copy)]
pub struct Listing<'a> {
  pub status:    StatusType,
  pub category:  SubjectCategory,
  /// Only records strictly newer than this; `None` walks the whole history.
  pub after:     Option<DateTime<Utc>>,
  pub filter:    Option<&'a RecordFilter>,
  pub page_size: usize,
}

/// Records gathered by [`collect`].
#[derive(Debug, Clone, Default)]
pub struct Collected {
  /// Records that passed the filter, newest first.
  pub records: Vec<ActivityRecord>,
  /// Newest timestamp seen inside the window, filtered or not.
  pub newest:  Option<DateTime<Utc>>,
  /// Pages requested.
  pub pages:   usize,
}

/// Walk the listing page by page, stopping at the first record outside the
/// window or at a short page. The filter runs before anything is retained.
pub async fn collect<S: ActivitySource>(
  source: &S,
  user_id: &str,
  listing: Listing<'_>,
) -> Result<Collected, S::Error> {
  let page_size = listing.page_size.max(1);
  let mut out = Collected::default();
  let mut offset = 0_u64;

  loop {
    let page = source
      .fetch_records(user_id, listing.status, listing.category, offset, page_size)
      .await?;
    out.pages += 1;
    debug!(
      user_id,
      status = %listing.status,
      offset,
      fetched = page.fetched,
      parsed = page.records.len(),
      "fetched record page"
    );

    let mut left_window = false;
    for SourcedRecord { record, metadata } in page.records {
      if listing.after.is_some_and(|after| record.recorded_at <= after) {
        left_window = true;
        break;
      }
      out.newest = Some(match out.newest {
        Some(prev) => prev.max(record.recorded_at),
        None => record.recorded_at,
      });
      if listing.filter.is_none_or(|f| f.accept(record.rating, &metadata)) {
        out.records.push(record);
      }
    }

    if left_window || page.fetched < page_size {
      break;
    }
    offset += page_size as u64;
  }

  Ok(out)
}
