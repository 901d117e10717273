//! The `PersistentStore` trait.
//!
//! Implemented by storage backends (e.g. `beck-store-sqlite`). The crawler
//! depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::record::{ActivityRecord, User};

/// Where qualifying users and their records live between runs.
///
/// Writes are upserts: users are keyed by id, records by
/// `(user_id, subject_id)`, and the later write wins.
///
/// All methods return `Send` futures so the store can be shared across
/// worker tasks.
pub trait PersistentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Retrieve a user by id. Returns `None` if not stored.
  fn get_user<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Insert the user or overwrite every field of the stored row.
  fn upsert_user<'a>(
    &'a self,
    user: &'a User,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove the user row together with all of its records, atomically.
  /// Does nothing if the user is not stored.
  fn delete_user<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn count_users(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// User ids in a stable order, for sharding across workers.
  fn list_user_ids(
    &self,
    offset: u64,
    limit: u64,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  // ── Records ───────────────────────────────────────────────────────────

  /// Upsert records in chunks of `batch_size`, one transaction per chunk.
  fn upsert_records<'a>(
    &'a self,
    records: &'a [ActivityRecord],
    batch_size: usize,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn delete_records_by_user<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
