//! Integration tests for `SqliteStore` against an in-memory database.

use beck_core::{
  record::{ActivityRecord, StatusType, SubjectCategory, User},
  store::PersistentStore,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap() }

fn user(id: &str) -> User {
  User {
    id:               id.into(),
    display_name:     format!("viewer {id}"),
    avatar_url:       format!("https://lain.bgm.tv/pic/user/l/{id}.jpg"),
    last_active_time: t0(),
  }
}

fn record(user_id: &str, subject_id: &str, days_ago: i64, rating: u8) -> ActivityRecord {
  ActivityRecord {
    user_id:     user_id.into(),
    subject_id:  subject_id.into(),
    category:    SubjectCategory::Anime,
    status:      StatusType::Watched,
    recorded_at: t0() - Duration::days(days_ago),
    rating,
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_and_get_user() {
  let s = store().await;
  s.upsert_user(&user("1")).await.unwrap();

  let fetched = s.get_user("1").await.unwrap();
  assert_eq!(fetched, Some(user("1")));
}

#[tokio::test]
async fn get_user_missing_returns_none() {
  let s = store().await;
  assert!(s.get_user("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn upsert_user_overwrites_watermark_and_profile() {
  let s = store().await;
  s.upsert_user(&user("1")).await.unwrap();

  let mut updated = user("1");
  updated.display_name = "renamed".into();
  updated.last_active_time = t0() + Duration::days(3);
  s.upsert_user(&updated).await.unwrap();

  assert_eq!(s.get_user("1").await.unwrap(), Some(updated));
  assert_eq!(s.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn list_user_ids_pages_in_stable_order() {
  let s = store().await;
  for id in ["c", "a", "e", "b", "d"] {
    s.upsert_user(&user(id)).await.unwrap();
  }

  assert_eq!(s.count_users().await.unwrap(), 5);
  assert_eq!(s.list_user_ids(0, 2).await.unwrap(), ["a", "b"]);
  assert_eq!(s.list_user_ids(2, 2).await.unwrap(), ["c", "d"]);
  assert_eq!(s.list_user_ids(4, 2).await.unwrap(), ["e"]);
  assert!(s.list_user_ids(5, 2).await.unwrap().is_empty());
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn records_roundtrip_newest_first() {
  let s = store().await;
  s.upsert_user(&user("1")).await.unwrap();

  let records = vec![record("1", "10", 30, 7), record("1", "11", 1, 9), record("1", "12", 12, 5)];
  s.upsert_records(&records, 50).await.unwrap();

  let stored = s.records_for("1").await.unwrap();
  let subjects: Vec<_> = stored.iter().map(|r| r.subject_id.as_str()).collect();
  assert_eq!(subjects, ["11", "12", "10"]);
  assert_eq!(stored[0], records[1]);
}

#[tokio::test]
async fn same_key_twice_keeps_one_row_with_later_values() {
  let s = store().await;
  s.upsert_user(&user("1")).await.unwrap();

  s.upsert_records(&[record("1", "10", 30, 6)], 50).await.unwrap();

  let mut later = record("1", "10", 2, 9);
  later.status = StatusType::Discarded;
  s.upsert_records(&[later.clone()], 50).await.unwrap();

  let stored = s.records_for("1").await.unwrap();
  assert_eq!(stored, vec![later]);
}

#[tokio::test]
async fn duplicate_keys_inside_one_batch_collapse() {
  let s = store().await;
  s.upsert_user(&user("1")).await.unwrap();

  let batch = [record("1", "10", 5, 4), record("1", "10", 5, 8)];
  s.upsert_records(&batch, 50).await.unwrap();

  let stored = s.records_for("1").await.unwrap();
  assert_eq!(stored.len(), 1);
  assert_eq!(stored[0].rating, 8);
}

#[tokio::test]
async fn small_batches_store_everything() {
  let s = store().await;
  s.upsert_user(&user("1")).await.unwrap();

  let records: Vec<_> = (0..7).map(|i| record("1", &format!("{i}"), i, 7)).collect();
  s.upsert_records(&records, 3).await.unwrap();

  assert_eq!(s.records_for("1").await.unwrap().len(), 7);
}

#[tokio::test]
async fn zero_batch_size_is_treated_as_one() {
  let s = store().await;
  s.upsert_user(&user("1")).await.unwrap();

  s.upsert_records(&[record("1", "a", 1, 1), record("1", "b", 2, 2)], 0)
    .await
    .unwrap();

  assert_eq!(s.records_for("1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn records_without_user_are_refused() {
  let s = store().await;
  let err = s.upsert_records(&[record("ghost", "1", 1, 5)], 50).await;
  assert!(matches!(err, Err(crate::Error::Database(_))));
}

// ─── Deletion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_records_by_user_leaves_other_users() {
  let s = store().await;
  s.upsert_user(&user("1")).await.unwrap();
  s.upsert_user(&user("2")).await.unwrap();
  s.upsert_records(&[record("1", "10", 1, 7), record("2", "10", 1, 7)], 50)
    .await
    .unwrap();

  s.delete_records_by_user("1").await.unwrap();

  assert!(s.records_for("1").await.unwrap().is_empty());
  assert_eq!(s.records_for("2").await.unwrap().len(), 1);
  assert!(s.get_user("1").await.unwrap().is_some());
}

#[tokio::test]
async fn delete_user_cascades_to_records() {
  let s = store().await;
  s.upsert_user(&user("1")).await.unwrap();
  s.upsert_records(&[record("1", "10", 1, 7), record("1", "11", 2, 8)], 50)
    .await
    .unwrap();

  s.delete_user("1").await.unwrap();

  assert!(s.get_user("1").await.unwrap().is_none());
  assert!(s.records_for("1").await.unwrap().is_empty());
  assert_eq!(s.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn deleting_missing_user_is_a_no_op() {
  let s = store().await;
  s.delete_user("nobody").await.unwrap();
  s.delete_records_by_user("nobody").await.unwrap();
}
