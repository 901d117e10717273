//! [`SqliteStore`], the SQLite implementation of [`PersistentStore`].

use std::path::Path;

use beck_core::{
  record::{ActivityRecord, User},
  store::PersistentStore,
};
use rusqlite::OptionalExtension as _;
use tracing::debug;

use crate::{
  Result,
  encode::{RawUser, RecordRow, encode_dt},
  schema::SCHEMA,
};

const UPSERT_RECORD: &str = "
  INSERT INTO activity_records (user_id, subject_id, category, status, recorded_at, rating)
  VALUES (?1, ?2, ?3, ?4, ?5, ?6)
  ON CONFLICT (user_id, subject_id) DO UPDATE SET
    category    = excluded.category,
    status      = excluded.status,
    recorded_at = excluded.recorded_at,
    rating      = excluded.rating";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A beck store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// All stored records for a user, newest first.
  pub async fn records_for(&self, user_id: &str) -> Result<Vec<ActivityRecord>> {
    let user_id = user_id.to_owned();

    let rows: Vec<RecordRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id, subject_id, category, status, recorded_at, rating
           FROM activity_records
           WHERE user_id = ?1
           ORDER BY recorded_at DESC, subject_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_id], |row| {
            Ok(RecordRow {
              user_id:     row.get(0)?,
              subject_id:  row.get(1)?,
              category:    row.get(2)?,
              status:      row.get(3)?,
              recorded_at: row.get(4)?,
              rating:      row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows.into_iter().map(RecordRow::into_record).collect()
  }
}

// ─── PersistentStore impl ────────────────────────────────────────────────────

impl PersistentStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn get_user(&self, id: &str) -> Result<Option<User>> {
    let id = id.to_owned();

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, display_name, avatar_url, last_active_time FROM users WHERE id = ?1",
            rusqlite::params![id],
            |row| {
              Ok(RawUser {
                id:               row.get(0)?,
                display_name:     row.get(1)?,
                avatar_url:       row.get(2)?,
                last_active_time: row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn upsert_user(&self, user: &User) -> Result<()> {
    let id           = user.id.clone();
    let display_name = user.display_name.clone();
    let avatar_url   = user.avatar_url.clone();
    let last_active  = encode_dt(user.last_active_time);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (id, display_name, avatar_url, last_active_time)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (id) DO UPDATE SET
             display_name     = excluded.display_name,
             avatar_url       = excluded.avatar_url,
             last_active_time = excluded.last_active_time",
          rusqlite::params![id, display_name, avatar_url, last_active],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_user(&self, id: &str) -> Result<()> {
    let id = id.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![id])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn count_users(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
      .await?;
    Ok(count.max(0) as u64)
  }

  async fn list_user_ids(&self, offset: u64, limit: u64) -> Result<Vec<String>> {
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);
    let limit  = i64::try_from(limit).unwrap_or(i64::MAX);

    let ids = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare("SELECT id FROM users ORDER BY id LIMIT ?1 OFFSET ?2")?;
        let ids = stmt
          .query_map(rusqlite::params![limit, offset], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
      })
      .await?;
    Ok(ids)
  }

  // ── Records ───────────────────────────────────────────────────────────────

  async fn upsert_records(&self, records: &[ActivityRecord], batch_size: usize) -> Result<()> {
    let rows: Vec<RecordRow> = records.iter().map(RecordRow::encode).collect();

    for chunk in rows.chunks(batch_size.max(1)) {
      let chunk = chunk.to_vec();
      let len = chunk.len();
      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          {
            let mut stmt = tx.prepare_cached(UPSERT_RECORD)?;
            for row in &chunk {
              stmt.execute(rusqlite::params![
                row.user_id,
                row.subject_id,
                row.category,
                row.status,
                row.recorded_at,
                row.rating,
              ])?;
            }
          }
          tx.commit()?;
          Ok(())
        })
        .await?;
      debug!(records = len, "upserted record batch");
    }
    Ok(())
  }

  async fn delete_records_by_user(&self, id: &str) -> Result<()> {
    let id = id.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM activity_records WHERE user_id = ?1", rusqlite::params![id])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
