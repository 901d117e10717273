//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with nanosecond precision.
//! Status and category are stored as the upstream numeric codes so rows stay
//! comparable with raw API data.

use beck_core::record::{ActivityRecord, StatusType, SubjectCategory, User};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Fixed-width so that text order matches time order.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Codes ───────────────────────────────────────────────────────────────────

fn decode_code(column: &'static str, value: i64) -> Result<u8> {
  u8::try_from(value).map_err(|_| Error::OutOfRange { column, value })
}

pub fn decode_status(value: i64) -> Result<StatusType> {
  Ok(StatusType::from_code(decode_code("status", value)?)?)
}

pub fn decode_category(value: i64) -> Result<SubjectCategory> {
  Ok(SubjectCategory::from_code(decode_code("category", value)?)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column values for one `activity_records` row, owned so they can cross
/// into the database thread.
#[derive(Debug, Clone)]
pub struct RecordRow {
  pub user_id:     String,
  pub subject_id:  String,
  pub category:    i64,
  pub status:      i64,
  pub recorded_at: String,
  pub rating:      i64,
}

impl RecordRow {
  pub fn encode(record: &ActivityRecord) -> Self {
    Self {
      user_id:     record.user_id.clone(),
      subject_id:  record.subject_id.clone(),
      category:    i64::from(record.category.code()),
      status:      i64::from(record.status.code()),
      recorded_at: encode_dt(record.recorded_at),
      rating:      i64::from(record.rating),
    }
  }

  pub fn into_record(self) -> Result<ActivityRecord> {
    Ok(ActivityRecord {
      user_id:     self.user_id,
      subject_id:  self.subject_id,
      category:    decode_category(self.category)?,
      status:      decode_status(self.status)?,
      recorded_at: decode_dt(&self.recorded_at)?,
      rating:      decode_code("rating", self.rating)?,
    })
  }
}

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub id:               String,
  pub display_name:     String,
  pub avatar_url:       String,
  pub last_active_time: String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:               self.id,
      display_name:     self.display_name,
      avatar_url:       self.avatar_url,
      last_active_time: decode_dt(&self.last_active_time)?,
    })
  }
}
