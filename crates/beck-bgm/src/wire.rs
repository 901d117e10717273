//! Response bodies of the Bangumi v0 endpoints and their conversion into
//! beck's record types.

use beck_core::{
  record::{
    ActivityRecord, SourcedRecord, StatusType, SubjectCategory, SubjectMetadata,
    UserProfile,
  },
  source::RecordPage,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::{Error, Result};

const OFFSET_EXCEEDED: &str = "offset should be less than or equal to";

// ─── Collections ─────────────────────────────────────────────────────────────

/// `GET /v0/users/{id}/collections`
///
/// Entries stay raw until conversion so one malformed entry cannot fail the
/// whole page.
#[derive(Debug, Deserialize)]
pub struct CollectionPage {
  #[serde(default)]
  pub data:  Vec<serde_json::Value>,
  #[serde(default)]
  pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct CollectionItem {
  pub subject_id: u64,
  pub updated_at: String,
  #[serde(default)]
  pub rate:       u8,
  #[serde(default)]
  pub subject:    Option<SlimSubject>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SlimSubject {
  #[serde(default)]
  pub tags:             Vec<Tag>,
  #[serde(default)]
  pub collection_total: u64,
}

#[derive(Debug, Deserialize)]
pub struct Tag {
  pub name: String,
}

impl CollectionItem {
  pub fn parse(value: serde_json::Value) -> Result<Self> {
    serde_json::from_value(value).map_err(Error::MalformedItem)
  }

  pub fn recorded_at(&self) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&self.updated_at)
      .map(|dt| dt.with_timezone(&Utc))
      .map_err(|source| Error::DataParse { value: self.updated_at.clone(), source })
  }

  fn into_sourced(
    self,
    user_id: &str,
    status: StatusType,
    category: SubjectCategory,
  ) -> Result<SourcedRecord> {
    let recorded_at = self.recorded_at()?;
    let subject = self.subject.unwrap_or_default();
    Ok(SourcedRecord {
      record:   ActivityRecord {
        user_id: user_id.to_owned(),
        subject_id: self.subject_id.to_string(),
        category,
        status,
        recorded_at,
        rating: self.rate,
      },
      metadata: SubjectMetadata {
        tags:            subject.tags.into_iter().map(|t| t.name).collect(),
        collector_count: subject.collection_total,
      },
    })
  }
}

impl CollectionPage {
  /// The first entry, for single-record lookups.
  pub fn into_first(self) -> Option<Result<CollectionItem>> {
    self.data.into_iter().next().map(CollectionItem::parse)
  }

  /// Convert every entry, skipping (but still counting) entries with a
  /// missing field or a timestamp that does not parse.
  pub fn into_record_page(
    self,
    user_id: &str,
    status: StatusType,
    category: SubjectCategory,
  ) -> RecordPage {
    let fetched = self.data.len();
    let records = self
      .data
      .into_iter()
      .filter_map(|value| {
        let subject_id = value.get("subject_id").and_then(serde_json::Value::as_u64);
        let converted = CollectionItem::parse(value)
          .and_then(|item| item.into_sourced(user_id, status, category));
        match converted {
          Ok(record) => Some(record),
          Err(e) => {
            warn!(user_id, ?subject_id, error = %e, "skipping malformed record");
            None
          }
        }
      })
      .collect();
    RecordPage { records, fetched }
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
  #[serde(default)]
  pub description: String,
}

impl ErrorBody {
  /// `Some(max)` when the body reports an offset past the end of a listing.
  /// The inner value is the upstream maximum when it could be read.
  pub fn offset_exceeded(&self) -> Option<Option<u64>> {
    let (_, rest) = self.description.split_once(OFFSET_EXCEEDED)?;
    let digits: String = rest
      .trim_start()
      .chars()
      .take_while(char::is_ascii_digit)
      .collect();
    Some(digits.parse().ok())
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// `GET /v0/users/{id}`
#[derive(Debug, Deserialize)]
pub struct UserBody {
  #[serde(default)]
  pub nickname: String,
  #[serde(default)]
  pub avatar:   Avatar,
}

#[derive(Debug, Default, Deserialize)]
pub struct Avatar {
  #[serde(default)]
  pub large: String,
}

impl From<UserBody> for UserProfile {
  fn from(body: UserBody) -> Self {
    Self { display_name: body.nickname, avatar_url: body.avatar.large }
  }
}
