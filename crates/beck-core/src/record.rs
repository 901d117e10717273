//! Activity records and users: the data the crawler fetches and persists.
//!
//! An [`ActivityRecord`] is one user's status entry for one catalog subject.
//! Records are keyed by `(user_id, subject_id)`; a later write for the same
//! key replaces the earlier one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

// ─── Enumerations ────────────────────────────────────────────────────────────

/// The kind of catalog subject a record refers to. Discriminants match the
/// upstream API's numeric codes.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubjectCategory {
  Book  = 1,
  Anime = 2,
  Music = 3,
  Game  = 4,
  Real  = 6,
}

impl SubjectCategory {
  pub fn code(self) -> u8 { self as u8 }

  pub fn from_code(code: u8) -> Result<Self> {
    match code {
      1 => Ok(Self::Book),
      2 => Ok(Self::Anime),
      3 => Ok(Self::Music),
      4 => Ok(Self::Game),
      6 => Ok(Self::Real),
      other => Err(Error::UnknownCategory(other)),
    }
  }
}

/// A user's relationship to a subject. Discriminants match the upstream
/// API's numeric codes.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusType {
  ToWatch   = 1,
  Watched   = 2,
  Watching  = 3,
  Postponed = 4,
  Discarded = 5,
}

impl StatusType {
  pub fn code(self) -> u8 { self as u8 }

  pub fn from_code(code: u8) -> Result<Self> {
    match code {
      1 => Ok(Self::ToWatch),
      2 => Ok(Self::Watched),
      3 => Ok(Self::Watching),
      4 => Ok(Self::Postponed),
      5 => Ok(Self::Discarded),
      other => Err(Error::UnknownStatus(other)),
    }
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// One user's status entry for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
  pub user_id:     String,
  pub subject_id:  String,
  pub category:    SubjectCategory,
  pub status:      StatusType,
  /// When the user last touched this entry upstream.
  pub recorded_at: DateTime<Utc>,
  /// 1–10; 0 means the user never rated the subject.
  pub rating:      u8,
}

/// Subject details that travel with a record while it is filtered. Never
/// persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectMetadata {
  pub tags:            Vec<String>,
  /// How many users have the subject in any collection state.
  pub collector_count: u64,
}

/// A record as delivered by an [`ActivitySource`](crate::source::ActivitySource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcedRecord {
  pub record:   ActivityRecord,
  pub metadata: SubjectMetadata,
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// A catalog account that has cleared the eligibility bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:               String,
  pub display_name:     String,
  pub avatar_url:       String,
  /// Watermark: the newest record timestamp seen for this user. Incremental
  /// refreshes only fetch records recorded after it.
  pub last_active_time: DateTime<Utc>,
}

/// Public profile fields returned by the upstream user endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
  pub display_name: String,
  pub avatar_url:   String,
}

impl User {
  pub fn from_profile(
    id: impl Into<String>,
    profile: UserProfile,
    last_active_time: DateTime<Utc>,
  ) -> Self {
    Self {
      id: id.into(),
      display_name: profile.display_name,
      avatar_url: profile.avatar_url,
      last_active_time,
    }
  }
}
