//! Async HTTP client for the Bangumi v0 API.

use std::time::Duration;

use beck_core::{
  record::{StatusType, SubjectCategory, UserProfile},
  source::{ActivitySource, RecordPage},
};
use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
  Error, Result,
  wire::{CollectionPage, ErrorBody, UserBody},
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Connection, pacing and retry settings for the Bangumi API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url:           String,
  pub user_agent:         String,
  pub timeout_secs:       u64,
  /// Every request waits at least this long before it is sent.
  pub base_delay_ms:      u64,
  /// Plus a random extra delay of up to this much.
  pub jitter_ms:          u64,
  pub max_retries:        u32,
  /// First backoff; doubles on each further retry.
  pub initial_backoff_ms: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url:           "https://api.bgm.tv".into(),
      user_agent:         concat!("beck-crawler/", env!("CARGO_PKG_VERSION")).into(),
      timeout_secs:       30,
      base_delay_ms:      1000,
      jitter_ms:          1000,
      max_retries:        5,
      initial_backoff_ms: 2000,
    }
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async client for the Bangumi collection and user endpoints.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct BgmClient {
  client: Client,
  config: ApiConfig,
}

/// Status codes worth another attempt.
fn is_retryable(status: StatusCode) -> bool {
  status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

impl BgmClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(config.user_agent.clone())
      .build()
      .map_err(Error::Client)?;
    Ok(Self { client, config })
  }

  pub fn config(&self) -> &ApiConfig { &self.config }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// Sleep for the base delay plus a random share of the jitter.
  async fn pace(&self) {
    let jitter = match self.config.jitter_ms {
      0 => 0,
      max => OsRng.next_u64() % max.saturating_add(1),
    };
    let delay = self.config.base_delay_ms.saturating_add(jitter);
    if delay > 0 {
      tokio::time::sleep(Duration::from_millis(delay)).await;
    }
  }

  /// Paced GET with exponential backoff on transport errors, 5xx and 429.
  /// Any other response is returned as-is for the caller to interpret.
  async fn send(&self, path: &str, query: &[(&str, String)]) -> Result<(StatusCode, String)> {
    let url = self.url(path);
    let mut backoff = Duration::from_millis(self.config.initial_backoff_ms);
    let mut last_err = String::new();

    for attempt in 0..=self.config.max_retries {
      if attempt > 0 {
        debug!(path, attempt, ?backoff, reason = %last_err, "retrying request");
        tokio::time::sleep(backoff).await;
        backoff = backoff.saturating_mul(2);
      }
      self.pace().await;

      match self.client.get(&url).query(query).send().await {
        Ok(resp) if is_retryable(resp.status()) => {
          last_err = format!("HTTP {}", resp.status());
        }
        Ok(resp) => {
          let status = resp.status();
          match resp.text().await {
            Ok(body) => return Ok((status, body)),
            Err(e) => last_err = e.to_string(),
          }
        }
        Err(e) => last_err = e.to_string(),
      }
    }

    Err(Error::TransientFetch { attempts: self.config.max_retries + 1, reason: last_err })
  }

  fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| Error::Decode { path: path.to_owned(), source })
  }

  // ── Endpoints ─────────────────────────────────────────────────────────────

  /// `GET /v0/users/{id}/collections?subject_type=&type=&limit=&offset=`
  async fn collections(
    &self,
    user_id: &str,
    status: StatusType,
    category: SubjectCategory,
    offset: u64,
    limit: usize,
  ) -> Result<CollectionPage> {
    let path = format!("/v0/users/{user_id}/collections");
    let (code, body) = self
      .send(&path, &[
        ("subject_type", category.code().to_string()),
        ("type", status.code().to_string()),
        ("limit", limit.to_string()),
        ("offset", offset.to_string()),
      ])
      .await?;

    if code.is_success() {
      return Self::decode(&path, &body);
    }
    if code == StatusCode::BAD_REQUEST {
      let err: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
      if let Some(max_offset) = err.offset_exceeded() {
        return Err(Error::UpstreamLogic { max_offset });
      }
    }
    Err(Error::Status { path, status: code.as_u16() })
  }

  /// `GET /v0/users/{id}`
  pub async fn user(&self, user_id: &str) -> Result<UserProfile> {
    let path = format!("/v0/users/{user_id}");
    let (code, body) = self.send(&path, &[]).await?;
    if !code.is_success() {
      return Err(Error::Status { path, status: code.as_u16() });
    }
    Self::decode::<UserBody>(&path, &body).map(UserProfile::from)
  }
}

// ─── ActivitySource impl ─────────────────────────────────────────────────────

impl ActivitySource for BgmClient {
  type Error = Error;

  async fn count_records(
    &self,
    user_id: &str,
    status: StatusType,
    category: SubjectCategory,
  ) -> Result<u64> {
    match self.collections(user_id, status, category, 0, 1).await {
      Ok(page) => Ok(page.total),
      Err(Error::UpstreamLogic { .. }) => Ok(0),
      Err(e) => Err(e),
    }
  }

  async fn record_timestamp_at(
    &self,
    user_id: &str,
    offset: u64,
    status: StatusType,
    category: SubjectCategory,
  ) -> Result<DateTime<Utc>> {
    let page = match self.collections(user_id, status, category, offset, 1).await {
      Err(Error::UpstreamLogic { .. }) => return Err(Error::NoRecordAt(offset)),
      other => other?,
    };
    page.into_first().ok_or(Error::NoRecordAt(offset))??.recorded_at()
  }

  async fn fetch_records(
    &self,
    user_id: &str,
    status: StatusType,
    category: SubjectCategory,
    offset: u64,
    limit: usize,
  ) -> Result<RecordPage> {
    match self.collections(user_id, status, category, offset, limit).await {
      Ok(page) => Ok(page.into_record_page(user_id, status, category)),
      Err(Error::UpstreamLogic { max_offset }) => {
        debug!(user_id, offset, ?max_offset, "listing exhausted");
        Ok(RecordPage::empty())
      }
      Err(e) => Err(e),
    }
  }

  async fn fetch_user_profile(&self, user_id: &str) -> Result<UserProfile> {
    self.user(user_id).await
  }
}
