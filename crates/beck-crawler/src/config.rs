//! Crawler configuration and run-mode selection.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use beck_bgm::ApiConfig;
use beck_core::config::VipConfig;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use crate::Result;

// ─── Mode ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
  /// Evaluate candidate ids and persist the users that qualify.
  Intake,
  /// Re-check every stored user and fetch what is new since its watermark.
  Refresh,
}

impl Mode {
  /// The explicit mode if one was given; otherwise intake in March, June,
  /// September and December, refresh in every other month.
  pub fn resolve(explicit: Option<Mode>, today: NaiveDate) -> Mode {
    explicit.unwrap_or(if today.month() % 3 == 0 { Mode::Intake } else { Mode::Refresh })
  }
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `beck.toml` and `BECK_*`
/// environment variables. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
  pub mode:               Option<Mode>,
  pub store_path:         PathBuf,
  pub workers:            usize,
  /// Wall-clock limit for one user's evaluation or refresh.
  pub user_deadline_secs: u64,
  /// Newline-delimited candidate ids; `#` starts a comment.
  pub candidates_file:    Option<PathBuf>,
  pub record_batch_size:  usize,
  /// Upstream requests one refresh worker may spend before deferring the
  /// rest of its users. `None` is unlimited.
  pub refresh_budget:     Option<u64>,
  pub api:                ApiConfig,
  pub vip:                VipConfig,
}

impl Default for CrawlerConfig {
  fn default() -> Self {
    Self {
      mode:               None,
      store_path:         PathBuf::from("beck.db"),
      workers:            4,
      user_deadline_secs: 1800,
      candidates_file:    None,
      record_batch_size:  50,
      refresh_budget:     None,
      api:                ApiConfig::default(),
      vip:                VipConfig::default(),
    }
  }
}

impl CrawlerConfig {
  pub fn validate(&self) -> Result<()> {
    self.vip.validate()?;
    Ok(())
  }

  pub fn user_deadline(&self) -> Duration { Duration::from_secs(self.user_deadline_secs) }

  pub fn worker_count(&self) -> usize { self.workers.max(1) }

  /// Expand a leading `~` in the configured paths.
  pub fn expand_paths(mut self) -> Self {
    self.store_path = expand_tilde(&self.store_path);
    self.candidates_file = self.candidates_file.as_deref().map(expand_tilde);
    self
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
