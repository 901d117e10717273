//! beck crawler binary.
//!
//! Reads `beck.toml` (or the path given with `--config`) layered under
//! `BECK_*` environment variables, opens the SQLite store and runs one
//! intake or refresh pass against the Bangumi API.

use std::{collections::BTreeSet, path::PathBuf};

use anyhow::Context as _;
use beck_bgm::BgmClient;
use beck_crawler::{
  Crawler, CrawlerConfig, Mode,
  candidates::{CandidateMerger, FileCandidates, ListCandidates},
};
use beck_store_sqlite::SqliteStore;
use chrono::Utc;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Loyal-viewer crawler for Bangumi")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "beck.toml")]
  config: PathBuf,

  /// Run mode. Defaults to the configured mode, then to the calendar.
  #[arg(short, long, value_enum)]
  mode: Option<Mode>,

  /// Candidate user ids, merged with the configured candidates file.
  ids: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("BECK")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()
    .context("failed to read config file")?;

  let crawler_cfg: CrawlerConfig = settings
    .try_deserialize()
    .context("failed to deserialise CrawlerConfig")?;
  let crawler_cfg = crawler_cfg.expand_paths();

  let mode = Mode::resolve(cli.mode.or(crawler_cfg.mode), Utc::now().date_naive());
  tracing::info!(?mode, store = ?crawler_cfg.store_path, "beck starting");

  let candidates = if mode == Mode::Intake {
    gather_candidates(cli.ids, crawler_cfg.candidates_file.clone()).await?
  } else {
    BTreeSet::new()
  };

  let store = SqliteStore::open(&crawler_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", crawler_cfg.store_path))?;
  let client = BgmClient::new(crawler_cfg.api.clone()).context("failed to build API client")?;

  let crawler = Crawler::new(store, client, crawler_cfg).context("invalid configuration")?;
  let summary = crawler.run(mode, candidates).await.context("crawl failed")?;

  tracing::info!(%summary, "done");
  Ok(())
}

async fn gather_candidates(
  ids: Vec<String>,
  file: Option<PathBuf>,
) -> anyhow::Result<BTreeSet<String>> {
  let merger = CandidateMerger::spawn(256);
  merger.feed(&ListCandidates::new(ids)).await?;
  if let Some(path) = file {
    merger.feed(&FileCandidates::new(path)).await?;
  }
  Ok(merger.finish().await?)
}
