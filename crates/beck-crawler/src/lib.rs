//! Orchestration for the beck crawler.
//!
//! Gathers candidate ids, evaluates new users, refreshes stored ones and
//! persists the outcome, spreading users across a fixed pool of worker
//! tasks. The `beck` binary wires this to the Bangumi client and the SQLite
//! store.

pub mod candidates;
pub mod config;
pub mod crawl;
pub mod error;
pub mod summary;

#[cfg(test)]
mod testing;

pub use config::{CrawlerConfig, Mode};
pub use crawl::Crawler;
pub use error::{Error, Result};
pub use summary::{RunSummary, UserOutcome};
