//! Bangumi v0 API adapter for beck.
//!
//! [`BgmClient`] implements [`beck_core::source::ActivitySource`] over the
//! public collection and user endpoints, with paced requests and retry on
//! transient failures.

mod client;
pub mod error;
mod wire;

pub use client::{ApiConfig, BgmClient};
pub use error::{Error, Result};
