//! Core types and algorithms for the beck loyal-viewer crawler.
//!
//! No HTTP or database code lives here. The Bangumi client and the SQLite
//! store implement the traits defined in this crate; the crawler binary
//! wires them together.

pub mod activity;
pub mod candidates;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod filter;
pub mod record;
pub mod refresh;
pub mod source;
pub mod store;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
