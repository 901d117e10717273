use thiserror::Error;

/// Errors surfaced by the Bangumi client.
#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  /// Transport failure, 5xx or 429 that outlived every retry.
  #[error("gave up after {attempts} attempts: {reason}")]
  TransientFetch { attempts: u32, reason: String },

  /// The requested offset lies past the end of the listing.
  #[error("offset beyond upstream maximum ({max_offset:?})")]
  UpstreamLogic { max_offset: Option<u64> },

  #[error("{path} returned HTTP {status}")]
  Status { path: String, status: u16 },

  #[error("malformed response from {path}: {source}")]
  Decode {
    path:   String,
    #[source]
    source: serde_json::Error,
  },

  /// A collection entry lacks a required field or has one of the wrong type.
  #[error("malformed collection entry: {0}")]
  MalformedItem(#[source] serde_json::Error),

  #[error("unparseable timestamp {value:?}: {source}")]
  DataParse {
    value:  String,
    #[source]
    source: chrono::ParseError,
  },

  #[error("no record at offset {0}")]
  NoRecordAt(u64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
