use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid configuration: {0}")]
  Config(#[from] beck_core::Error),

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("upstream error: {0}")]
  Source(#[source] BoxError),

  #[error("candidate source {name} failed: {source}")]
  Candidates {
    name:   String,
    #[source]
    source: BoxError,
  },

  #[error("worker task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }

  pub(crate) fn source(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Source(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
