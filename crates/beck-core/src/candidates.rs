//! The `CandidateSource` trait.

use std::future::Future;

/// Produces user ids worth evaluating. Implementations may return
/// duplicates; the crawler deduplicates before evaluation.
pub trait CandidateSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Short label used in logs.
  fn name(&self) -> &str;

  fn candidates(&self) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;
}
