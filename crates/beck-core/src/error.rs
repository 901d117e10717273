//! Error types for `beck-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("at least one eligibility tier is required")]
  NoTiers,

  #[error("tier thresholds must be strictly ascending (got {prev} then {next})")]
  UnorderedTiers { prev: u64, next: u64 },

  #[error("the first tier threshold must be at least one record")]
  ZeroThreshold,

  #[error("tier interval must be at least one day (threshold {0})")]
  ZeroInterval(u64),

  #[error("page size must be positive")]
  ZeroPageSize,

  #[error("unknown status type code: {0}")]
  UnknownStatus(u8),

  #[error("unknown subject category code: {0}")]
  UnknownCategory(u8),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
