//! Content filter applied to every fetched record.

use std::collections::BTreeSet;

use crate::record::SubjectMetadata;

/// Rejects records that say little about a user's taste: unrated entries,
/// subjects carrying a reject-listed tag, and obscure subjects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
  reject_tags:      BTreeSet<String>,
  popularity_floor: u64,
}

impl RecordFilter {
  pub fn new(
    reject_tags: impl IntoIterator<Item = impl Into<String>>,
    popularity_floor: u64,
  ) -> Self {
    Self {
      reject_tags: reject_tags.into_iter().map(Into::into).collect(),
      popularity_floor,
    }
  }

  pub fn accept(&self, rating: u8, metadata: &SubjectMetadata) -> bool {
    rating != 0
      && metadata.collector_count >= self.popularity_floor
      && !metadata.tags.iter().any(|t| self.reject_tags.contains(t))
  }
}
