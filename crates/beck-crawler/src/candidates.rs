//! Candidate id sources and the single-writer merge that deduplicates them.

use std::{collections::BTreeSet, convert::Infallible, io, path::PathBuf};

use beck_core::candidates::CandidateSource;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info};

use crate::{Error, Result};

// ─── Sources ─────────────────────────────────────────────────────────────────

/// Ids read from a newline-delimited file. Blank lines and lines starting
/// with `#` are ignored.
#[derive(Debug, Clone)]
pub struct FileCandidates {
  path: PathBuf,
}

impl FileCandidates {
  pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
}

fn parse_ids(text: &str) -> Vec<String> {
  text
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty() && !line.starts_with('#'))
    .map(str::to_owned)
    .collect()
}

impl CandidateSource for FileCandidates {
  type Error = io::Error;

  fn name(&self) -> &str { "file" }

  async fn candidates(&self) -> Result<Vec<String>, io::Error> {
    let text = tokio::fs::read_to_string(&self.path).await?;
    Ok(parse_ids(&text))
  }
}

/// A fixed list, e.g. ids given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ListCandidates {
  ids: Vec<String>,
}

impl ListCandidates {
  pub fn new(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
    Self { ids: ids.into_iter().map(Into::into).collect() }
  }
}

impl CandidateSource for ListCandidates {
  type Error = Infallible;

  fn name(&self) -> &str { "cli" }

  async fn candidates(&self) -> Result<Vec<String>, Infallible> {
    Ok(self.ids.iter().map(|id| id.trim().to_owned()).filter(|id| !id.is_empty()).collect())
  }
}

// ─── Merge ───────────────────────────────────────────────────────────────────

/// Owns the candidate set. Producers only hold senders; the set itself is
/// touched by a single task.
pub struct CandidateMerger {
  tx:     mpsc::Sender<String>,
  writer: JoinHandle<BTreeSet<String>>,
}

impl CandidateMerger {
  pub fn spawn(buffer: usize) -> Self {
    let (tx, mut rx) = mpsc::channel::<String>(buffer.max(1));
    let writer = tokio::spawn(async move {
      let mut ids = BTreeSet::new();
      while let Some(id) = rx.recv().await {
        ids.insert(id);
      }
      ids
    });
    Self { tx, writer }
  }

  pub fn sender(&self) -> mpsc::Sender<String> { self.tx.clone() }

  /// Forward every id from `source` to the writer. Returns how many were
  /// sent, duplicates included.
  pub async fn feed<C: CandidateSource>(&self, source: &C) -> Result<usize> {
    let ids = source.candidates().await.map_err(|e| Error::Candidates {
      name:   source.name().to_owned(),
      source: Box::new(e),
    })?;
    let sent = ids.len();
    for id in ids {
      // The writer only stops once every sender is gone.
      if self.tx.send(id).await.is_err() {
        break;
      }
    }
    debug!(source = source.name(), sent, "candidates forwarded");
    Ok(sent)
  }

  /// Close the channel and wait for the deduplicated set.
  pub async fn finish(self) -> Result<BTreeSet<String>> {
    drop(self.tx);
    let ids = self.writer.await?;
    info!(candidates = ids.len(), "candidate set merged");
    Ok(ids)
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  #[test]
  fn file_format_skips_blanks_and_comments() {
    let ids = parse_ids("# seed list\n  101 \n\n202\n#303\n101\n");
    assert_eq!(ids, ["101", "202", "101"]);
  }

  #[tokio::test]
  async fn file_source_reads_ids() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"7\n# seed\n8\n").unwrap();

    let ids = FileCandidates::new(file.path()).candidates().await.unwrap();

    assert_eq!(ids, ["7", "8"]);
  }

  #[tokio::test]
  async fn missing_file_is_reported_with_source_name() {
    let merger = CandidateMerger::spawn(8);
    let err = merger
      .feed(&FileCandidates::new("/nonexistent/beck/ids.txt"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Candidates { ref name, .. } if name == "file"));
  }

  #[tokio::test]
  async fn merge_deduplicates_across_sources() {
    let merger = CandidateMerger::spawn(2);
    let sent_a = merger.feed(&ListCandidates::new(["3", "1", "2", "1"])).await.unwrap();
    let sent_b = merger.feed(&ListCandidates::new(["2", " 4 ", ""])).await.unwrap();

    let ids = merger.finish().await.unwrap();

    assert_eq!(sent_a, 4);
    assert_eq!(sent_b, 2);
    assert_eq!(ids.into_iter().collect::<Vec<_>>(), ["1", "2", "3", "4"]);
  }

  #[tokio::test]
  async fn concurrent_producers_share_one_writer() {
    let merger = CandidateMerger::spawn(4);
    let mut handles = Vec::new();
    for p in 0..4 {
      let tx = merger.sender();
      handles.push(tokio::spawn(async move {
        for i in 0..25 {
          tx.send(format!("{}", (p * 10 + i) % 50)).await.unwrap();
        }
      }));
    }
    for h in handles {
      h.await.unwrap();
    }

    let ids = merger.finish().await.unwrap();
    assert_eq!(ids.len(), 50);
  }
}
