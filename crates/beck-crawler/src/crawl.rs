//! Worker pool for intake and refresh runs.
//!
//! Users are split into contiguous shards, one per worker task. Each worker
//! owns its own evaluator and refresh policy (and so its own request
//! meter) and processes its shard sequentially. Each user's upstream
//! fetches run under a wall-clock deadline; the store writes that follow
//! run to completion. Failures are counted and logged without aborting the
//! run.

use std::{collections::BTreeSet, future::Future, ops::Range, sync::Arc};

use beck_core::{
  evaluator::{EligibilityEvaluator, Verdict},
  record::{ActivityRecord, User},
  refresh::{RefreshOutcome, RefreshPolicy},
  source::ActivitySource,
  store::PersistentStore,
};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::{
  CrawlerConfig, Error, Mode, Result,
  summary::{RunSummary, UserOutcome},
};

/// Split `0..total` into at most `workers` contiguous, non-empty ranges
/// whose lengths differ by at most one.
pub fn shard_ranges(total: u64, workers: usize) -> Vec<Range<u64>> {
  let shards = (workers.max(1) as u64).min(total);
  if shards == 0 {
    return Vec::new();
  }
  let (base, extra) = (total / shards, total % shards);
  let mut start = 0;
  (0..shards)
    .map(|i| {
      let len = base + u64::from(i < extra);
      let range = start..start + len;
      start += len;
      range
    })
    .collect()
}

// ─── Crawler ─────────────────────────────────────────────────────────────────

pub struct Crawler<St, So> {
  store:  St,
  source: So,
  config: Arc<CrawlerConfig>,
}

impl<St, So> Crawler<St, So>
where
  St: PersistentStore + Clone + 'static,
  So: ActivitySource + Clone + 'static,
{
  pub fn new(store: St, source: So, config: CrawlerConfig) -> Result<Self> {
    config.validate()?;
    Ok(Self { store, source, config: Arc::new(config) })
  }

  pub async fn run(&self, mode: Mode, candidates: BTreeSet<String>) -> Result<RunSummary> {
    match mode {
      Mode::Intake => self.intake(candidates).await,
      Mode::Refresh => self.refresh_all().await,
    }
  }

  /// Evaluate every candidate. Candidates already in the store are
  /// refreshed instead.
  pub async fn intake(&self, candidates: BTreeSet<String>) -> Result<RunSummary> {
    let ids: Vec<String> = candidates.into_iter().collect();
    let shards = shard_ranges(ids.len() as u64, self.config.worker_count());
    info!(candidates = ids.len(), workers = shards.len(), "starting intake");

    let mut set = JoinSet::new();
    for (n, range) in shards.into_iter().enumerate() {
      let batch = ids[range.start as usize..range.end as usize].to_vec();
      let worker = self.worker(n);
      set.spawn(async move { worker.intake(batch).await });
    }
    self.join(set).await
  }

  /// Refresh every stored user.
  pub async fn refresh_all(&self) -> Result<RunSummary> {
    let total = self.store.count_users().await.map_err(Error::store)?;
    let shards = shard_ranges(total, self.config.worker_count());
    info!(users = total, workers = shards.len(), "starting refresh");

    // Workers delete users as they go, so every shard is listed first.
    let mut batches = Vec::with_capacity(shards.len());
    for range in shards {
      let ids = self
        .store
        .list_user_ids(range.start, range.end - range.start)
        .await
        .map_err(Error::store)?;
      batches.push(ids);
    }

    let mut set = JoinSet::new();
    for (n, batch) in batches.into_iter().enumerate() {
      let worker = self.worker(n);
      set.spawn(async move { worker.refresh(batch).await });
    }
    self.join(set).await
  }

  async fn join(&self, mut set: JoinSet<RunSummary>) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    while let Some(joined) = set.join_next().await {
      summary += joined?;
    }
    info!(%summary, "run finished");
    Ok(summary)
  }

  fn worker(&self, id: usize) -> Worker<St, So> {
    let vip = self.config.vip.clone();
    Worker {
      id,
      store: self.store.clone(),
      evaluator: EligibilityEvaluator::new(self.source.clone(), vip.clone()),
      policy: RefreshPolicy::new(self.source.clone(), vip)
        .with_budget(self.config.refresh_budget),
      config: Arc::clone(&self.config),
    }
  }
}

// ─── Worker ──────────────────────────────────────────────────────────────────

/// What the fetch phase decided for one user. Applied to the store after
/// the deadline, so a write is never cut off halfway.
#[derive(Debug)]
enum Plan {
  Insert { user: User, records: Vec<ActivityRecord> },
  Update { user: User, records: Vec<ActivityRecord> },
  Remove(String),
  Skip(UserOutcome),
}

struct Worker<St, So> {
  id:        usize,
  store:     St,
  evaluator: EligibilityEvaluator<So>,
  policy:    RefreshPolicy<So>,
  config:    Arc<CrawlerConfig>,
}

impl<St, So> Worker<St, So>
where
  St: PersistentStore,
  So: ActivitySource,
{
  async fn intake(self, ids: Vec<String>) -> RunSummary {
    let mut summary = RunSummary::default();
    for id in &ids {
      let outcome = match self.bounded(id, self.plan_intake(id)).await {
        Some(plan) => self.settle(id, self.commit(plan).await),
        None => UserOutcome::Errored,
      };
      summary.record(outcome);
    }
    debug!(worker = self.id, %summary, "intake worker finished");
    summary
  }

  async fn refresh(self, ids: Vec<String>) -> RunSummary {
    let mut summary = RunSummary::default();
    for id in &ids {
      let outcome = match self.bounded(id, self.plan_refresh(id)).await {
        Some(plan) => self.settle(id, self.commit(plan).await),
        None => UserOutcome::Errored,
      };
      summary.record(outcome);
    }
    debug!(
      worker = self.id,
      requests = self.policy.requests_made(),
      %summary,
      "refresh worker finished"
    );
    summary
  }

  /// Run one user's fetch phase under the per-user deadline.
  async fn bounded(
    &self,
    user_id: &str,
    work: impl Future<Output = Result<Plan>>,
  ) -> Option<Plan> {
    let deadline = self.config.user_deadline();
    match tokio::time::timeout(deadline, work).await {
      Ok(Ok(plan)) => Some(plan),
      Ok(Err(e)) => {
        error!(worker = self.id, user_id, error = %e, "user failed");
        None
      }
      Err(_) => {
        warn!(worker = self.id, user_id, ?deadline, "user deadline exceeded");
        None
      }
    }
  }

  fn settle(&self, user_id: &str, result: Result<UserOutcome>) -> UserOutcome {
    result.unwrap_or_else(|e| {
      error!(worker = self.id, user_id, error = %e, "store write failed");
      UserOutcome::Errored
    })
  }

  async fn plan_intake(&self, user_id: &str) -> Result<Plan> {
    if let Some(user) = self.store.get_user(user_id).await.map_err(Error::store)? {
      debug!(user_id, "already stored; refreshing instead");
      return self.plan_update(&user).await;
    }

    let (records, last_active) = match self.evaluator.evaluate(user_id).await {
      Verdict::Accepted { records, last_active } => (records, last_active),
      Verdict::Rejected(reason) if reason.is_error() => {
        return Ok(Plan::Skip(UserOutcome::Errored));
      }
      Verdict::Rejected(_) => return Ok(Plan::Skip(UserOutcome::Rejected)),
    };

    let profile = self
      .evaluator
      .source()
      .fetch_user_profile(user_id)
      .await
      .map_err(Error::source)?;
    Ok(Plan::Insert { user: User::from_profile(user_id, profile, last_active), records })
  }

  async fn plan_refresh(&self, user_id: &str) -> Result<Plan> {
    match self.store.get_user(user_id).await.map_err(Error::store)? {
      Some(user) => self.plan_update(&user).await,
      None => {
        debug!(user_id, "user vanished before refresh");
        Ok(Plan::Skip(UserOutcome::Unchanged))
      }
    }
  }

  async fn plan_update(&self, user: &User) -> Result<Plan> {
    Ok(match self.policy.refresh(user).await.map_err(Error::source)? {
      RefreshOutcome::Updated { user, records } => Plan::Update { user, records },
      RefreshOutcome::StillInactive => Plan::Skip(UserOutcome::Unchanged),
      RefreshOutcome::Deleted => Plan::Remove(user.id.clone()),
      RefreshOutcome::Deferred => Plan::Skip(UserOutcome::Deferred),
    })
  }

  async fn commit(&self, plan: Plan) -> Result<UserOutcome> {
    let batch_size = self.config.record_batch_size;
    match plan {
      Plan::Insert { user, records } => {
        self.store.upsert_user(&user).await.map_err(Error::store)?;
        if let Err(e) = self.store.upsert_records(&records, batch_size).await {
          // A watermark without its history would hide the missing records
          // from every later refresh.
          self.store.delete_user(&user.id).await.map_err(Error::store)?;
          return Err(Error::store(e));
        }
        info!(user_id = %user.id, records = records.len(), "user stored");
        Ok(UserOutcome::Accepted)
      }
      Plan::Update { user, records } => {
        // Records before the watermark, so a failed write is retried.
        self.store.upsert_records(&records, batch_size).await.map_err(Error::store)?;
        self.store.upsert_user(&user).await.map_err(Error::store)?;
        Ok(UserOutcome::Refreshed)
      }
      Plan::Remove(user_id) => {
        self.store.delete_user(&user_id).await.map_err(Error::store)?;
        info!(user_id, "inactive user removed");
        Ok(UserOutcome::Deleted)
      }
      Plan::Skip(outcome) => Ok(outcome),
    }
  }
}
