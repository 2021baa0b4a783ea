//! In-memory result storage -- latest result per job, bounded history, summaries.
//!
//! A single [`ResultStore`] is created at start-up and shared behind an `Arc`
//! by everything that records or reads job outcomes. Both structures sit
//! behind one `tokio::sync::Mutex`; it is held only while copying or mutating
//! in memory, never across a job's execution.

pub mod ingest;

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::scheduler::{ExecutionResult, HistoryEntry, JobStatus};

/// Number of history entries kept unless configured otherwise.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

// ---------------------------------------------------------------------------
// Summary types
// ---------------------------------------------------------------------------

/// Aggregate counters over the latest result of every job.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSummary {
    pub total: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub partial_count: usize,
    pub last_execution_time: Option<DateTime<Utc>>,
    /// Count per status name, including `unknown`.
    pub status_breakdown: BTreeMap<String, usize>,
}

impl ResultSummary {
    /// Tally `results`. Entries with status `unknown` only count toward
    /// `total` and the breakdown.
    pub fn tally<'a>(results: impl IntoIterator<Item = &'a ExecutionResult>) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.total += 1;
            match result.status {
                JobStatus::Success => summary.success_count += 1,
                JobStatus::Error => summary.failed_count += 1,
                JobStatus::Skipped => summary.skipped_count += 1,
                JobStatus::PartialSuccess => summary.partial_count += 1,
                JobStatus::Unknown => {}
            }
            *summary
                .status_breakdown
                .entry(result.status.to_string())
                .or_insert(0) += 1;

            if result.execution_time > summary.last_execution_time {
                summary.last_execution_time = result.execution_time;
            }
        }
        summary
    }
}

/// Snapshot of the store's shape, for troubleshooting.
#[derive(Debug, Clone, Serialize)]
pub struct StoreDebugState {
    pub total_results: usize,
    pub total_history: usize,
    pub history_capacity: usize,
    pub job_ids: Vec<String>,
    pub latest_statuses: BTreeMap<String, JobStatus>,
}

// ---------------------------------------------------------------------------
// ResultStore
// ---------------------------------------------------------------------------

struct StoreInner {
    /// Most recent result per job id.
    latest: HashMap<String, ExecutionResult>,
    /// Append log across all jobs, oldest first.
    history: VecDeque<HistoryEntry>,
}

/// Counts captured under the lock, logged after it is released.
struct Stored {
    status: JobStatus,
    total: usize,
    history_len: usize,
}

impl StoreInner {
    fn insert(&mut self, job_id: &str, result: ExecutionResult, capacity: usize) -> Stored {
        let status = result.status;
        self.latest.insert(job_id.to_string(), result.clone());
        self.history.push_back(HistoryEntry {
            result,
            stored_at: Utc::now(),
        });
        while self.history.len() > capacity {
            self.history.pop_front();
        }
        Stored {
            status,
            total: self.latest.len(),
            history_len: self.history.len(),
        }
    }
}

fn log_incoming(job_id: &str, result: &ExecutionResult) {
    debug!(job_id, ?result, "job result details");
}

fn log_stored(job_id: &str, stored: &Stored) {
    info!(
        job_id,
        status = %stored.status,
        total_stored = stored.total,
        history_len = stored.history_len,
        "stored job result"
    );
}

/// Concurrency-safe register of job execution outcomes.
pub struct ResultStore {
    inner: Mutex<StoreInner>,
    capacity: usize,
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ResultStore {
    /// Create an empty store keeping at most `capacity` history entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                latest: HashMap::new(),
                history: VecDeque::with_capacity(capacity.max(1)),
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store `result` as the latest for `job_id` and append it to history.
    ///
    /// Last call wins: `latest` follows lock acquisition order, not
    /// `execution_time`. A caller that records late with an older timestamp
    /// overwrites a newer result.
    pub async fn record(&self, job_id: &str, result: ExecutionResult) {
        log_incoming(job_id, &result);
        let stored = self.inner.lock().await.insert(job_id, result, self.capacity);
        log_stored(job_id, &stored);
    }

    /// [`record`](Self::record) for callers on plain OS threads.
    ///
    /// Panics if called from within an async execution context.
    pub fn record_blocking(&self, job_id: &str, result: ExecutionResult) {
        log_incoming(job_id, &result);
        let stored = self.inner.blocking_lock().insert(job_id, result, self.capacity);
        log_stored(job_id, &stored);
    }

    /// Sanitize a loosely-typed result, record it, and return exactly what
    /// was stored.
    pub async fn record_raw(&self, job_id: &str, raw: &serde_json::Value) -> ExecutionResult {
        let result = ingest::sanitize(job_id, raw);
        self.record(job_id, result.clone()).await;
        result
    }

    /// Latest result for `job_id`, if any.
    pub async fn latest(&self, job_id: &str) -> Option<ExecutionResult> {
        self.inner.lock().await.latest.get(job_id).cloned()
    }

    /// Snapshot of the latest result of every job.
    pub async fn all_latest(&self) -> HashMap<String, ExecutionResult> {
        self.inner.lock().await.latest.clone()
    }

    /// Up to `limit` history entries, most recent `execution_time` first.
    ///
    /// Entries without an execution time sort last. Ties keep insertion order.
    pub async fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        let mut entries: Vec<HistoryEntry> = {
            let inner = self.inner.lock().await;
            inner.history.iter().cloned().collect()
        };

        entries.sort_by(|a, b| b.result.execution_time.cmp(&a.result.execution_time));
        entries.truncate(limit);
        entries
    }

    /// Drop every latest result and the whole history in one step.
    pub async fn clear(&self) {
        let (results, history) = {
            let mut inner = self.inner.lock().await;
            let counts = (inner.latest.len(), inner.history.len());
            inner.latest.clear();
            inner.history.clear();
            counts
        };
        info!(results, history, "cleared job results");
    }

    /// Remove the latest result for `job_id`. History is left as is.
    pub async fn clear_one(&self, job_id: &str) -> bool {
        let removed = self.inner.lock().await.latest.remove(job_id).is_some();
        if removed {
            info!(job_id, "cleared job result");
        }
        removed
    }

    /// Aggregate counters over the latest results.
    pub async fn summary(&self) -> ResultSummary {
        let inner = self.inner.lock().await;
        ResultSummary::tally(inner.latest.values())
    }

    pub async fn debug_state(&self) -> StoreDebugState {
        let inner = self.inner.lock().await;
        let mut job_ids: Vec<String> = inner.latest.keys().cloned().collect();
        job_ids.sort();

        StoreDebugState {
            total_results: inner.latest.len(),
            total_history: inner.history.len(),
            history_capacity: self.capacity,
            job_ids,
            latest_statuses: inner
                .latest
                .iter()
                .map(|(id, r)| (id.clone(), r.status))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
