//! Run-now execution path: invoke a job, package its outcome, record it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use super::{ExecutionResult, JobCatalog, JobDescriptor, JobStatus};
use crate::storage::ResultStore;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job not found: {id}")]
    NotFound { id: String },
}

/// Executes a single job to completion.
#[async_trait::async_trait]
pub trait JobRunner: Send + Sync {
    /// Run `job` once. `forced` marks a manual trigger that bypassed the
    /// schedule. An `Err` is a failure of the job itself; the dispatcher turns
    /// it into an `error` result.
    async fn run(&self, job: &JobDescriptor, forced: bool) -> Result<ExecutionResult>;
}

// ---------------------------------------------------------------------------
// CommandRunner
// ---------------------------------------------------------------------------

/// Runs a job's configured command as a child process.
///
/// Stdout lines become details and stderr lines become errors. Exit 0 with a
/// clean stderr is `success`, exit 0 with stderr output is
/// `partial_success`, any other exit is `error`.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

fn non_empty_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait::async_trait]
impl JobRunner for CommandRunner {
    async fn run(&self, job: &JobDescriptor, forced: bool) -> Result<ExecutionResult> {
        let started = Utc::now();
        let Some((program, args)) = job.command.as_deref().and_then(|c| c.split_first()) else {
            return Ok(ExecutionResult::new(&job.id, JobStatus::Skipped)
                .with_message(format!("No command configured for '{}'", job.id))
                .at(started)
                .forced(forced));
        };

        tracing::debug!(job_id = %job.id, %program, ?args, "spawning job command");
        let clock = Instant::now();

        let output = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(program)
                .args(args)
                .env("JOBDECK_JOB_ID", &job.id)
                .env("JOBDECK_FORCED", if forced { "1" } else { "0" })
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| anyhow!("'{}' timed out after {}s", program, self.timeout.as_secs()))?
        .with_context(|| format!("failed to spawn '{program}'"))?;

        let details = non_empty_lines(&output.stdout);
        let errors = non_empty_lines(&output.stderr);

        let status = if !output.status.success() {
            JobStatus::Error
        } else if errors.is_empty() {
            JobStatus::Success
        } else {
            JobStatus::PartialSuccess
        };
        let message = match status {
            JobStatus::Success => format!("{} completed successfully", job.name),
            JobStatus::PartialSuccess => {
                format!("{} completed with {} errors", job.name, errors.len())
            }
            _ => format!("{} failed: {}", job.name, output.status),
        };

        let mut result = ExecutionResult::new(&job.id, status)
            .with_message(message)
            .with_counter("lines_out", details.len() as u64)
            .with_counter("lines_err", errors.len() as u64)
            .with_counter("duration_ms", clock.elapsed().as_millis() as u64)
            .at(started)
            .forced(forced);
        result.details = details;
        result.errors = errors;
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Releases a job's running slot when dropped.
struct RunSlot<'a> {
    running: &'a Mutex<HashSet<String>>,
    job_id: String,
}

impl Drop for RunSlot<'_> {
    fn drop(&mut self) {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.job_id);
    }
}

/// Runs jobs on demand and records every outcome in the result store.
pub struct Dispatcher {
    catalog: Arc<dyn JobCatalog>,
    runner: Arc<dyn JobRunner>,
    store: Arc<ResultStore>,
    /// Jobs with a run in flight.
    running: Mutex<HashSet<String>>,
}

impl Dispatcher {
    pub fn new(
        catalog: Arc<dyn JobCatalog>,
        runner: Arc<dyn JobRunner>,
        store: Arc<ResultStore>,
    ) -> Self {
        Self {
            catalog,
            runner,
            store,
            running: Mutex::new(HashSet::new()),
        }
    }

    pub fn catalog(&self) -> &Arc<dyn JobCatalog> {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    fn claim(&self, job_id: &str) -> Option<RunSlot<'_>> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(job_id.to_string()) {
            return None;
        }
        Some(RunSlot {
            running: &self.running,
            job_id: job_id.to_string(),
        })
    }

    /// Run `job_id` immediately, bypassing its schedule.
    ///
    /// The returned result has already been recorded. A job that fails is
    /// recorded as `error` with the failure text; a job that is already
    /// running is recorded as `skipped`.
    pub async fn run_now(&self, job_id: &str) -> Result<ExecutionResult, JobError> {
        let job = self.catalog.job(job_id).ok_or_else(|| JobError::NotFound {
            id: job_id.to_string(),
        })?;
        let started = Utc::now();

        let Some(slot) = self.claim(job_id) else {
            warn!(job_id, "job is already running, skipping execution");
            let result = ExecutionResult::new(job_id, JobStatus::Skipped)
                .with_message(format!("Job '{job_id}' is already running, skipping execution"))
                .at(started)
                .forced(true);
            self.store.record(job_id, result.clone()).await;
            return Ok(result);
        };

        info!(job_id, name = %job.name, "running job now");
        let mut result = match self.runner.run(&job, true).await {
            Ok(result) => result,
            Err(e) => {
                error!(job_id, error = %format!("{e:#}"), "job execution failed");
                ExecutionResult::failure(job_id, format!("{e:#}"))
            }
        };
        drop(slot);

        result.forced = true;
        if result.job_id.is_empty() {
            result.job_id = job_id.to_string();
        }
        if result.execution_time.is_none() {
            result.execution_time = Some(started);
        }

        self.store.record(job_id, result.clone()).await;
        info!(job_id, status = %result.status, "job run finished");
        Ok(result)
    }
}
