//! Execution outcomes recorded for each job run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome category of a single job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Success,
    PartialSuccess,
    Error,
    Skipped,
    /// Substituted when a result arrives without a recognisable status.
    Unknown,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Success => "success",
            JobStatus::PartialSuccess => "partial_success",
            JobStatus::Error => "error",
            JobStatus::Skipped => "skipped",
            JobStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(JobStatus::Success),
            "partial_success" => Ok(JobStatus::PartialSuccess),
            "error" => Ok(JobStatus::Error),
            "skipped" => Ok(JobStatus::Skipped),
            "unknown" => Ok(JobStatus::Unknown),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// A record of one job execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub job_id: String,
    pub status: JobStatus,
    pub message: String,
    /// Ordered progress lines.
    pub details: Vec<String>,
    pub errors: Vec<String>,
    /// Job-specific tallies (items processed, mails sent, ...).
    pub counters: BTreeMap<String, u64>,
    pub execution_time: Option<DateTime<Utc>>,
    /// Triggered by hand, bypassing the schedule.
    pub forced: bool,
}

impl ExecutionResult {
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            message: String::new(),
            details: Vec::new(),
            errors: Vec::new(),
            counters: BTreeMap::new(),
            execution_time: None,
            forced: false,
        }
    }

    /// An `error` result carrying `error` as both message and error line.
    pub fn failure(job_id: impl Into<String>, error: impl std::fmt::Display) -> Self {
        let text = error.to_string();
        let mut result = Self::new(job_id, JobStatus::Error);
        result.details.push(format!("Critical error: {text}"));
        result.errors.push(text.clone());
        result.message = text;
        result
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_detail(mut self, line: impl Into<String>) -> Self {
        self.details.push(line.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn with_counter(mut self, name: impl Into<String>, value: u64) -> Self {
        self.counters.insert(name.into(), value);
        self
    }

    pub fn at(mut self, when: DateTime<Utc>) -> Self {
        self.execution_time = Some(when);
        self
    }

    pub fn forced(mut self, forced: bool) -> Self {
        self.forced = forced;
        self
    }

    /// Counter value, zero when the job did not report it.
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }
}

/// A history log entry: the stored result plus the time it was accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub result: ExecutionResult,
    pub stored_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            JobStatus::Success,
            JobStatus::PartialSuccess,
            JobStatus::Error,
            JobStatus::Skipped,
            JobStatus::Unknown,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("failed".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::PartialSuccess).unwrap();
        assert_eq!(json, "\"partial_success\"");
    }

    #[test]
    fn test_failure_captures_error_text() {
        let r = ExecutionResult::failure("weekly-report", "smtp connection refused");
        assert_eq!(r.status, JobStatus::Error);
        assert_eq!(r.message, "smtp connection refused");
        assert_eq!(r.errors, vec!["smtp connection refused".to_string()]);
        assert_eq!(r.details.len(), 1);
    }

    #[test]
    fn test_missing_counter_reads_zero() {
        let r = ExecutionResult::new("job", JobStatus::Success).with_counter("tasks_archived", 4);
        assert_eq!(r.counter("tasks_archived"), 4);
        assert_eq!(r.counter("tasks_deleted"), 0);
    }
}
