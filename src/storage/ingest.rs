//! Sanitize-on-ingest for loosely typed execution results.
//!
//! Jobs report their outcome as JSON objects whose shape drifts between
//! jobs (top-level counters such as `tasks_archived`, missing statuses,
//! string timestamps). Everything is normalised here, in one place; nothing
//! is ever rejected.
//!
//! | field            | default                                     |
//! |------------------|---------------------------------------------|
//! | `job_id`         | the id the result is recorded under         |
//! | `status`         | `unknown`                                   |
//! | `message`        | empty                                       |
//! | `details`        | empty, non-string items dropped             |
//! | `errors`         | empty, non-string items dropped             |
//! | `execution_time` | none; RFC 3339 or unix seconds accepted     |
//! | `forced`         | `false`                                     |
//! | counters         | `counters` object plus other integer fields |

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::scheduler::{ExecutionResult, JobStatus};

const RESERVED_FIELDS: &[&str] = &[
    "job_id",
    "status",
    "message",
    "details",
    "errors",
    "execution_time",
    "forced",
    "counters",
    "stored_at",
];

/// Build a well-typed result from `raw`, substituting defaults.
pub fn sanitize(job_id: &str, raw: &Value) -> ExecutionResult {
    let empty = Map::new();
    let obj = match raw.as_object() {
        Some(obj) => obj,
        None => {
            warn!(job_id, "job result is not an object, recording defaults");
            &empty
        }
    };

    let result_job_id = obj
        .get("job_id")
        .and_then(Value::as_str)
        .unwrap_or(job_id)
        .to_string();

    let mut result = ExecutionResult::new(result_job_id, parse_status(job_id, obj.get("status")));
    result.message = obj
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    result.details = string_list(obj.get("details"));
    result.errors = string_list(obj.get("errors"));
    result.execution_time = obj.get("execution_time").and_then(parse_time);
    result.forced = obj.get("forced").and_then(Value::as_bool).unwrap_or(false);

    if let Some(Value::Object(counters)) = obj.get("counters") {
        for (name, value) in counters {
            result.counters.insert(name.clone(), value.as_u64().unwrap_or(0));
        }
    }
    for (name, value) in obj {
        if RESERVED_FIELDS.contains(&name.as_str()) {
            continue;
        }
        if let Some(n) = value.as_u64() {
            result.counters.insert(name.clone(), n);
        }
    }

    result
}

fn parse_status(job_id: &str, value: Option<&Value>) -> JobStatus {
    match value.and_then(Value::as_str) {
        Some(s) => s.parse().unwrap_or_else(|e| {
            warn!(job_id, status = s, "{e}, recording as unknown");
            JobStatus::Unknown
        }),
        None => {
            debug!(job_id, "job result has no status, recording as unknown");
            JobStatus::Unknown
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok(),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_full_result() {
        let raw = json!({
            "status": "partial_success",
            "message": "Task lifecycle management completed with 1 errors",
            "details": ["Phase 1", "Phase 2"],
            "errors": ["Failed to archive task 7"],
            "tasks_archived": 3,
            "tasks_deleted": 2,
            "execution_time": "2025-01-10T16:20:00Z",
            "forced": true
        });
        let r = sanitize("task-lifecycle", &raw);

        assert_eq!(r.job_id, "task-lifecycle");
        assert_eq!(r.status, JobStatus::PartialSuccess);
        assert_eq!(r.details.len(), 2);
        assert_eq!(r.errors, vec!["Failed to archive task 7".to_string()]);
        assert_eq!(r.counter("tasks_archived"), 3);
        assert_eq!(r.counter("tasks_deleted"), 2);
        assert_eq!(
            r.execution_time,
            Some(Utc.with_ymd_and_hms(2025, 1, 10, 16, 20, 0).unwrap())
        );
        assert!(r.forced);
    }

    #[test]
    fn test_missing_fields_default() {
        let r = sanitize("weekly-report", &json!({}));
        assert_eq!(r.job_id, "weekly-report");
        assert_eq!(r.status, JobStatus::Unknown);
        assert!(r.message.is_empty());
        assert!(r.details.is_empty());
        assert!(r.errors.is_empty());
        assert!(r.counters.is_empty());
        assert!(r.execution_time.is_none());
        assert!(!r.forced);
        assert_eq!(r.counter("emails_sent"), 0);
    }

    #[test]
    fn test_unrecognised_status_is_unknown() {
        let r = sanitize("job", &json!({ "status": "exploded" }));
        assert_eq!(r.status, JobStatus::Unknown);
        let r = sanitize("job", &json!({ "status": 3 }));
        assert_eq!(r.status, JobStatus::Unknown);
    }

    #[test]
    fn test_wrong_types_are_dropped() {
        let raw = json!({
            "status": "success",
            "message": 42,
            "details": ["ok", 1, null, "done"],
            "errors": "not a list",
            "execution_time": "yesterday",
            "forced": "yes",
            "counters": { "emails_sent": 5, "bad": -1 },
            "label": "ignored"
        });
        let r = sanitize("job", &raw);
        assert_eq!(r.status, JobStatus::Success);
        assert!(r.message.is_empty());
        assert_eq!(r.details, vec!["ok".to_string(), "done".to_string()]);
        assert!(r.errors.is_empty());
        assert!(r.execution_time.is_none());
        assert!(!r.forced);
        assert_eq!(r.counter("emails_sent"), 5);
        assert_eq!(r.counter("bad"), 0);
        assert!(!r.counters.contains_key("label"));
    }

    #[test]
    fn test_unix_timestamp_accepted() {
        let r = sanitize("job", &json!({ "execution_time": 1_736_526_000 }));
        assert_eq!(r.execution_time, DateTime::from_timestamp(1_736_526_000, 0));
    }

    #[test]
    fn test_non_object_yields_defaults() {
        let r = sanitize("job", &json!(["not", "an", "object"]));
        assert_eq!(r.job_id, "job");
        assert_eq!(r.status, JobStatus::Unknown);
    }
}
