//! End-to-end behaviour of the schedule calculator, dispatcher and result
//! store through the public library API.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, TimeZone, Utc, Weekday};
use jobdeck::config::Config;
use jobdeck::scheduler::calendar::ist;
use jobdeck::scheduler::{
    format_countdown, last_weekday_of_month, Dispatcher, ExecutionResult, JobDescriptor,
    JobRunner, JobStatus, RecurrenceRule, ScheduleCalculator, StaticCatalog,
};
use jobdeck::storage::ResultStore;

fn ist_time(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    ist().with_ymd_and_hms(y, m, d, h, min, 0).unwrap().with_timezone(&Utc)
}

#[test]
fn test_monthly_and_weekly_from_new_year() {
    let calc = ScheduleCalculator::default();
    let now = ist_time(2025, 1, 1, 0, 0);

    let monthly = calc.next_monthly_run(now).unwrap();
    assert_eq!(monthly.date_naive().day(), 31);
    assert_eq!(monthly.format("%H:%M").to_string(), "21:50");

    let weekly = calc.next_weekly_run(now).unwrap();
    assert_eq!(weekly.date_naive().day(), 3);
    assert_eq!(weekly.weekday(), Weekday::Fri);
}

#[test]
fn test_weekly_skips_last_friday() {
    let calc = ScheduleCalculator::default();
    // Thursday before the last Friday of January 2025.
    let next = calc.next_weekly_run(ist_time(2025, 1, 30, 12, 0)).unwrap();
    assert_eq!(next.date_naive().to_string(), "2025-02-07");
}

#[test]
fn test_weekly_and_monthly_partition_fridays() {
    let calc = ScheduleCalculator::default();
    let weekly = JobDescriptor::new("w", "W", RecurrenceRule::WeeklyExcludeLast);
    let monthly = JobDescriptor::new("m", "M", RecurrenceRule::MonthlyLastWeekday);
    let now = ist_time(2025, 1, 1, 0, 0);

    let mut all: Vec<_> = calc.upcoming(&weekly, now, 40);
    let monthly_runs = calc.upcoming(&monthly, now, 10);
    for run in &monthly_runs {
        assert!(!all.contains(run), "{run} produced by both rules");
        let date = run.date_naive();
        assert_eq!(
            date,
            last_weekday_of_month(date.year(), date.month(), Weekday::Fri).unwrap()
        );
    }
    all.extend(monthly_runs);
    assert!(all.iter().all(|r| r.weekday() == Weekday::Fri));
}

#[test]
fn test_countdown_rendering() {
    assert_eq!(
        format_countdown(chrono::Duration::minutes(2 * 1440 + 3 * 60 + 15)),
        "in 2 days 3 hours"
    );
    assert_eq!(format_countdown(chrono::Duration::minutes(61)), "in 1 hour 1 minute");
    assert_eq!(format_countdown(chrono::Duration::seconds(-5)), "very soon");
}

#[tokio::test]
async fn test_history_keeps_most_recent_hundred() {
    let store = ResultStore::default();
    for i in 0..150i64 {
        let at = DateTime::from_timestamp(1_735_000_000 + i, 0).unwrap();
        store
            .record(
                &format!("job-{i}"),
                ExecutionResult::new(format!("job-{i}"), JobStatus::Success).at(at),
            )
            .await;
    }

    let history = store.history(1_000).await;
    assert_eq!(history.len(), 100);
    assert_eq!(history[0].result.job_id, "job-149");
    assert_eq!(history[99].result.job_id, "job-50");
    assert_eq!(store.all_latest().await.len(), 150);
}

#[tokio::test]
async fn test_summary_over_latest() {
    let store = ResultStore::default();
    store.record("a", ExecutionResult::new("a", JobStatus::Success)).await;
    store.record("b", ExecutionResult::new("b", JobStatus::Error)).await;
    store.record("c", ExecutionResult::new("c", JobStatus::Skipped)).await;
    // Overwrites a's earlier success.
    store.record("a", ExecutionResult::new("a", JobStatus::PartialSuccess)).await;

    let summary = store.summary().await;
    assert_eq!(summary.total, 3);
    assert_eq!(summary.success_count, 0);
    assert_eq!(summary.partial_count, 1);
    assert_eq!(summary.failed_count, 1);
    assert_eq!(summary.skipped_count, 1);
    assert_eq!(store.history(10).await.len(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_records_are_not_lost() {
    let store = Arc::new(ResultStore::default());
    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                let id = format!("job-{i}");
                store.record(&id, ExecutionResult::new(&id, JobStatus::Success)).await;
            })
        })
        .collect();
    futures::future::join_all(tasks).await;

    assert_eq!(store.all_latest().await.len(), 32);
    assert_eq!(store.history(100).await.len(), 32);
}

struct ReportRunner;

#[async_trait::async_trait]
impl JobRunner for ReportRunner {
    async fn run(&self, job: &JobDescriptor, forced: bool) -> Result<ExecutionResult> {
        if job.id == "monthly-report" {
            return Err(anyhow!("mail relay unavailable"));
        }
        Ok(ExecutionResult::new(&job.id, JobStatus::Success)
            .with_counter("reports_sent", 4)
            .forced(forced))
    }
}

#[tokio::test]
async fn test_run_now_through_configured_catalog() {
    let config = Config::default();
    let store = Arc::new(ResultStore::new(config.results.history_capacity));
    let dispatcher = Dispatcher::new(
        Arc::new(StaticCatalog::new(config.jobs.clone())),
        Arc::new(ReportRunner),
        store.clone(),
    );

    let ok = dispatcher.run_now("weekly-report").await.unwrap();
    assert_eq!(ok.status, JobStatus::Success);
    assert_eq!(ok.counter("reports_sent"), 4);
    assert!(ok.forced);

    let failed = dispatcher.run_now("monthly-report").await.unwrap();
    assert_eq!(failed.status, JobStatus::Error);
    assert!(failed.message.contains("mail relay unavailable"));

    assert!(dispatcher.run_now("missing").await.is_err());

    let summary = store.summary().await;
    assert_eq!(summary.total, 2);
    assert_eq!(summary.success_count, 1);
    assert_eq!(summary.failed_count, 1);
    assert!(summary.last_execution_time.is_some());
}

#[tokio::test]
async fn test_raw_results_are_sanitized() {
    let store = ResultStore::default();
    store
        .record_raw(
            "task-lifecycle",
            &serde_json::json!({
                "status": "bogus",
                "tasks_archived": 7,
                "details": ["archived 7", 3],
                "execution_time": "2025-01-31T16:20:00Z"
            }),
        )
        .await;

    let stored = store.latest("task-lifecycle").await.unwrap();
    assert_eq!(stored.status, JobStatus::Unknown);
    assert_eq!(stored.counter("tasks_archived"), 7);
    assert_eq!(stored.details, vec!["archived 7".to_string()]);
    assert_eq!(stored.execution_time, Some(ist_time(2025, 1, 31, 21, 50)));
    assert_eq!(store.summary().await.total, 1);
}
