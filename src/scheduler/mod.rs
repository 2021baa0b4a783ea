//! Recurring-schedule computation and job execution plumbing.
//!
//! The scheduler does not fire jobs on its own. It answers "when does this
//! job run next" for the dashboard's calendar-anchored rules, and provides the
//! [`Dispatcher::run_now`] path an operator uses to trigger a job by hand.

pub mod calendar;
pub mod catalog;
pub mod countdown;
pub mod engine;
pub mod history;
pub mod profiles;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export common types
pub use self::calendar::{last_weekday_of_month, ScheduleCalculator};
pub use self::catalog::{JobCatalog, StaticCatalog};
pub use self::countdown::format_countdown;
pub use self::engine::{CommandRunner, Dispatcher, JobError, JobRunner};
pub use self::history::{ExecutionResult, HistoryEntry, JobStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid month {month} in year {year}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("invalid time of day {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },

    #[error("unknown weekday '{0}'")]
    UnknownWeekday(String),
}

/// How a job's next fire time is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecurrenceRule {
    /// Every target weekday, except the last one of each month.
    WeeklyExcludeLast,
    /// The last target weekday of each month.
    MonthlyLastWeekday,
    /// No calendar rule; the descriptor's own `next_run` is shown instead.
    Unspecified,
}

impl std::fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecurrenceRule::WeeklyExcludeLast => "weekly-exclude-last",
            RecurrenceRule::MonthlyLastWeekday => "monthly-last-weekday",
            RecurrenceRule::Unspecified => "unspecified",
        };
        write!(f, "{s}")
    }
}

/// A job as enumerated by the job catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default = "default_rule")]
    pub rule: RecurrenceRule,
    /// Externally supplied next run, used only for [`RecurrenceRule::Unspecified`].
    #[serde(default)]
    pub next_run: Option<DateTime<Utc>>,
    /// Program and arguments executed by [`CommandRunner`].
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

fn default_active() -> bool {
    true
}

fn default_rule() -> RecurrenceRule {
    RecurrenceRule::Unspecified
}

impl JobDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, rule: RecurrenceRule) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            active: true,
            rule,
            next_run: None,
            command: None,
        }
    }

    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = Some(command);
        self
    }

    pub fn with_next_run(mut self, next_run: DateTime<Utc>) -> Self {
        self.next_run = Some(next_run);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}
