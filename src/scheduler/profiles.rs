//! Default job profiles used when no jobs are configured.

use super::{JobDescriptor, RecurrenceRule};

/// Return the default out-of-box jobs.
pub fn defaults() -> Vec<JobDescriptor> {
    vec![
        JobDescriptor::new(
            "weekly-report",
            "Weekly progress report",
            RecurrenceRule::WeeklyExcludeLast,
        ),
        JobDescriptor::new(
            "monthly-report",
            "Monthly progress report",
            RecurrenceRule::MonthlyLastWeekday,
        ),
        JobDescriptor::new(
            "task-lifecycle",
            "Task archive and cleanup",
            RecurrenceRule::Unspecified,
        ),
    ]
}
