//! Job enumeration.

use super::JobDescriptor;

/// Source of the jobs the dashboard knows about.
pub trait JobCatalog: Send + Sync {
    /// All jobs, in display order.
    fn jobs(&self) -> Vec<JobDescriptor>;

    /// A single job by id.
    fn job(&self, id: &str) -> Option<JobDescriptor> {
        self.jobs().into_iter().find(|j| j.id == id)
    }
}

/// A fixed list of jobs, typically loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    jobs: Vec<JobDescriptor>,
}

impl StaticCatalog {
    pub fn new(jobs: Vec<JobDescriptor>) -> Self {
        Self { jobs }
    }
}

impl JobCatalog for StaticCatalog {
    fn jobs(&self) -> Vec<JobDescriptor> {
        self.jobs.clone()
    }

    fn job(&self, id: &str) -> Option<JobDescriptor> {
        self.jobs.iter().find(|j| j.id == id).cloned()
    }
}
