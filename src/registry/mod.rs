mod snapshot;
mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use snapshot::SnapshotRegistry;
pub use types::{Build, BuildResult, BuildStep, Cause, Change, Job, QueueItem};

use crate::error::Result;

/// Read access to the host's jobs, builds and build queue.
///
/// The engine never mutates the registry; every read re-derives its view from
/// whatever the registry returns at that moment.
pub trait JobRegistry {
    fn find_job(&self, name: &str) -> Option<&Job>;

    fn all_jobs(&self) -> Vec<&Job>;

    /// Items currently waiting in the scheduler queue for `job`.
    fn queue_items(&self, job: &Job) -> Vec<&QueueItem>;

    fn is_queued(&self, job: &Job) -> bool {
        !self.queue_items(job).is_empty()
    }

    /// Jobs declared as downstream of `job`, automatic links first, then manual ones.
    fn downstream_links(&self, job: &Job) -> Vec<&Job> {
        job.declared_downstream()
            .filter_map(|name| self.find_job(name))
            .collect()
    }

    /// Jobs that declare `job` as one of their downstream links.
    fn upstream_links(&self, job: &Job) -> Vec<&Job> {
        self.all_jobs()
            .into_iter()
            .filter(|candidate| candidate.declared_downstream().any(|n| n == job.name))
            .collect()
    }

    /// Up to `limit` builds of `job`, newest first.
    fn recent_builds<'a>(&self, job: &'a Job, limit: usize) -> Vec<&'a Build> {
        let mut builds: Vec<&Build> = job.builds.iter().collect();
        builds.sort_by(|a, b| b.number.cmp(&a.number));
        builds.truncate(limit);
        builds
    }

    fn build(&self, job_name: &str, number: u32) -> Option<&Build> {
        self.find_job(job_name)?
            .builds
            .iter()
            .find(|b| b.number == number)
    }

    fn has_build_permission(&self, job: &Job) -> bool {
        job.buildable
    }
}

/// Write access to the host scheduler, used only by manual triggers and rebuilds.
pub trait Scheduler {
    /// Enqueue a build request. Fire-and-forget: completion is never tracked.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler refuses the request.
    fn schedule(&mut self, item: QueueItem) -> Result<()>;
}
