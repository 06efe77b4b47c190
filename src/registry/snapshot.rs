use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::types::{Job, QueueItem};
use super::{JobRegistry, Scheduler};
use crate::config::{parse_by_extension, render_by_extension};
use crate::error::TimelineError;

/// Job registry backed by a snapshot file.
///
/// Stands in for a live CI host: the snapshot lists every job with its build
/// history plus the pending queue. Scheduling appends to the queue, and the
/// caller decides whether to persist the result with [`SnapshotRegistry::save`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SnapshotRegistry {
    #[serde(default)]
    jobs: Vec<Job>,
    #[serde(default)]
    queue: Vec<QueueItem>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl SnapshotRegistry {
    pub fn new(jobs: Vec<Job>, queue: Vec<QueueItem>) -> Self {
        let mut registry = Self {
            jobs,
            queue,
            index: HashMap::new(),
        };
        registry.reindex();
        registry
    }

    fn reindex(&mut self) {
        self.index = self
            .jobs
            .iter()
            .enumerate()
            .map(|(i, job)| (job.name.clone(), i))
            .collect();
    }

    /// Load a snapshot from a TOML, JSON or YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry snapshot: {}", path.display()))?;

        let snapshot: Self = parse_by_extension(path, &contents)
            .with_context(|| format!("Failed to parse registry snapshot: {}", path.display()))?;

        info!(
            "Loaded {} jobs and {} queue items from {}",
            snapshot.jobs.len(),
            snapshot.queue.len(),
            path.display()
        );

        Ok(Self::new(snapshot.jobs, snapshot.queue))
    }

    /// Write the snapshot back, format chosen by file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = render_by_extension(path, self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write registry snapshot: {}", path.display()))?;
        Ok(())
    }

    pub fn queue(&self) -> &[QueueItem] {
        &self.queue
    }
}

impl JobRegistry for SnapshotRegistry {
    fn find_job(&self, name: &str) -> Option<&Job> {
        self.index.get(name).and_then(|&i| self.jobs.get(i))
    }

    fn all_jobs(&self) -> Vec<&Job> {
        self.jobs.iter().collect()
    }

    fn queue_items(&self, job: &Job) -> Vec<&QueueItem> {
        self.queue.iter().filter(|item| item.job == job.name).collect()
    }
}

impl Scheduler for SnapshotRegistry {
    fn schedule(&mut self, item: QueueItem) -> crate::error::Result<()> {
        if !self.index.contains_key(&item.job) {
            return Err(TimelineError::UnresolvedJob { name: item.job });
        }
        debug!("Queued build of {} ({} causes)", item.job, item.causes.len());
        self.queue.push(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Build, BuildResult, Cause};
    use chrono::{TimeZone, Utc};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn build(number: u32) -> Build {
        Build {
            number,
            display_name: None,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            duration_ms: 1_000,
            building: false,
            result: Some(BuildResult::Success),
            parameters: Default::default(),
            causes: vec![],
            changes: vec![],
        }
    }

    #[test]
    fn test_recent_builds_newest_first_and_limited() {
        let mut job = Job::new("build");
        job.builds = vec![build(1), build(3), build(2)];
        let registry = SnapshotRegistry::new(vec![job], vec![]);

        let job = registry.find_job("build").unwrap();
        let numbers: Vec<u32> = registry
            .recent_builds(job, 2)
            .iter()
            .map(|b| b.number)
            .collect();
        assert_eq!(numbers, vec![3, 2]);
    }

    #[test]
    fn test_upstream_links_follow_declared_downstream() {
        let mut build_job = Job::new("build");
        build_job.downstream = vec!["test".to_string()];
        let mut lint = Job::new("lint");
        lint.manual_downstream = vec!["test".to_string()];
        let registry = SnapshotRegistry::new(vec![build_job, lint, Job::new("test")], vec![]);

        let test = registry.find_job("test").unwrap();
        let upstream: Vec<&str> = registry
            .upstream_links(test)
            .iter()
            .map(|j| j.name.as_str())
            .collect();
        assert_eq!(upstream, vec!["build", "lint"]);
    }

    #[test]
    fn test_schedule_appends_queue_item() {
        let mut registry = SnapshotRegistry::new(vec![Job::new("deploy")], vec![]);
        registry
            .schedule(QueueItem {
                job: "deploy".to_string(),
                causes: vec![Cause::upstream("build", 7)],
                parameters: Default::default(),
            })
            .unwrap();

        let deploy = registry.find_job("deploy").unwrap();
        assert!(registry.is_queued(deploy));
        assert_eq!(registry.queue().len(), 1);
    }

    #[test]
    fn test_schedule_unknown_job_fails() {
        let mut registry = SnapshotRegistry::default();
        let result = registry.schedule(QueueItem {
            job: "ghost".to_string(),
            causes: vec![],
            parameters: Default::default(),
        });
        assert!(matches!(result, Err(TimelineError::UnresolvedJob { .. })));
    }

    #[test]
    fn test_load_yaml_snapshot() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        let yaml = r"
jobs:
  - name: build
    downstream: [test]
    builds:
      - number: 1
        timestamp: 2024-05-01T10:00:00Z
        duration-ms: 5000
        result: success
        causes:
          - type: user
            user-id: alice
  - name: test
    post-build-steps:
      - type: conditional
        steps:
          - type: trigger
            projects: deploy
  - name: deploy
queue:
  - job: test
    causes:
      - type: upstream
        project: build
        build: 1
";
        write!(temp_file, "{yaml}").unwrap();

        let registry = SnapshotRegistry::load(temp_file.path()).unwrap();
        assert_eq!(registry.all_jobs().len(), 3);
        let build_job = registry.find_job("build").unwrap();
        assert_eq!(build_job.builds[0].duration_ms, 5000);
        assert!(registry.is_queued(registry.find_job("test").unwrap()));
        assert!(registry.build("build", 1).is_some());
        assert!(registry.build("build", 2).is_none());
    }

    #[test]
    fn test_save_and_reload_json() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("registry.json");

        let mut job = Job::new("build");
        job.builds = vec![build(4)];
        let registry = SnapshotRegistry::new(vec![job], vec![]);
        registry.save(&path).unwrap();

        let reloaded = SnapshotRegistry::load(&path).unwrap();
        assert!(reloaded.build("build", 4).is_some());
    }
}
