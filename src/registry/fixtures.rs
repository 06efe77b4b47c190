//! Shared builders for registry-backed tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::{Build, BuildResult, Cause, Job, QueueItem, SnapshotRegistry};

pub fn at_minute(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + Duration::minutes(minute)
}

pub fn job(name: &str, downstream: &[&str]) -> Job {
    let mut job = Job::new(name);
    job.downstream = downstream.iter().map(|d| (*d).to_string()).collect();
    job
}

pub fn build(number: u32, result: BuildResult, minute: i64) -> Build {
    Build {
        number,
        display_name: None,
        timestamp: at_minute(minute),
        duration_ms: 60_000,
        building: false,
        result: Some(result),
        parameters: Default::default(),
        causes: vec![Cause::User {
            user_id: Some("alice".to_string()),
        }],
        changes: vec![],
    }
}

pub fn running(number: u32, minute: i64) -> Build {
    Build {
        building: true,
        result: None,
        ..build(number, BuildResult::Success, minute)
    }
}

/// A build started by `upstream #upstream_build`.
pub fn triggered(
    number: u32,
    result: BuildResult,
    minute: i64,
    upstream: &str,
    upstream_build: u32,
) -> Build {
    Build {
        causes: vec![Cause::upstream(upstream, upstream_build)],
        ..build(number, result, minute)
    }
}

pub fn queued(job: &str, upstream: &str, upstream_build: u32) -> QueueItem {
    QueueItem {
        job: job.to_string(),
        causes: vec![Cause::upstream(upstream, upstream_build)],
        parameters: Default::default(),
    }
}

pub fn registry(jobs: Vec<Job>) -> SnapshotRegistry {
    SnapshotRegistry::new(jobs, vec![])
}
