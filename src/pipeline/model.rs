use chrono::{DateTime, Utc};
use serde::Serialize;

use super::paging::Pagination;
use crate::registry::{Build, BuildResult, Change};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Idle,
    Queued,
    Running,
    Succeeded,
    Failed,
    Unstable,
    Cancelled,
    Disabled,
}

impl Status {
    pub fn of(build: &Build) -> Self {
        if build.building {
            return Self::Running;
        }
        match build.result {
            Some(BuildResult::Success) => Self::Succeeded,
            Some(BuildResult::Failure) => Self::Failed,
            Some(BuildResult::Unstable) => Self::Unstable,
            Some(BuildResult::Aborted) => Self::Cancelled,
            Some(BuildResult::NotBuilt) | None => Self::Idle,
        }
    }

    pub fn is_failed(self) -> bool {
        self == Self::Failed
    }

    pub fn is_finished(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Unstable | Self::Cancelled
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Unstable => "unstable",
            Self::Cancelled => "cancelled",
            Self::Disabled => "disabled",
        }
    }
}

/// A pending manual trigger between a task and its upstream job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ManualStep {
    pub upstream_project: String,
    /// Build of the upstream job this trigger would continue from
    pub upstream_id: Option<String>,
    pub enabled: bool,
    pub permission: bool,
}

/// One build attempt of a stage, or the placeholder for one not yet run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Task {
    pub id: String,
    pub name: String,
    pub link: String,
    pub build_number: Option<u32>,
    pub status: Status,
    pub timestamp: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual: Option<ManualStep>,
    pub rebuildable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Stage {
    pub name: String,
    pub job: String,
    pub url: String,
    pub tasks: Vec<Task>,
    /// Names of the jobs this stage leads to
    pub downstream: Vec<String>,
}

/// One run of a component, or the aggregated latest state of every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Pipeline {
    pub name: String,
    /// Display name of the anchor build, `None` when nothing has run yet
    pub version: Option<String>,
    pub aggregated: bool,
    pub triggered_by: Vec<String>,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_build_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<Change>,
    pub stages: Vec<Stage>,
}

impl Pipeline {
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.stages.iter().flat_map(|s| s.tasks.iter())
    }

    pub fn has_failed_task(&self) -> bool {
        self.tasks().any(|t| t.status.is_failed())
    }

    /// Most recent task start time in this pipeline.
    pub fn latest_activity(&self) -> Option<DateTime<Utc>> {
        self.tasks().filter_map(|t| t.timestamp).max()
    }
}

/// A named group of pipelines sharing one start job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Component {
    pub name: String,
    /// 1-based position among the components its configuration entry produced
    pub number: usize,
    pub first_job: String,
    pub first_job_url: String,
    pub first_job_parameterized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    pub pipelines: Vec<Pipeline>,
}

impl Component {
    pub fn first_pipeline(&self) -> Option<&Pipeline> {
        self.pipelines.first()
    }
}
