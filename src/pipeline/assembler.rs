use indexmap::IndexMap;
use log::debug;

use super::causes::{attributed_builds, is_queued_for};
use super::model::{ManualStep, Pipeline, Stage, Status, Task};
use super::paging::{PageRequest, Pagination};
use crate::graph::JobGraph;
use crate::registry::{Build, Change, Job, JobRegistry};

/// Display switches that change how tasks are built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyOptions {
    pub allow_manual_triggers: bool,
    pub allow_rebuild: bool,
    pub show_total_build_time: bool,
}

/// Per-build pipelines for one page of the start job's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestPipelines {
    pub pipelines: Vec<Pipeline>,
    pub pagination: Option<Pagination>,
}

/// Turns a resolved job graph plus build history into pipelines.
///
/// Nothing is cached: every call walks the registry again and returns freshly
/// built values.
pub struct PipelineAssembler<'a, 'r> {
    registry: &'r dyn JobRegistry,
    graph: &'a JobGraph<'r>,
    name: &'a str,
    options: AssemblyOptions,
}

impl<'a, 'r> PipelineAssembler<'a, 'r> {
    pub fn new(
        registry: &'r dyn JobRegistry,
        graph: &'a JobGraph<'r>,
        name: &'a str,
        options: AssemblyOptions,
    ) -> Self {
        Self {
            registry,
            graph,
            name,
            options,
        }
    }

    /// One pipeline per recent build of the start job, newest first.
    ///
    /// With paging enabled the window is `count` builds on the requested page,
    /// and pages never reach past `max_pages * count` builds. A start job that
    /// has never run yields a single placeholder pipeline.
    pub fn build_latest(
        &self,
        count: usize,
        paging: PageRequest,
        include_changes: bool,
    ) -> LatestPipelines {
        let Some(start) = self.graph.start() else {
            return LatestPipelines {
                pipelines: Vec::new(),
                pagination: None,
            };
        };

        let pagination = paging.enabled.then(|| {
            let history = self.registry.recent_builds(start, usize::MAX).len();
            Pagination::new(history, count, paging.max_pages, paging.page)
        });
        let offset = pagination.map_or(0, |p| p.offset());

        let anchors: Vec<&Build> = self
            .registry
            .recent_builds(start, offset + count)
            .into_iter()
            .skip(offset)
            .collect();

        let pipelines = if anchors.is_empty() && offset == 0 && count > 0 {
            vec![self.placeholder()]
        } else {
            anchors
                .into_iter()
                .map(|anchor| self.for_build(start, anchor, include_changes))
                .collect()
        };

        debug!(
            "Assembled {} pipelines for {} (offset {offset})",
            pipelines.len(),
            self.name
        );

        LatestPipelines {
            pipelines,
            pagination,
        }
    }

    /// The latest build of every stage, regardless of what triggered it.
    pub fn build_aggregated(&self, include_changes: bool) -> Pipeline {
        let latest: IndexMap<&str, Vec<&Build>> = self
            .graph
            .jobs()
            .map(|job| {
                (
                    job.name.as_str(),
                    self.registry.recent_builds(job, 1),
                )
            })
            .collect();

        let stages = self
            .graph
            .jobs()
            .map(|job| self.stage(job, &latest, None, include_changes))
            .collect();

        let start_build = self
            .graph
            .start()
            .and_then(|start| latest.get(start.name.as_str()))
            .and_then(|builds| builds.first());

        let changes = if include_changes {
            merge_changes(latest.values().flatten().copied())
        } else {
            Vec::new()
        };

        self.finish(Pipeline {
            name: self.name.to_string(),
            version: start_build.map(|b| b.display_name()),
            aggregated: true,
            triggered_by: Vec::new(),
            timestamp: start_build.map(|b| b.timestamp),
            total_build_time_ms: None,
            changes,
            stages,
        })
    }

    fn for_build(&self, start: &Job, anchor: &'r Build, include_changes: bool) -> Pipeline {
        let attributed: IndexMap<&str, Vec<&Build>> = self
            .graph
            .jobs()
            .map(|job| {
                let builds = if job.name == start.name {
                    vec![anchor]
                } else {
                    attributed_builds(self.registry, job, &start.name, anchor.number)
                };
                (job.name.as_str(), builds)
            })
            .collect();

        let stages = self
            .graph
            .jobs()
            .map(|job| {
                self.stage(
                    job,
                    &attributed,
                    Some((start.name.as_str(), anchor.number)),
                    false,
                )
            })
            .collect();

        self.finish(Pipeline {
            name: self.name.to_string(),
            version: Some(anchor.display_name()),
            aggregated: false,
            triggered_by: anchor.causes.iter().map(|c| c.description()).collect(),
            timestamp: Some(anchor.timestamp),
            total_build_time_ms: None,
            changes: if include_changes {
                anchor.changes.clone()
            } else {
                Vec::new()
            },
            stages,
        })
    }

    fn placeholder(&self) -> Pipeline {
        let empty = IndexMap::new();
        let stages = self
            .graph
            .jobs()
            .map(|job| self.stage(job, &empty, None, false))
            .collect();

        Pipeline {
            name: self.name.to_string(),
            version: None,
            aggregated: false,
            triggered_by: Vec::new(),
            timestamp: None,
            total_build_time_ms: None,
            changes: Vec::new(),
            stages,
        }
    }

    fn finish(&self, mut pipeline: Pipeline) -> Pipeline {
        if self.options.show_total_build_time {
            pipeline.total_build_time_ms = Some(
                pipeline
                    .tasks()
                    .filter(|t| t.build_number.is_some())
                    .map(|t| t.duration_ms)
                    .sum(),
            );
        }
        pipeline
    }

    fn stage(
        &self,
        job: &Job,
        builds: &IndexMap<&str, Vec<&Build>>,
        anchor: Option<(&str, u32)>,
        include_changes: bool,
    ) -> Stage {
        let job_builds = builds.get(job.name.as_str()).map_or(&[][..], Vec::as_slice);

        let tasks = if job_builds.is_empty() {
            vec![self.pending_task(job, builds, anchor)]
        } else {
            job_builds
                .iter()
                .map(|build| self.task(job, build, include_changes))
                .collect()
        };

        Stage {
            name: job.display_name().to_string(),
            job: job.name.clone(),
            url: job.url.clone(),
            tasks,
            downstream: self
                .graph
                .successors(&job.name)
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    fn task(&self, job: &Job, build: &Build, include_changes: bool) -> Task {
        let status = Status::of(build);
        Task {
            id: job.name.clone(),
            name: job.display_name().to_string(),
            link: format!("{}{}/", job.url, build.number),
            build_number: Some(build.number),
            status,
            timestamp: Some(build.timestamp),
            duration_ms: build.duration_ms,
            manual: None,
            rebuildable: self.options.allow_rebuild
                && status.is_finished()
                && self.registry.has_build_permission(job),
            changes: if include_changes {
                build.changes.clone()
            } else {
                Vec::new()
            },
        }
    }

    fn pending_task(
        &self,
        job: &Job,
        builds: &IndexMap<&str, Vec<&Build>>,
        anchor: Option<(&str, u32)>,
    ) -> Task {
        let status = if job.disabled {
            Status::Disabled
        } else if is_queued_for(self.registry, job, anchor) {
            Status::Queued
        } else {
            Status::Idle
        };

        Task {
            id: job.name.clone(),
            name: job.display_name().to_string(),
            link: job.url.clone(),
            build_number: None,
            status,
            timestamp: None,
            duration_ms: 0,
            manual: self.manual_step(job, builds, status),
            rebuildable: false,
            changes: Vec::new(),
        }
    }

    /// Manual step for a job its upstream only triggers by hand.
    ///
    /// Enabled once the upstream build of the same pipeline succeeded.
    fn manual_step(
        &self,
        job: &Job,
        builds: &IndexMap<&str, Vec<&Build>>,
        status: Status,
    ) -> Option<ManualStep> {
        let upstream = self
            .graph
            .predecessors(&job.name)
            .into_iter()
            .find(|upstream| upstream.is_manual_downstream(&job.name))?;

        let upstream_build = builds
            .get(upstream.name.as_str())
            .and_then(|b| b.first())
            .copied();
        let upstream_ok = upstream_build.is_some_and(|b| Status::of(b) == Status::Succeeded);
        let permission = self.registry.has_build_permission(job);

        Some(ManualStep {
            upstream_project: upstream.name.clone(),
            upstream_id: upstream_build.map(|b| b.number.to_string()),
            enabled: self.options.allow_manual_triggers
                && upstream_ok
                && status == Status::Idle
                && permission,
            permission,
        })
    }
}

/// Union of the builds' changes, first occurrence of each commit kept.
fn merge_changes<'b>(builds: impl Iterator<Item = &'b Build>) -> Vec<Change> {
    let mut changes: Vec<Change> = Vec::new();
    for change in builds.flat_map(|b| b.changes.iter()) {
        if !changes.iter().any(|c| c.commit_id == change.commit_id) {
            changes.push(change.clone());
        }
    }
    changes
}
