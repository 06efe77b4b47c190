use log::{info, warn};

use crate::error::{Result, TimelineError};
use crate::registry::{BuildStep, Cause, Job, JobRegistry, QueueItem, Scheduler};

/// A way of continuing a pipeline by hand from an upstream build.
pub trait ManualTrigger: Send + Sync {
    fn id(&self) -> &'static str;

    /// Whether this strategy knows how to start `project` after `upstream`.
    fn accepts(&self, project: &Job, upstream: &Job) -> bool;

    /// The queue item that continues `upstream #upstream_build` into `project`.
    fn request(&self, project: &Job, upstream: &Job, upstream_build: u32, causes: &[Cause]) -> QueueItem;
}

fn upstream_cause(upstream: &Job, upstream_build: u32, causes: &[Cause]) -> Cause {
    Cause::Upstream {
        project: upstream.name.clone(),
        build: upstream_build,
        causes: causes.to_vec(),
    }
}

/// The upstream declares `project` as one of its downstream links.
pub struct DownstreamLinkTrigger;

impl ManualTrigger for DownstreamLinkTrigger {
    fn id(&self) -> &'static str {
        "downstream-link"
    }

    fn accepts(&self, project: &Job, upstream: &Job) -> bool {
        upstream.declared_downstream().any(|name| name == project.name)
    }

    fn request(&self, project: &Job, upstream: &Job, upstream_build: u32, causes: &[Cause]) -> QueueItem {
        QueueItem {
            job: project.name.clone(),
            causes: vec![
                upstream_cause(upstream, upstream_build, causes),
                Cause::User { user_id: None },
            ],
            parameters: Default::default(),
        }
    }
}

/// The upstream has a trigger build step naming `project`, either directly or
/// inside a conditional step.
///
/// Trigger steps pass the upstream build's parameters along.
pub struct TriggerStepTrigger;

impl TriggerStepTrigger {
    fn steps(job: &Job) -> impl Iterator<Item = &BuildStep> {
        job.build_steps.iter().chain(job.post_build_steps.iter())
    }
}

impl ManualTrigger for TriggerStepTrigger {
    fn id(&self) -> &'static str {
        "trigger-step"
    }

    fn accepts(&self, project: &Job, upstream: &Job) -> bool {
        Self::steps(upstream).any(|step| step.reachable_targets().contains(&project.name))
    }

    fn request(&self, project: &Job, upstream: &Job, upstream_build: u32, causes: &[Cause]) -> QueueItem {
        let parameters = upstream
            .builds
            .iter()
            .find(|b| b.number == upstream_build)
            .map(|b| b.parameters.clone())
            .unwrap_or_default();
        QueueItem {
            job: project.name.clone(),
            causes: vec![
                upstream_cause(upstream, upstream_build, causes),
                Cause::User { user_id: None },
            ],
            parameters,
        }
    }
}

/// Manual trigger strategies, consulted in registration order.
pub struct TriggerRegistry {
    triggers: Vec<Box<dyn ManualTrigger>>,
}

impl Default for TriggerRegistry {
    fn default() -> Self {
        Self {
            triggers: vec![Box::new(DownstreamLinkTrigger), Box::new(TriggerStepTrigger)],
        }
    }
}

impl TriggerRegistry {
    pub fn register(&mut self, trigger: Box<dyn ManualTrigger>) {
        self.triggers.push(trigger);
    }

    pub fn find(&self, project: &Job, upstream: &Job) -> Option<&dyn ManualTrigger> {
        self.triggers
            .iter()
            .find(|t| t.accepts(project, upstream))
            .map(AsRef::as_ref)
    }

    /// Work out the queue item for a manual build of `project` after
    /// `upstream #build_id`.
    ///
    /// # Errors
    ///
    /// Fails when either job is unknown, the caller may not build `project`,
    /// `build_id` is not a build of `upstream`, or no strategy links the two.
    pub fn plan_manual(
        &self,
        registry: &dyn JobRegistry,
        project: &str,
        upstream: &str,
        build_id: &str,
    ) -> Result<QueueItem> {
        let planned = self.plan(registry, project, upstream, build_id);
        if let Err(e) = &planned {
            warn!("{}: {e}", trigger_failure_message(project, upstream, build_id));
        }
        planned
    }

    fn plan(
        &self,
        registry: &dyn JobRegistry,
        project: &str,
        upstream: &str,
        build_id: &str,
    ) -> Result<QueueItem> {
        let project_job = find(registry, project)?;
        if !registry.has_build_permission(project_job) {
            return Err(TimelineError::Authorization {
                project: project.to_string(),
            });
        }
        let upstream_job = find(registry, upstream)?;
        let number = parse_build_id(build_id)?;
        let upstream_build =
            registry
                .build(upstream, number)
                .ok_or_else(|| TimelineError::BuildNotFound {
                    project: upstream.to_string(),
                    build_id: build_id.to_string(),
                })?;

        let trigger = self.find(project_job, upstream_job).ok_or_else(|| {
            TimelineError::TriggerNotFound {
                project: project.to_string(),
                upstream: upstream.to_string(),
                build_id: build_id.to_string(),
            }
        })?;

        info!(
            "Manual build of {project} after {upstream} #{number} via {}",
            trigger.id()
        );
        Ok(trigger.request(project_job, upstream_job, number, &upstream_build.causes))
    }
}

/// Plan a manual build and hand it to the scheduler.
///
/// # Errors
///
/// Fails as [`TriggerRegistry::plan_manual`] does, or when the scheduler
/// refuses the request.
pub fn trigger_manual<R>(
    registry: &mut R,
    triggers: &TriggerRegistry,
    project: &str,
    upstream: &str,
    build_id: &str,
) -> Result<()>
where
    R: JobRegistry + Scheduler,
{
    let item = triggers.plan_manual(&*registry, project, upstream, build_id)?;
    registry.schedule(item)
}

/// Queue item repeating `project #build_id` for the current user.
///
/// Keeps the original causes except user causes, adds a fresh user cause and
/// reuses the original parameters.
///
/// # Errors
///
/// Fails when the job is unknown, the caller may not build it, or the build
/// does not exist.
pub fn plan_rebuild(registry: &dyn JobRegistry, project: &str, build_id: &str) -> Result<QueueItem> {
    let job = find(registry, project)?;
    if !registry.has_build_permission(job) {
        return Err(TimelineError::Authorization {
            project: project.to_string(),
        });
    }
    let number = parse_build_id(build_id)?;
    let build = registry
        .build(project, number)
        .ok_or_else(|| TimelineError::BuildNotFound {
            project: project.to_string(),
            build_id: build_id.to_string(),
        })?;

    let mut causes: Vec<Cause> = build
        .causes
        .iter()
        .filter(|c| !matches!(c, Cause::User { .. }))
        .cloned()
        .collect();
    causes.push(Cause::User { user_id: None });

    info!("Rebuild of {project} #{number}");
    Ok(QueueItem {
        job: project.to_string(),
        causes,
        parameters: build.parameters.clone(),
    })
}

/// Plan a rebuild and hand it to the scheduler.
///
/// # Errors
///
/// Fails as [`plan_rebuild`] does, or when the scheduler refuses the request.
pub fn trigger_rebuild<R>(registry: &mut R, project: &str, build_id: &str) -> Result<()>
where
    R: JobRegistry + Scheduler,
{
    let item = plan_rebuild(&*registry, project, build_id)?;
    registry.schedule(item)
}

/// Human-readable failure for a manual trigger, with a hint when the project
/// name carries a folder prefix.
pub fn trigger_failure_message(project: &str, upstream: &str, build_id: &str) -> String {
    let mut message =
        format!("Could not trigger manual build {project} for upstream {upstream} id: {build_id}");
    if let Some((_, short)) = project.split_once('/') {
        message.push_str(&format!(". Did you mean to specify {short}?"));
    }
    message
}

fn find<'r>(registry: &'r dyn JobRegistry, name: &str) -> Result<&'r Job> {
    registry
        .find_job(name)
        .ok_or_else(|| TimelineError::UnresolvedJob {
            name: name.to_string(),
        })
}

fn parse_build_id(build_id: &str) -> Result<u32> {
    build_id
        .trim()
        .parse()
        .map_err(|_| TimelineError::InvalidBuildId(build_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::fixtures::{build, job, registry, triggered};
    use crate::registry::{BuildResult, SnapshotRegistry};

    fn manual_registry() -> SnapshotRegistry {
        let mut build_job = job("build", &[]);
        build_job.manual_downstream = vec!["deploy".to_string()];
        let mut anchor = build(7, BuildResult::Success, 0);
        anchor.parameters.insert("VERSION".to_string(), "1.2.0".to_string());
        build_job.builds = vec![anchor];

        let mut package = job("package", &[]);
        package.post_build_steps = vec![BuildStep::Trigger {
            projects: "publish, notify".to_string(),
        }];
        let mut package_build = triggered(3, BuildResult::Success, 1, "build", 7);
        package_build
            .parameters
            .insert("VERSION".to_string(), "1.2.0".to_string());
        package.builds = vec![package_build];

        let mut locked = job("locked", &[]);
        locked.buildable = false;

        registry(vec![
            build_job,
            job("deploy", &[]),
            package,
            job("publish", &[]),
            job("notify", &[]),
            locked,
        ])
    }

    mod manual_tests {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_downstream_link_strategy() {
            let registry = manual_registry();
            let item = TriggerRegistry::default()
                .plan_manual(&registry, "deploy", "build", "7")
                .unwrap();

            assert_eq!(item.job, "deploy");
            assert_eq!(
                item.causes,
                vec![
                    Cause::Upstream {
                        project: "build".to_string(),
                        build: 7,
                        causes: vec![Cause::User {
                            user_id: Some("alice".to_string())
                        }],
                    },
                    Cause::User { user_id: None },
                ]
            );
            assert!(item.parameters.is_empty());
        }

        #[test]
        fn test_trigger_step_strategy_passes_parameters() {
            let registry = manual_registry();
            let item = TriggerRegistry::default()
                .plan_manual(&registry, "notify", "package", "3")
                .unwrap();
            assert_eq!(item.parameters.get("VERSION").map(String::as_str), Some("1.2.0"));
            assert!(crate::pipeline::causes::caused_by(&item.causes, "build", 7));
        }

        #[test]
        fn test_no_strategy_is_named_error() {
            let registry = manual_registry();
            let err = TriggerRegistry::default()
                .plan_manual(&registry, "publish", "build", "7")
                .unwrap_err();
            assert!(matches!(err, TimelineError::TriggerNotFound { .. }));
            assert_eq!(
                err.to_string(),
                "Trigger not found for manual build publish for upstream build id: 7"
            );
        }

        #[test]
        fn test_conditional_trigger_step_strategy() {
            let mut up = job("up", &[]);
            up.post_build_steps = vec![BuildStep::Conditional {
                steps: vec![BuildStep::Trigger {
                    projects: "down".to_string(),
                }],
            }];
            up.builds = vec![build(1, BuildResult::Success, 0)];
            let registry = registry(vec![up, job("down", &[])]);

            let triggers = TriggerRegistry::default();
            let item = triggers.plan_manual(&registry, "down", "up", "1").unwrap();
            assert_eq!(item.job, "down");
            let (up, down) = (
                registry.find_job("up").unwrap(),
                registry.find_job("down").unwrap(),
            );
            assert_eq!(triggers.find(down, up).map(|t| t.id()), Some("trigger-step"));
        }

        #[test]
        fn test_permission_checked_before_strategy() {
            let registry = manual_registry();
            let err = TriggerRegistry::default()
                .plan_manual(&registry, "locked", "build", "7")
                .unwrap_err();
            assert!(matches!(err, TimelineError::Authorization { .. }));
        }

        #[test]
        fn test_bad_build_ids() {
            let registry = manual_registry();
            let triggers = TriggerRegistry::default();
            assert!(matches!(
                triggers.plan_manual(&registry, "deploy", "build", "seven"),
                Err(TimelineError::InvalidBuildId(_))
            ));
            assert!(matches!(
                triggers.plan_manual(&registry, "deploy", "build", "8"),
                Err(TimelineError::BuildNotFound { .. })
            ));
        }

        #[test]
        fn test_trigger_manual_schedules() {
            let mut registry = manual_registry();
            trigger_manual(&mut registry, &TriggerRegistry::default(), "deploy", "build", "7")
                .unwrap();
            let deploy = registry.find_job("deploy").unwrap();
            assert!(crate::pipeline::causes::is_queued_for(
                &registry,
                deploy,
                Some(("build", 7))
            ));
        }
    }

    mod rebuild_tests {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_rebuild_replaces_user_causes() {
            let registry = manual_registry();
            let item = plan_rebuild(&registry, "package", "3").unwrap();
            assert_eq!(
                item.causes,
                vec![Cause::upstream("build", 7), Cause::User { user_id: None }]
            );
            assert_eq!(item.parameters.get("VERSION").map(String::as_str), Some("1.2.0"));

            let item = plan_rebuild(&registry, "build", "7").unwrap();
            assert_eq!(item.causes, vec![Cause::User { user_id: None }]);
        }

        #[test]
        fn test_rebuild_requires_permission() {
            let registry = manual_registry();
            assert!(matches!(
                plan_rebuild(&registry, "locked", "1"),
                Err(TimelineError::Authorization { .. })
            ));
        }

        #[test]
        fn test_trigger_rebuild_schedules() {
            let mut registry = manual_registry();
            trigger_rebuild(&mut registry, "build", "7").unwrap();
            assert_eq!(registry.queue().len(), 1);
            assert_eq!(registry.queue()[0].job, "build");
        }
    }

    #[test]
    fn test_failure_message_folder_hint() {
        assert_eq!(
            trigger_failure_message("team/deploy", "build", "7"),
            "Could not trigger manual build team/deploy for upstream build id: 7. \
             Did you mean to specify deploy?"
        );
        assert_eq!(
            trigger_failure_message("deploy", "build", "7"),
            "Could not trigger manual build deploy for upstream build id: 7"
        );
    }
}
