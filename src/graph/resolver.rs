use std::collections::HashSet;

use log::debug;

use crate::registry::{BuildStep, Job, JobRegistry};

/// A strategy for discovering the jobs directly downstream of a job.
///
/// Implementations must be pure: the same job and registry state always give
/// the same ordered answer, and nothing is mutated.
pub trait EdgeResolver: Send + Sync {
    fn id(&self) -> &'static str;

    fn resolve<'r>(&self, job: &Job, registry: &'r dyn JobRegistry) -> Vec<&'r Job>;

    /// Whether this resolver reports the job's own declared links. Those are
    /// listed after every automation-discovered job.
    fn declared(&self) -> bool {
        false
    }
}

/// Top-level "trigger builds on other projects" build steps.
pub struct TriggerStepResolver;

impl EdgeResolver for TriggerStepResolver {
    fn id(&self) -> &'static str {
        "trigger-steps"
    }

    fn resolve<'r>(&self, job: &Job, registry: &'r dyn JobRegistry) -> Vec<&'r Job> {
        job.build_steps
            .iter()
            .flat_map(BuildStep::trigger_targets)
            .filter_map(|name| find_exact(registry, &name))
            .collect()
    }
}

/// Trigger steps wrapped inside conditional build steps.
pub struct ConditionalStepResolver;

impl EdgeResolver for ConditionalStepResolver {
    fn id(&self) -> &'static str {
        "conditional-steps"
    }

    fn resolve<'r>(&self, job: &Job, registry: &'r dyn JobRegistry) -> Vec<&'r Job> {
        job.build_steps
            .iter()
            .filter_map(|step| match step {
                BuildStep::Conditional { steps } => Some(steps),
                _ => None,
            })
            .flatten()
            .flat_map(BuildStep::trigger_targets)
            .filter_map(|name| find_exact(registry, &name))
            .collect()
    }
}

/// The job's own declared downstream links.
pub struct DownstreamLinkResolver;

impl EdgeResolver for DownstreamLinkResolver {
    fn id(&self) -> &'static str {
        "downstream-links"
    }

    fn resolve<'r>(&self, job: &Job, registry: &'r dyn JobRegistry) -> Vec<&'r Job> {
        registry.downstream_links(job)
    }

    fn declared(&self) -> bool {
        true
    }
}

fn find_exact<'r>(registry: &'r dyn JobRegistry, name: &str) -> Option<&'r Job> {
    registry.find_job(name).filter(|job| job.name == name)
}

/// Jobs triggered from post-build automation: plain trigger steps and trigger
/// steps nested one level inside conditional steps.
fn post_build_targets<'r>(job: &Job, registry: &'r dyn JobRegistry) -> Vec<&'r Job> {
    job.post_build_steps
        .iter()
        .flat_map(BuildStep::reachable_targets)
        .filter_map(|name| find_exact(registry, &name))
        .collect()
}

/// Ordered set of edge resolvers consulted for every job.
pub struct ResolverChain {
    resolvers: Vec<Box<dyn EdgeResolver>>,
}

impl Default for ResolverChain {
    fn default() -> Self {
        Self {
            resolvers: vec![
                Box::new(TriggerStepResolver),
                Box::new(ConditionalStepResolver),
                Box::new(DownstreamLinkResolver),
            ],
        }
    }
}

impl ResolverChain {
    pub fn empty() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    pub fn register(&mut self, resolver: Box<dyn EdgeResolver>) {
        self.resolvers.push(resolver);
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.id()).collect()
    }

    /// Direct downstream jobs of `job`, de-duplicated in first-seen order.
    ///
    /// Results of the automation resolvers come first in registration order,
    /// then post-build automation targets, then the declared links.
    pub fn downstream_of<'r>(&self, job: &Job, registry: &'r dyn JobRegistry) -> Vec<&'r Job> {
        let (declared, automation): (Vec<_>, Vec<_>) =
            self.resolvers.iter().partition(|resolver| resolver.declared());

        let mut merged: Vec<&'r Job> = automation
            .iter()
            .flat_map(|resolver| resolver.resolve(job, registry))
            .collect();
        merged.extend(post_build_targets(job, registry));
        merged.extend(
            declared
                .iter()
                .flat_map(|resolver| resolver.resolve(job, registry)),
        );

        let mut seen = HashSet::new();
        merged.retain(|j| seen.insert(j.name.clone()));

        debug!(
            "{} -> [{}]",
            job.name,
            merged
                .iter()
                .map(|j| j.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        merged
    }
}
