use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{ComponentSpec, Config, ViewConfig};
use crate::discovery::match_components;
use crate::error::{Result, TimelineError};
use crate::graph::{GraphResolver, JobGraph, ResolverChain};
use crate::pipeline::{
    trim_components, AssemblyOptions, Component, PageRequest, PipelineAssembler,
};
use crate::registry::{Job, JobRegistry};
use crate::sort::ComparatorRegistry;
use crate::trigger::TriggerRegistry;

/// How one read of the view should page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    /// 1-based page of build history
    pub page: usize,
    /// Full-screen displays never page
    pub full_screen: bool,
}

impl Default for ReadRequest {
    fn default() -> Self {
        Self {
            page: 1,
            full_screen: false,
        }
    }
}

/// Outcome of one read: the components to show, or the error that emptied them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ViewResult {
    pub components: Vec<Component>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// A configured pipeline view and the strategies it resolves with.
pub struct TimelineView {
    config: Config,
    chain: ResolverChain,
    comparators: ComparatorRegistry,
    triggers: TriggerRegistry,
}

impl TimelineView {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            chain: ResolverChain::default(),
            comparators: ComparatorRegistry::default(),
            triggers: TriggerRegistry::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> &ViewConfig {
        &self.config.view
    }

    pub fn chain_mut(&mut self) -> &mut ResolverChain {
        &mut self.chain
    }

    pub fn comparators(&self) -> &ComparatorRegistry {
        &self.comparators
    }

    pub fn comparators_mut(&mut self) -> &mut ComparatorRegistry {
        &mut self.comparators
    }

    pub fn triggers(&self) -> &TriggerRegistry {
        &self.triggers
    }

    pub fn triggers_mut(&mut self) -> &mut TriggerRegistry {
        &mut self.triggers
    }

    /// Resolve, assemble, sort and trim every configured component.
    ///
    /// A component whose first or last job is missing empties the whole
    /// result; the error message is kept for display instead.
    pub fn components(&self, registry: &dyn JobRegistry, request: ReadRequest) -> ViewResult {
        let last_updated = Utc::now();
        match self.try_components(registry, request) {
            Ok(components) => {
                info!("Read {} components", components.len());
                ViewResult {
                    components,
                    error: None,
                    last_updated,
                }
            }
            Err(e) => {
                warn!("Pipeline read failed: {e}");
                ViewResult {
                    components: Vec::new(),
                    error: Some(e.to_string()),
                    last_updated,
                }
            }
        }
    }

    fn try_components(
        &self,
        registry: &dyn JobRegistry,
        request: ReadRequest,
    ) -> Result<Vec<Component>> {
        let mut components = Vec::new();

        for (i, spec) in self.config.components.iter().enumerate() {
            let (first, last) = resolve_spec(registry, spec)?;
            components.push(self.component(registry, &spec.name, first, last, i + 1, request));
        }

        for spec in &self.config.regex_components {
            for (i, (name, first)) in regex_matches(registry, &spec.regexp).into_iter().enumerate() {
                components.push(self.component(registry, &name, first, None, i + 1, request));
            }
        }

        self.comparators
            .sort(&mut components, &self.config.view.sorting);
        trim_components(&mut components, self.config.view.visible_limit());

        Ok(components)
    }

    fn component<'r>(
        &self,
        registry: &'r dyn JobRegistry,
        name: &str,
        first: &'r Job,
        last: Option<&'r Job>,
        number: usize,
        request: ReadRequest,
    ) -> Component {
        let settings = &self.config.view;
        let graph = GraphResolver::new(&self.chain).resolve(registry, Some(first), last);
        let assembler = PipelineAssembler::new(
            registry,
            &graph,
            name,
            AssemblyOptions {
                allow_manual_triggers: settings.allow_manual_triggers,
                allow_rebuild: settings.allow_rebuild,
                show_total_build_time: settings.show_total_build_time,
            },
        );

        let mut pipelines = Vec::new();
        if settings.show_aggregated {
            pipelines.push(assembler.build_aggregated(settings.show_aggregated_changes));
        }

        let paging = PageRequest {
            enabled: settings.paging_enabled && !request.full_screen,
            page: request.page,
            max_pages: settings.max_pages,
        };
        let latest = assembler.build_latest(settings.pipeline_count, paging, settings.show_changes);
        pipelines.extend(latest.pipelines);

        debug!("Component {name} has {} pipelines", pipelines.len());
        Component {
            name: name.to_string(),
            number,
            first_job: first.name.clone(),
            first_job_url: first.url.clone(),
            first_job_parameterized: first.parameterized,
            pagination: latest.pagination,
            pipelines,
        }
    }

    /// Every job this view shows: each component's reachable jobs plus every
    /// regex match. Components whose first job is missing contribute nothing.
    pub fn items<'r>(&self, registry: &'r dyn JobRegistry) -> Vec<&'r Job> {
        let mut items: IndexMap<&str, &'r Job> = IndexMap::new();

        for spec in &self.config.components {
            let first = registry.find_job(&spec.first_job);
            let last = spec.end_job().and_then(|n| registry.find_job(n));
            let graph: JobGraph<'r> = GraphResolver::new(&self.chain).resolve(registry, first, last);
            for job in graph.jobs() {
                items.entry(job.name.as_str()).or_insert(job);
            }
        }

        for spec in &self.config.regex_components {
            for (_, job) in regex_matches(registry, &spec.regexp) {
                items.entry(job.name.as_str()).or_insert(job);
            }
        }

        items.into_values().collect()
    }

    pub fn contains(&self, registry: &dyn JobRegistry, job_name: &str) -> bool {
        let names: HashSet<&str> = self
            .items(registry)
            .into_iter()
            .map(|job| job.name.as_str())
            .collect();
        names.contains(job_name)
    }
}

fn resolve_spec<'r>(
    registry: &'r dyn JobRegistry,
    spec: &ComponentSpec,
) -> Result<(&'r Job, Option<&'r Job>)> {
    let lookup = |name: &str| {
        registry
            .find_job(name)
            .ok_or_else(|| TimelineError::UnresolvedJob {
                name: name.to_string(),
            })
    };
    let first = lookup(&spec.first_job)?;
    let last = spec.end_job().map(lookup).transpose()?;
    Ok((first, last))
}

/// Regex matches in capture order; a bad pattern logs and matches nothing.
fn regex_matches<'r>(registry: &'r dyn JobRegistry, pattern: &str) -> IndexMap<String, &'r Job> {
    match_components(pattern, registry.all_jobs()).unwrap_or_else(|e| {
        warn!("Ignoring component pattern {pattern}: {e}");
        IndexMap::new()
    })
}
