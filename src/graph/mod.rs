mod resolver;

pub use resolver::{
    ConditionalStepResolver, DownstreamLinkResolver, EdgeResolver, ResolverChain,
    TriggerStepResolver,
};

use indexmap::IndexMap;
use log::{debug, warn};
use serde::Serialize;

use crate::registry::{Job, JobRegistry};

/// Traversal depth past which a job is kept but no longer expanded.
///
/// The visited check already guarantees termination; this only bounds stack
/// usage on very deep (acyclic) chains. The guard counts jobs, not edges.
pub const MAX_DEPTH: usize = 256;

/// A directed relation discovered during one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// Jobs reachable from a start job, keyed by full name in discovery order.
#[derive(Debug, Clone, Default)]
pub struct JobGraph<'r> {
    jobs: IndexMap<String, &'r Job>,
    edges: Vec<Edge>,
}

impl<'r> JobGraph<'r> {
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.jobs.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&'r Job> {
        self.jobs.get(name).copied()
    }

    /// The job the traversal started from.
    pub fn start(&self) -> Option<&'r Job> {
        self.jobs.values().next().copied()
    }

    pub fn jobs(&self) -> impl Iterator<Item = &'r Job> + '_ {
        self.jobs.values().copied()
    }

    pub fn names(&self) -> Vec<&str> {
        self.jobs.keys().map(String::as_str).collect()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Direct successors of `name` inside this graph, in discovery order.
    pub fn successors(&self, name: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.from == name)
            .map(|e| e.to.as_str())
            .collect()
    }

    /// The first job found to lead to `name`, if any.
    pub fn predecessor(&self, name: &str) -> Option<&'r Job> {
        self.predecessors(name).into_iter().next()
    }

    /// Every job leading to `name`, in discovery order.
    pub fn predecessors(&self, name: &str) -> Vec<&'r Job> {
        self.edges
            .iter()
            .filter(|e| e.to == name)
            .filter_map(|e| self.get(&e.from))
            .collect()
    }

    fn insert(&mut self, job: &'r Job) {
        self.jobs.insert(job.name.clone(), job);
    }

    fn link(&mut self, from: &Job, to: &Job) {
        let edge = Edge {
            from: from.name.clone(),
            to: to.name.clone(),
        };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }
}

/// Expands a start job into every job reachable through the resolver chain.
pub struct GraphResolver<'c> {
    chain: &'c ResolverChain,
    max_depth: usize,
}

impl<'c> GraphResolver<'c> {
    pub fn new(chain: &'c ResolverChain) -> Self {
        Self {
            chain,
            max_depth: MAX_DEPTH,
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Resolve the graph from `start`, stopping at `end` when given.
    ///
    /// A job already in the graph is never expanded twice, so cycles and
    /// diamonds terminate. `end` is included but its own downstream jobs are not.
    /// A missing `start` yields an empty graph.
    pub fn resolve<'r>(
        &self,
        registry: &'r dyn JobRegistry,
        start: Option<&'r Job>,
        end: Option<&'r Job>,
    ) -> JobGraph<'r> {
        let mut graph = JobGraph::default();
        if let Some(start) = start {
            self.expand(registry, start, end, 0, &mut graph);
            debug!(
                "Resolved {} jobs from {} ({} edges)",
                graph.len(),
                start.name,
                graph.edges.len()
            );
        }
        graph
    }

    fn expand<'r>(
        &self,
        registry: &'r dyn JobRegistry,
        job: &'r Job,
        end: Option<&'r Job>,
        depth: usize,
        graph: &mut JobGraph<'r>,
    ) {
        if graph.contains(&job.name) {
            return;
        }

        if end.is_some_and(|end| end.name == job.name) {
            graph.insert(job);
            return;
        }

        graph.insert(job);

        if depth >= self.max_depth {
            warn!(
                "Stopped expanding {} at depth {depth}; downstream jobs are not shown",
                job.name
            );
            return;
        }

        for next in self.chain.downstream_of(job, registry) {
            graph.link(job, next);
            self.expand(registry, next, end, depth + 1, graph);
        }
    }
}
