use std::cmp::Ordering;

use log::{debug, warn};

use crate::pipeline::Component;

/// Sorter id written by older configurations for the identity order.
pub const LEGACY_NOOP_ID: &str = "uw.iyyuan.jenkins.timeline.sort.NoOpComparator";

/// A named total order over components.
pub trait ComponentComparator: Send + Sync {
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn compare(&self, a: &Component, b: &Component) -> Ordering;
}

/// Keeps registration order.
pub struct NoOpComparator;

impl ComponentComparator for NoOpComparator {
    fn id(&self) -> &'static str {
        "none"
    }

    fn display_name(&self) -> &'static str {
        "No sorting"
    }

    fn compare(&self, _a: &Component, _b: &Component) -> Ordering {
        Ordering::Equal
    }
}

/// Most recent task activity in the first pipeline first, then by name.
pub struct LatestActivityComparator;

impl ComponentComparator for LatestActivityComparator {
    fn id(&self) -> &'static str {
        "latestActivity"
    }

    fn display_name(&self) -> &'static str {
        "Sorting by last activity"
    }

    fn compare(&self, a: &Component, b: &Component) -> Ordering {
        let activity = |c: &Component| c.first_pipeline().and_then(|p| p.latest_activity());
        // Components that never ran sort after every component with activity.
        let by_activity = match (activity(a), activity(b)) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_activity.then_with(|| a.name.cmp(&b.name))
    }
}

/// Components with a failed task in their first pipeline first, then by activity.
pub struct FailedFirstComparator;

impl ComponentComparator for FailedFirstComparator {
    fn id(&self) -> &'static str {
        "failedFirst"
    }

    fn display_name(&self) -> &'static str {
        "Sorting by failed pipelines first"
    }

    fn compare(&self, a: &Component, b: &Component) -> Ordering {
        let failed = |c: &Component| c.first_pipeline().is_some_and(|p| p.has_failed_task());
        failed(b)
            .cmp(&failed(a))
            .then_with(|| LatestActivityComparator.compare(a, b))
    }
}

/// The comparators available to a view, looked up by id.
pub struct ComparatorRegistry {
    comparators: Vec<Box<dyn ComponentComparator>>,
}

impl Default for ComparatorRegistry {
    fn default() -> Self {
        Self {
            comparators: vec![
                Box::new(NoOpComparator),
                Box::new(LatestActivityComparator),
                Box::new(FailedFirstComparator),
            ],
        }
    }
}

impl ComparatorRegistry {
    pub fn register(&mut self, comparator: Box<dyn ComponentComparator>) {
        self.comparators.push(comparator);
    }

    pub fn get(&self, id: &str) -> Option<&dyn ComponentComparator> {
        let id = normalize_id(id);
        self.comparators
            .iter()
            .find(|c| c.id() == id)
            .map(AsRef::as_ref)
    }

    /// `(id, display name)` of every registered comparator.
    pub fn available(&self) -> Vec<(&'static str, &'static str)> {
        self.comparators
            .iter()
            .map(|c| (c.id(), c.display_name()))
            .collect()
    }

    /// Stable sort by the named comparator, identity order when it is unknown.
    pub fn sort(&self, components: &mut [Component], id: &str) {
        let Some(comparator) = self.get(id) else {
            warn!("Unknown sort order '{id}', keeping configured order");
            return;
        };
        debug!("Sorting {} components by {}", components.len(), comparator.id());
        components.sort_by(|a, b| comparator.compare(a, b));
    }
}

/// Map legacy sorter ids onto their current names.
pub fn normalize_id(id: &str) -> &str {
    if id == LEGACY_NOOP_ID || id.is_empty() {
        "none"
    } else {
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Pipeline, Stage, Status, Task};
    use crate::registry::fixtures::at_minute;

    fn task(status: Status, minute: Option<i64>) -> Task {
        Task {
            id: "job".to_string(),
            name: "job".to_string(),
            link: "job/job/".to_string(),
            build_number: minute.map(|_| 1),
            status,
            timestamp: minute.map(at_minute),
            duration_ms: 0,
            manual: None,
            rebuildable: false,
            changes: vec![],
        }
    }

    fn component(name: &str, tasks: Vec<Task>) -> Component {
        Component {
            name: name.to_string(),
            number: 1,
            first_job: name.to_string(),
            first_job_url: format!("job/{name}/"),
            first_job_parameterized: false,
            pagination: None,
            pipelines: vec![Pipeline {
                name: name.to_string(),
                version: None,
                aggregated: false,
                triggered_by: vec![],
                timestamp: None,
                total_build_time_ms: None,
                changes: vec![],
                stages: vec![Stage {
                    name: name.to_string(),
                    job: name.to_string(),
                    url: format!("job/{name}/"),
                    tasks,
                    downstream: vec![],
                }],
            }],
        }
    }

    fn names(components: &[Component]) -> Vec<&str> {
        components.iter().map(|c| c.name.as_str()).collect()
    }

    mod latest_activity_tests {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_newest_activity_first() {
            let old = component("old", vec![task(Status::Succeeded, Some(1))]);
            let new = component("new", vec![task(Status::Succeeded, Some(9))]);
            assert_eq!(LatestActivityComparator.compare(&new, &old), Ordering::Less);
            assert_eq!(LatestActivityComparator.compare(&old, &new), Ordering::Greater);
        }

        #[test]
        fn test_ties_broken_by_name() {
            let a = component("alpha", vec![task(Status::Succeeded, Some(3))]);
            let b = component("beta", vec![task(Status::Succeeded, Some(3))]);
            assert_eq!(LatestActivityComparator.compare(&a, &b), Ordering::Less);
        }

        #[test]
        fn test_never_run_sorts_last() {
            let idle = component("idle", vec![task(Status::Idle, None)]);
            let ran = component("ran", vec![task(Status::Succeeded, Some(0))]);
            assert_eq!(LatestActivityComparator.compare(&idle, &ran), Ordering::Greater);
        }
    }

    mod failed_first_tests {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_failed_before_succeeded_regardless_of_time() {
            let failed = component("a", vec![task(Status::Failed, Some(0))]);
            let green = component("b", vec![task(Status::Succeeded, Some(50))]);
            assert_eq!(FailedFirstComparator.compare(&failed, &green), Ordering::Less);
            assert_eq!(FailedFirstComparator.compare(&green, &failed), Ordering::Greater);
        }

        #[test]
        fn test_both_failed_falls_back_to_activity() {
            let older = component("a", vec![task(Status::Failed, Some(1))]);
            let newer = component("b", vec![task(Status::Failed, Some(2))]);
            assert_eq!(FailedFirstComparator.compare(&newer, &older), Ordering::Less);
        }
    }

    mod registry_tests {
        use super::*;
        use pretty_assertions::assert_eq;

        fn sample() -> Vec<Component> {
            vec![
                component("green", vec![task(Status::Succeeded, Some(5))]),
                component("red", vec![task(Status::Failed, Some(1))]),
                component("fresh", vec![task(Status::Running, Some(9))]),
            ]
        }

        #[test]
        fn test_sort_by_name() {
            let registry = ComparatorRegistry::default();
            let mut components = sample();
            registry.sort(&mut components, "failedFirst");
            assert_eq!(names(&components), vec!["red", "fresh", "green"]);

            registry.sort(&mut components, "latestActivity");
            assert_eq!(names(&components), vec!["fresh", "green", "red"]);
        }

        #[test]
        fn test_none_keeps_order() {
            let registry = ComparatorRegistry::default();
            let mut components = sample();
            registry.sort(&mut components, "none");
            assert_eq!(names(&components), vec!["green", "red", "fresh"]);
        }

        #[test]
        fn test_unknown_falls_back_to_none() {
            let registry = ComparatorRegistry::default();
            let mut components = sample();
            registry.sort(&mut components, "byColour");
            assert_eq!(names(&components), vec!["green", "red", "fresh"]);
        }

        #[test]
        fn test_legacy_id_is_none() {
            let registry = ComparatorRegistry::default();
            assert_eq!(registry.get(LEGACY_NOOP_ID).map(|c| c.id()), Some("none"));
        }

        #[test]
        fn test_available_lists_builtins() {
            let ids: Vec<&str> = ComparatorRegistry::default()
                .available()
                .into_iter()
                .map(|(id, _)| id)
                .collect();
            assert_eq!(ids, vec!["none", "latestActivity", "failedFirst"]);
        }
    }
}
