use crate::registry::{Build, Cause, Job, JobRegistry};

/// Upper bound on how many upstream hops are followed when tracing a cause.
const MAX_CAUSE_DEPTH: usize = 64;

/// Whether a recorded cause chain names `job #number`, directly or through
/// nested upstream causes. Looks only at the chain itself.
pub fn caused_by(causes: &[Cause], job: &str, number: u32) -> bool {
    causes.iter().any(|cause| match cause {
        Cause::Upstream {
            project,
            build,
            causes: nested,
        } => (project == job && *build == number) || caused_by(nested, job, number),
        _ => false,
    })
}

/// Like [`caused_by`], but when an upstream cause carries no nested chain the
/// referenced build is looked up in the registry and its causes followed, so a
/// build is attributed to an anchor several jobs upstream.
pub fn traced_to(registry: &dyn JobRegistry, causes: &[Cause], job: &str, number: u32) -> bool {
    trace(registry, causes, job, number, 0)
}

fn trace(
    registry: &dyn JobRegistry,
    causes: &[Cause],
    job: &str,
    number: u32,
    depth: usize,
) -> bool {
    if depth > MAX_CAUSE_DEPTH {
        return false;
    }
    causes.iter().any(|cause| match cause {
        Cause::Upstream {
            project,
            build,
            causes: nested,
        } => {
            if project == job && *build == number {
                return true;
            }
            if trace(registry, nested, job, number, depth + 1) {
                return true;
            }
            nested.is_empty()
                && registry
                    .build(project, *build)
                    .is_some_and(|b| trace(registry, &b.causes, job, number, depth + 1))
        }
        _ => false,
    })
}

/// Builds of `job` attributed to `anchor_job #anchor_number`, newest first.
pub fn attributed_builds<'a>(
    registry: &dyn JobRegistry,
    job: &'a Job,
    anchor_job: &str,
    anchor_number: u32,
) -> Vec<&'a Build> {
    registry
        .recent_builds(job, usize::MAX)
        .into_iter()
        .filter(|b| traced_to(registry, &b.causes, anchor_job, anchor_number))
        .collect()
}

/// Whether `job` is waiting in the queue for the given anchor build.
///
/// Without an anchor, any queued item counts.
pub fn is_queued_for(registry: &dyn JobRegistry, job: &Job, anchor: Option<(&str, u32)>) -> bool {
    let items = registry.queue_items(job);
    match anchor {
        None => !items.is_empty(),
        Some((anchor_job, anchor_number)) => items
            .iter()
            .any(|item| traced_to(registry, &item.causes, anchor_job, anchor_number)),
    }
}
