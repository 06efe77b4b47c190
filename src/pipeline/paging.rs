use serde::Serialize;

use super::model::Component;

/// Paging request for per-build pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub enabled: bool,
    /// 1-based requested page, clamped into range
    pub page: usize,
    pub max_pages: usize,
}

impl PageRequest {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            page: 1,
            max_pages: 1,
        }
    }
}

/// Where a component's pipelines sit within the start job's build history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_builds: usize,
}

impl Pagination {
    /// Page window over `total_builds`, never more than `max_pages` pages.
    pub fn new(total_builds: usize, page_size: usize, max_pages: usize, requested: usize) -> Self {
        let total_pages = if page_size == 0 {
            1
        } else {
            total_builds.div_ceil(page_size).min(max_pages).max(1)
        };
        Self {
            page: requested.clamp(1, total_pages),
            page_size,
            total_pages,
            total_builds,
        }
    }

    /// Number of newest builds skipped before this page starts.
    pub fn offset(&self) -> usize {
        (self.page - 1) * self.page_size
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Keep at most `max_visible` components, preserving their order.
pub fn trim_components(components: &mut Vec<Component>, max_visible: Option<usize>) {
    if let Some(max) = max_visible {
        components.truncate(max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(name: &str) -> Component {
        Component {
            name: name.to_string(),
            number: 1,
            first_job: name.to_string(),
            first_job_url: format!("job/{name}/"),
            first_job_parameterized: false,
            pagination: None,
            pipelines: vec![],
        }
    }

    #[test]
    fn test_pages_bounded_by_max_pages() {
        let pagination = Pagination::new(20, 5, 3, 1);
        assert_eq!(pagination.total_pages, 3);
        assert!(pagination.has_next());
        assert!(!pagination.has_previous());
    }

    #[test]
    fn test_every_page_window_fits_in_max_pages() {
        let mut assembled = 0;
        for requested in 1..=10 {
            let pagination = Pagination::new(20, 5, 3, requested);
            let window = 20usize
                .saturating_sub(pagination.offset())
                .min(pagination.page_size);
            assert!(pagination.offset() + window <= 15);
            if requested <= 3 {
                assembled += window;
            }
        }
        assert_eq!(assembled, 15);
    }

    #[test]
    fn test_requested_page_is_clamped() {
        assert_eq!(Pagination::new(20, 5, 3, 9).page, 3);
        assert_eq!(Pagination::new(20, 5, 3, 0).page, 1);
        assert_eq!(Pagination::new(20, 5, 3, 9).offset(), 10);
    }

    #[test]
    fn test_partial_last_page() {
        let pagination = Pagination::new(7, 5, 10, 2);
        assert_eq!(pagination.total_pages, 2);
        assert_eq!(pagination.offset(), 5);
        assert!(!pagination.has_next());
    }

    #[test]
    fn test_empty_history_has_one_page() {
        let pagination = Pagination::new(0, 5, 3, 4);
        assert_eq!(pagination.total_pages, 1);
        assert_eq!(pagination.page, 1);
        assert_eq!(pagination.offset(), 0);
    }

    #[test]
    fn test_trim_keeps_order() {
        let mut components: Vec<Component> =
            ["a", "b", "c", "d", "e"].iter().map(|n| component(n)).collect();
        trim_components(&mut components, Some(2));
        let names: Vec<&str> = components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_trim_unlimited() {
        let mut components: Vec<Component> = ["a", "b"].iter().map(|n| component(n)).collect();
        trim_components(&mut components, None);
        assert_eq!(components.len(), 2);
    }
}
