use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimelineError {
    #[error("Could not find project: {name}")]
    UnresolvedJob { name: String },

    #[error("Syntax error in regular-expression pattern '{pattern}': {source}")]
    PatternSyntax {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{}", capture_group_message(.found))]
    CaptureGroups { pattern: String, found: usize },

    #[error("Trigger not found for manual build {project} for upstream {upstream} id: {build_id}")]
    TriggerNotFound {
        project: String,
        upstream: String,
        build_id: String,
    },

    #[error("Not authorized to build {project}")]
    Authorization { project: String },

    #[error("Build {build_id} of {project} not found")]
    BuildNotFound { project: String, build_id: String },

    #[error("Invalid build id: {0}")]
    InvalidBuildId(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

fn capture_group_message(found: &usize) -> &'static str {
    if *found == 0 {
        "No capture group defined"
    } else {
        "Too many capture groups defined"
    }
}

pub type Result<T> = std::result::Result<T, TimelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_job_message_names_the_job() {
        let err = TimelineError::UnresolvedJob {
            name: "deploy-prod".to_string(),
        };
        assert_eq!(err.to_string(), "Could not find project: deploy-prod");
    }

    #[test]
    fn test_capture_group_messages() {
        let none = TimelineError::CaptureGroups {
            pattern: "svc-.*".to_string(),
            found: 0,
        };
        let many = TimelineError::CaptureGroups {
            pattern: "(a)(b)".to_string(),
            found: 2,
        };
        assert_eq!(none.to_string(), "No capture group defined");
        assert_eq!(many.to_string(), "Too many capture groups defined");
    }
}
