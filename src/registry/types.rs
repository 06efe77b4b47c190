use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A job known to the host registry.
///
/// The full name is the job's identity; everything else is metadata the host
/// provides for display and traversal. Build history is newest-last on disk
/// but the registry always hands it out newest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Job {
    /// Unique full name (e.g., "folder/build-app")
    pub name: String,
    /// Human-readable name, falls back to the last path segment of `name`
    pub display_name: Option<String>,
    /// Web URL of the job, relative to the host root
    #[serde(default)]
    pub url: String,
    /// Whether the job takes build parameters
    #[serde(default)]
    pub parameterized: bool,
    #[serde(default)]
    pub disabled: bool,
    /// Whether the current user may schedule builds of this job
    #[serde(default = "default_true")]
    pub buildable: bool,
    /// Declared downstream links, triggered automatically
    #[serde(default)]
    pub downstream: Vec<String>,
    /// Declared downstream links that wait for a manual trigger
    #[serde(default)]
    pub manual_downstream: Vec<String>,
    #[serde(default)]
    pub build_steps: Vec<BuildStep>,
    #[serde(default)]
    pub post_build_steps: Vec<BuildStep>,
    #[serde(default)]
    pub builds: Vec<Build>,
}

fn default_true() -> bool {
    true
}

impl Job {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            url: format!("job/{name}/"),
            name,
            display_name: None,
            parameterized: false,
            disabled: false,
            buildable: true,
            downstream: Vec::new(),
            manual_downstream: Vec::new(),
            build_steps: Vec::new(),
            post_build_steps: Vec::new(),
            builds: Vec::new(),
        }
    }

    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .unwrap_or_else(|| self.name.rsplit('/').next().unwrap_or(&self.name))
    }

    /// Every declared downstream link, automatic ones first.
    pub fn declared_downstream(&self) -> impl Iterator<Item = &str> {
        self.downstream
            .iter()
            .chain(self.manual_downstream.iter())
            .map(String::as_str)
    }

    pub fn is_manual_downstream(&self, name: &str) -> bool {
        self.manual_downstream.iter().any(|n| n == name)
    }
}

/// A build step configured on a job.
///
/// Only trigger steps matter for graph resolution; conditional steps may wrap
/// them, anything else is carried as `Shell`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum BuildStep {
    /// "Trigger/call builds on other projects" with a comma-separated list
    Trigger { projects: String },
    Conditional {
        #[serde(default)]
        steps: Vec<BuildStep>,
    },
    Shell { command: String },
}

impl BuildStep {
    /// Project names named by a trigger step, whitespace stripped.
    pub fn trigger_targets(&self) -> Vec<String> {
        match self {
            Self::Trigger { projects } => projects
                .split(',')
                .map(|p| p.chars().filter(|c| !c.is_whitespace()).collect::<String>())
                .filter(|p| !p.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Trigger targets of this step, looking one level inside conditional steps.
    pub fn reachable_targets(&self) -> Vec<String> {
        match self {
            Self::Conditional { steps } => steps.iter().flat_map(Self::trigger_targets).collect(),
            _ => self.trigger_targets(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildResult {
    Success,
    Failure,
    Unstable,
    Aborted,
    NotBuilt,
}

/// One recorded build of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Build {
    pub number: u32,
    pub display_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub building: bool,
    pub result: Option<BuildResult>,
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
    #[serde(default)]
    pub causes: Vec<Cause>,
    #[serde(default)]
    pub changes: Vec<Change>,
}

impl Build {
    pub fn display_name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| format!("#{}", self.number))
    }
}

/// Why a build (or queue item) was started.
///
/// Upstream causes nest: a build started by `test #4`, itself started by
/// `build #9`, records `test #4` with `build #9` inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Cause {
    Upstream {
        project: String,
        build: u32,
        #[serde(default)]
        causes: Vec<Cause>,
    },
    User {
        #[serde(rename = "user-id")]
        user_id: Option<String>,
    },
    Timer,
    Scm,
    Remote {
        note: Option<String>,
    },
}

impl Cause {
    pub fn upstream(project: impl Into<String>, build: u32) -> Self {
        Self::Upstream {
            project: project.into(),
            build,
            causes: Vec::new(),
        }
    }

    pub fn description(&self) -> String {
        match self {
            Self::Upstream { project, build, .. } => {
                format!("Started by upstream project {project} build number {build}")
            }
            Self::User { user_id: Some(user) } => format!("Started by user {user}"),
            Self::User { user_id: None } => "Started by anonymous user".to_string(),
            Self::Timer => "Started by timer".to_string(),
            Self::Scm => "Started by an SCM change".to_string(),
            Self::Remote { note: Some(note) } => format!("Started remotely: {note}"),
            Self::Remote { note: None } => "Started remotely".to_string(),
        }
    }
}

/// A source change that went into a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Change {
    pub commit_id: String,
    pub author: String,
    pub message: String,
}

/// A pending build waiting in the host scheduler's queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QueueItem {
    pub job: String,
    #[serde(default)]
    pub causes: Vec<Cause>,
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_last_segment() {
        let job = Job::new("team/app/build");
        assert_eq!(job.display_name(), "build");

        let mut named = Job::new("team/app/build");
        named.display_name = Some("Build App".to_string());
        assert_eq!(named.display_name(), "Build App");
    }

    #[test]
    fn test_trigger_targets_strip_whitespace() {
        let step = BuildStep::Trigger {
            projects: " deploy-a , deploy b,, ".to_string(),
        };
        assert_eq!(step.trigger_targets(), vec!["deploy-a", "deployb"]);
    }

    #[test]
    fn test_non_trigger_steps_have_no_targets() {
        let step = BuildStep::Shell {
            command: "make".to_string(),
        };
        assert!(step.trigger_targets().is_empty());
    }

    #[test]
    fn test_cause_deserializes_nested_chain() {
        let json = r#"{
            "type": "upstream",
            "project": "test",
            "build": 4,
            "causes": [{ "type": "upstream", "project": "build", "build": 9 }]
        }"#;
        let cause: Cause = serde_json::from_str(json).unwrap();
        let Cause::Upstream { project, build, causes } = cause else {
            panic!("expected upstream cause");
        };
        assert_eq!(project, "test");
        assert_eq!(build, 4);
        assert_eq!(causes, vec![Cause::upstream("build", 9)]);
    }
}
