use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::discovery::validate_pattern;
use crate::error::TimelineError;
use crate::sort::normalize_id;

/// Upper bound on pipelines shown per component.
pub const MAX_PIPELINE_COUNT: usize = 50;

const DEFAULT_UPDATE_INTERVAL: i64 = 60;

/// Configuration file structure for a pipeline view.
///
/// Describes which components to show and how. Configuration files are loaded
/// from the current directory, the user config directory, or a given path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Display and paging settings
    #[serde(default)]
    pub view: ViewConfig,

    /// Components with an explicit first (and optional last) job
    #[serde(default)]
    pub components: Vec<ComponentSpec>,

    /// Components discovered by matching job names
    #[serde(default)]
    pub regex_components: Vec<RegexSpec>,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ViewConfig {
    /// Pipelines per component (0 to 50)
    #[serde(default = "default_pipeline_count")]
    pub pipeline_count: usize,

    /// Components shown at most; zero or negative shows all
    #[serde(default)]
    pub max_visible_components: Option<i64>,

    /// Pages reachable when paging through build history
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    #[serde(default = "default_true")]
    pub paging_enabled: bool,

    /// Prepend the aggregated latest-state pipeline to each component
    #[serde(default)]
    pub show_aggregated: bool,

    #[serde(default)]
    pub show_changes: bool,

    #[serde(default)]
    pub show_aggregated_changes: bool,

    /// Comparator id: none, latestActivity or failedFirst
    #[serde(default = "default_sorting")]
    pub sorting: String,

    /// Seconds between refreshes in watch mode
    #[serde(default = "default_update_interval")]
    pub update_interval: i64,

    #[serde(default = "default_true")]
    pub allow_manual_triggers: bool,

    #[serde(default)]
    pub allow_rebuild: bool,

    #[serde(default)]
    pub show_total_build_time: bool,
}

/// A component named by its first job, optionally ending at a last job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ComponentSpec {
    pub name: String,
    pub first_job: String,
    #[serde(default)]
    pub last_job: Option<String>,
}

impl ComponentSpec {
    /// The configured last job; a blank name means the pipeline runs to its end.
    pub fn end_job(&self) -> Option<&str> {
        self.last_job
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Components discovered from job names; the single capture group names them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegexSpec {
    pub regexp: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Default output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            pipeline_count: default_pipeline_count(),
            max_visible_components: None,
            max_pages: default_max_pages(),
            paging_enabled: true,
            show_aggregated: false,
            show_changes: false,
            show_aggregated_changes: false,
            sorting: default_sorting(),
            update_interval: default_update_interval(),
            allow_manual_triggers: true,
            allow_rebuild: false,
            show_total_build_time: false,
        }
    }
}

fn default_pipeline_count() -> usize {
    5
}

fn default_max_pages() -> usize {
    5
}

fn default_sorting() -> String {
    "none".to_string()
}

fn default_update_interval() -> i64 {
    DEFAULT_UPDATE_INTERVAL
}

fn default_true() -> bool {
    true
}

impl ViewConfig {
    /// `None` when every component should be shown.
    pub fn visible_limit(&self) -> Option<usize> {
        self.max_visible_components
            .filter(|&max| max > 0)
            .and_then(|max| usize::try_from(max).ok())
    }

    /// Refresh interval in seconds; an unset (zero) interval means the default.
    pub fn update_interval_secs(&self) -> u64 {
        u64::try_from(self.update_interval)
            .ok()
            .filter(|&secs| secs > 0)
            .unwrap_or(DEFAULT_UPDATE_INTERVAL as u64)
    }

    /// Clamp and rename values written by older or hand-edited configurations.
    fn normalize(&mut self) {
        self.pipeline_count = self.pipeline_count.min(MAX_PIPELINE_COUNT);
        self.sorting = normalize_id(&self.sorting).to_string();
        if self.update_interval == 0 {
            self.update_interval = DEFAULT_UPDATE_INTERVAL;
        }
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./pipeview.toml
    /// 3. ./pipeview.json
    /// 4. ./pipeview.yaml
    /// 5. ./pipeview.yml
    /// 6. `<config dir>/pipeview/pipeview.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = ["pipeview.toml", "pipeview.json", "pipeview.yaml", "pipeview.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = user_config_path().filter(|p| p.exists()) {
            return Self::load_from_path(&path);
        }

        // No config file found, return defaults
        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = parse_by_extension(path, &contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.view.normalize();

        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = render_by_extension(path, self)?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Every problem a careful reader of this configuration would flag.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for (i, spec) in self.components.iter().enumerate() {
            if spec.name.trim().is_empty() {
                problems.push(format!("components[{i}].name: Please supply a title!"));
            }
            if spec.first_job.trim().is_empty() {
                problems.push(format!("components[{i}].first-job: Please supply a job name!"));
            }
        }

        for (i, spec) in self.regex_components.iter().enumerate() {
            if let Err(e) = validate_pattern(&spec.regexp) {
                let message = match e {
                    TimelineError::PatternSyntax { .. } => {
                        "Syntax error in regular-expression pattern".to_string()
                    }
                    other => other.to_string(),
                };
                problems.push(format!("regex-components[{i}].regexp: {message}"));
            }
        }

        if self.view.update_interval < 0 {
            problems.push("view.update-interval: Value must be greater than 0".to_string());
        }

        problems
    }

    /// # Errors
    ///
    /// Returns [`TimelineError::Config`] listing every problem found.
    pub fn validate(&self) -> crate::error::Result<()> {
        let problems = self.problems();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(TimelineError::Config(problems.join("; ")))
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pipeview").join("pipeview.toml"))
}

/// Parse TOML, JSON or YAML by file extension, trying each in turn otherwise.
pub(crate) fn parse_by_extension<T: DeserializeOwned>(path: &Path, contents: &str) -> Result<T> {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    match extension {
        "toml" => toml::from_str(contents).context("Invalid TOML"),
        "json" => serde_json::from_str(contents).context("Invalid JSON"),
        "yaml" | "yml" => serde_yaml::from_str(contents).context("Invalid YAML"),
        _ => {
            // Try TOML first, then JSON, then YAML
            toml::from_str(contents)
                .or_else(|_| serde_json::from_str(contents))
                .or_else(|_| serde_yaml::from_str(contents))
                .context("Unrecognized file format")
        }
    }
}

/// Serialize by file extension, TOML unless JSON or YAML is asked for.
pub(crate) fn render_by_extension<T: Serialize>(path: &Path, value: &T) -> Result<String> {
    let contents = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::to_string_pretty(value)?,
        Some("yaml") | Some("yml") => serde_yaml::to_string(value)?,
        _ => toml::to_string_pretty(value)?,
    };
    Ok(contents)
}
