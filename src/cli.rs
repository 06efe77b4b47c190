use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{Config, OutputFormat};
use crate::output::{
    bright_green, bright_red, dim, export_view, print_summary, ReadProgress,
};
use crate::registry::{JobRegistry, SnapshotRegistry};
use crate::trigger::{trigger_failure_message, trigger_manual, trigger_rebuild};
use crate::view::{ReadRequest, TimelineView, ViewResult};

#[derive(Parser)]
#[command(name = "pipeview")]
#[command(author, version, about = "Delivery pipeline viewer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./pipeview.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Registry snapshot with jobs, builds and the build queue
    #[arg(
        short,
        long,
        global = true,
        env = "PIPEVIEW_REGISTRY",
        default_value = "registry.yaml"
    )]
    registry: PathBuf,

    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve every component and show its pipelines
    Show {
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Show every pipeline without paging
        #[arg(long, default_value_t = false)]
        full_screen: bool,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Re-read the registry and show pipelines until interrupted
    Watch {
        #[arg(long, default_value_t = false)]
        full_screen: bool,

        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// List every job the view shows
    Jobs,
    /// Validate the configuration
    Check,
    /// Manually continue a pipeline from an upstream build
    Trigger {
        #[arg(short = 'P', long)]
        project: String,

        #[arg(short, long)]
        upstream: String,

        #[arg(short, long)]
        build: String,
    },
    /// Run a finished build again with the same parameters
    Rebuild {
        #[arg(short = 'P', long)]
        project: String,

        #[arg(short, long)]
        build: String,
    },
}

impl Cli {
    fn load_registry(&self) -> Result<SnapshotRegistry> {
        SnapshotRegistry::load(&self.registry)
    }

    fn read(&self, view: &TimelineView, request: ReadRequest) -> Result<ViewResult> {
        let registry = self.load_registry()?;
        let progress = ReadProgress::start("Resolving pipelines");
        let result = view.components(&registry, request);
        if result.error.is_some() {
            progress.abandon();
        } else {
            progress.finish(&format!("Resolved {} components", result.components.len()));
        }
        Ok(result)
    }

    fn emit(&self, config: &Config, result: &ViewResult, format: Option<OutputFormat>) -> Result<()> {
        let format = format.unwrap_or(config.output.format);
        let pretty = self.pretty || config.output.pretty;

        match (&self.output, format) {
            (None, OutputFormat::Summary) => print_summary(result),
            (None, OutputFormat::Json) => export_view(result, format, pretty, &mut std::io::stdout())?,
            (Some(path), _) => {
                let mut file = std::fs::File::create(path)
                    .with_context(|| format!("Failed to create output file: {}", path.display()))?;
                export_view(result, format, pretty, &mut file)?;
                info!("Pipelines written to: {}", path.display());
            }
        }
        Ok(())
    }

    fn execute_show(
        &self,
        config: Config,
        page: usize,
        full_screen: bool,
        format: Option<OutputFormat>,
    ) -> Result<()> {
        let view = TimelineView::new(config);
        let result = self.read(&view, ReadRequest { page, full_screen })?;
        self.emit(view.config(), &result, format)?;

        if let Some(error) = result.error {
            bail!(error);
        }
        Ok(())
    }

    fn refresh(
        &self,
        view: &TimelineView,
        full_screen: bool,
        format: Option<OutputFormat>,
    ) -> Result<()> {
        let result = self.read(view, ReadRequest { page: 1, full_screen })?;
        self.emit(view.config(), &result, format)
    }

    async fn execute_watch(
        &self,
        config: Config,
        full_screen: bool,
        format: Option<OutputFormat>,
    ) -> Result<()> {
        let view = TimelineView::new(config);
        let period = Duration::from_secs(view.settings().update_interval_secs());
        info!("Refreshing every {}s, press Ctrl-C to stop", period.as_secs());

        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.refresh(&view, full_screen, format) {
                        warn!("Skipping refresh: {e:#}");
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Stopped watching");
                    return Ok(());
                }
            }
        }
    }

    fn execute_jobs(&self, config: Config) -> Result<()> {
        let registry = self.load_registry()?;
        let view = TimelineView::new(config);
        let names: Vec<&str> = view
            .items(&registry)
            .into_iter()
            .map(|job| job.name.as_str())
            .collect();

        let listing = if self.pretty {
            serde_json::to_string_pretty(&names)?
        } else {
            names.join("\n")
        };

        if let Some(path) = &self.output {
            std::fs::write(path, listing)
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
        } else {
            println!("{listing}");
        }
        Ok(())
    }

    fn execute_check(config: &Config) -> Result<()> {
        let problems = config.problems();
        if problems.is_empty() {
            eprintln!("{}", bright_green("Configuration is valid ✓"));
            return Ok(());
        }

        for problem in &problems {
            eprintln!("  {} {}", bright_red("✗"), problem);
        }
        config.validate()?;
        Ok(())
    }

    fn execute_trigger(&self, config: Config, project: &str, upstream: &str, build: &str) -> Result<()> {
        if !config.view.allow_manual_triggers {
            bail!("Manual triggers are disabled for this view");
        }
        let view = TimelineView::new(config);
        let mut registry = self.load_registry()?;

        trigger_manual(&mut registry, view.triggers(), project, upstream, build)
            .with_context(|| trigger_failure_message(project, upstream, build))?;
        save_registry(&registry, &self.registry)?;

        eprintln!(
            "{} {} {}",
            bright_green("Queued"),
            project,
            dim(format!("after {upstream} #{build}"))
        );
        Ok(())
    }

    fn execute_rebuild(&self, config: &Config, project: &str, build: &str) -> Result<()> {
        if !config.view.allow_rebuild {
            bail!("Rebuilds are disabled for this view");
        }
        let mut registry = self.load_registry()?;

        trigger_rebuild(&mut registry, project, build)
            .with_context(|| format!("Could not rebuild {project} #{build}"))?;
        save_registry(&registry, &self.registry)?;

        eprintln!("{} {} {}", bright_green("Queued"), project, dim(format!("rebuild of #{build}")));
        Ok(())
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::Show {
                page,
                full_screen,
                format,
            } => self.execute_show(config, *page, *full_screen, *format),
            Commands::Watch {
                full_screen,
                format,
            } => self.execute_watch(config, *full_screen, *format).await,
            Commands::Jobs => self.execute_jobs(config),
            Commands::Check => Self::execute_check(&config),
            Commands::Trigger {
                project,
                upstream,
                build,
            } => self.execute_trigger(config, project, upstream, build),
            Commands::Rebuild { project, build } => self.execute_rebuild(&config, project, build),
        }
    }
}

fn save_registry(registry: &SnapshotRegistry, path: &Path) -> Result<()> {
    registry.save(path)?;
    let queued = registry.all_jobs().iter().filter(|job| registry.is_queued(job)).count();
    info!(
        "Registry saved to {} ({} jobs waiting)",
        path.display(),
        queued
    );
    Ok(())
}
