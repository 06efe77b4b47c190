use std::fmt::Write;

use comfy_table::Cell;

use super::styling::{bright, bright_red, bright_yellow, cyan, dim, status_label};
use super::tables::{create_table, format_duration, header, status_cell};
use crate::pipeline::{Component, Pipeline, Task};
use crate::view::ViewResult;

/// Prints every component of a read as colour-coded tables to stdout.
///
/// Each pipeline gets one table with a row per task: stage, build, status,
/// start time, duration and any manual or rebuild action available.
pub fn print_summary(result: &ViewResult) {
    println!("{}", render_summary(result));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn task_action(task: &Task) -> String {
    if let Some(manual) = &task.manual {
        let state = if manual.enabled {
            "ready"
        } else if manual.permission {
            "waiting"
        } else {
            "not permitted"
        };
        return format!("manual after {} ({state})", manual.upstream_project);
    }
    if task.rebuildable {
        "rebuild".to_string()
    } else {
        String::new()
    }
}

fn render_pipeline(output: &mut String, pipeline: &Pipeline) {
    let title = if pipeline.aggregated {
        "Aggregated view".to_string()
    } else {
        pipeline
            .version
            .clone()
            .unwrap_or_else(|| "Not yet run".to_string())
    };

    let _ = write!(output, "  {} {}", cyan(&pipeline.name), bright(title));
    if let Some(timestamp) = pipeline.timestamp {
        let _ = write!(output, " {}", dim(timestamp.format("%Y-%m-%d %H:%M UTC")));
    }
    if let Some(total) = pipeline.total_build_time_ms {
        let _ = write!(output, " {}", dim(format!("total {}", format_duration(total))));
    }
    output.push('\n');
    for cause in &pipeline.triggered_by {
        let _ = writeln!(output, "    {}", dim(cause));
    }

    let mut table = create_table();
    table.set_header(header(&["Stage", "Build", "Status", "Started", "Duration", "Action"]));
    for stage in &pipeline.stages {
        for task in &stage.tasks {
            table.add_row(vec![
                Cell::new(&stage.name),
                Cell::new(
                    task.build_number
                        .map_or_else(|| "-".to_string(), |n| format!("#{n}")),
                ),
                status_cell(task.status),
                Cell::new(
                    task.timestamp
                        .map_or_else(String::new, |t| t.format("%H:%M:%S").to_string()),
                ),
                Cell::new(if task.build_number.is_some() {
                    format_duration(task.duration_ms)
                } else {
                    String::new()
                }),
                Cell::new(task_action(task)),
            ]);
        }
    }
    let _ = writeln!(output, "{table}");

    for change in &pipeline.changes {
        let short: String = change.commit_id.chars().take(8).collect();
        let _ = writeln!(
            output,
            "    {} {} {}",
            bright_yellow(short),
            dim(&change.author),
            change.message
        );
    }
}

fn render_component(output: &mut String, component: &Component) {
    add_section_header(output, "📦", &component.name);
    let _ = write!(
        output,
        "  {} {}",
        dim("First job:"),
        cyan(&component.first_job)
    );
    if let Some(pagination) = component.pagination {
        let _ = write!(
            output,
            "  {} {}/{}",
            dim("Page:"),
            pagination.page,
            pagination.total_pages
        );
    }
    output.push('\n');

    if let Some(first) = component.first_pipeline() {
        if let Some(task) = first.tasks().find(|t| t.status.is_failed()) {
            let _ = writeln!(
                output,
                "  {} {} {}",
                dim("Latest failure:"),
                task.name,
                status_label(task.status)
            );
        }
    }

    for pipeline in &component.pipelines {
        render_pipeline(output, pipeline);
    }
}

fn render_summary(result: &ViewResult) -> String {
    let mut output = String::new();

    if let Some(error) = &result.error {
        let _ = writeln!(output, "{} {}", bright_red("Error:"), error);
        return output;
    }

    if result.components.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No components configured."));
        return output;
    }

    for component in &result.components {
        render_component(&mut output, component);
        output.push('\n');
    }

    let _ = writeln!(
        output,
        "{} {}",
        dim("Last updated:"),
        dim(result.last_updated.format("%Y-%m-%d %H:%M:%S UTC"))
    );
    output
}
