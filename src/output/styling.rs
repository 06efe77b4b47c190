use console::style;

use crate::pipeline::Status;

/// Styling helpers for terminal output
pub fn bright_yellow(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn bright_green(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn bright_red(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn cyan(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// Status label coloured the way the pipeline table colours it.
pub fn status_label(status: Status) -> console::StyledObject<String> {
    let label = status.label();
    match status {
        Status::Succeeded => bright_green(label),
        Status::Failed => bright_red(label),
        Status::Unstable | Status::Running | Status::Queued => bright_yellow(label),
        Status::Idle | Status::Cancelled | Status::Disabled => dim(label),
    }
}
