mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::export_view;
pub use progress::ReadProgress;
pub use styling::{bright_green, bright_red, dim, magenta_bold};
pub use summary::print_summary;

/// Prints the `pipeview` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🚦 pipeview"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Delivery pipeline viewer")
    );
}
