use anyhow::Result;
use std::io::Write;

use crate::config::OutputFormat;
use crate::view::ViewResult;

/// Writes a read result in a machine-readable format.
///
/// Summary output goes through [`super::print_summary`] instead; asking for it
/// here writes the JSON form.
pub fn export_view(
    result: &ViewResult,
    format: OutputFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Summary | OutputFormat::Json => export_json(result, pretty, output),
    }
}

fn export_json(result: &ViewResult, pretty: bool, output: &mut dyn Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}
