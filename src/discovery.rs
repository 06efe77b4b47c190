use indexmap::IndexMap;
use log::debug;
use regex::Regex;

use crate::error::{Result, TimelineError};
use crate::registry::Job;

/// Compile a component pattern, requiring exactly one capture group.
///
/// # Errors
///
/// Returns [`TimelineError::PatternSyntax`] when the pattern does not compile
/// and [`TimelineError::CaptureGroups`] when it has zero or several groups.
pub fn validate_pattern(pattern: &str) -> Result<Regex> {
    let regex = Regex::new(pattern).map_err(|source| TimelineError::PatternSyntax {
        pattern: pattern.to_string(),
        source,
    })?;

    // captures_len counts the implicit whole-match group.
    let found = regex.captures_len() - 1;
    if found != 1 {
        return Err(TimelineError::CaptureGroups {
            pattern: pattern.to_string(),
            found,
        });
    }
    Ok(regex)
}

/// Jobs whose full name matches `pattern`, keyed by the captured value.
///
/// The match may occur anywhere in the name. When two jobs capture the same
/// value the later job replaces the earlier one.
///
/// # Errors
///
/// Fails as [`validate_pattern`] does.
pub fn match_components<'r>(
    pattern: &str,
    jobs: impl IntoIterator<Item = &'r Job>,
) -> Result<IndexMap<String, &'r Job>> {
    let regex = validate_pattern(pattern)?;

    let mut matches = IndexMap::new();
    for job in jobs {
        let Some(captured) = regex.captures(&job.name).and_then(|c| c.get(1)) else {
            continue;
        };
        matches.insert(captured.as_str().to_string(), job);
    }

    debug!("Pattern {pattern} matched {} jobs", matches.len());
    Ok(matches)
}
