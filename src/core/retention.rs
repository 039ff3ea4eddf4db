//! Retention policy for remote archives.
//!
//! Object names must come from a scheme where lexical order equals creation
//! order. `{project}-{YYYYMMDD-HHMMSS}.{ext}` satisfies this as long as every
//! object in the namespace shares the same `{project}-` prefix.

use regex::Regex;

/// Returns the names to delete so that only the newest `retention` remain.
///
/// Names are sorted lexically (stable, so duplicates keep a deterministic
/// order) and the oldest surplus is returned in that order.
pub(crate) fn select_for_deletion(object_names: &[String], retention: usize) -> Vec<String> {
    if object_names.len() <= retention {
        return Vec::new();
    }

    let mut sorted = object_names.to_vec();
    sorted.sort();

    let surplus = sorted.len() - retention;
    sorted.truncate(surplus);
    sorted
}

/// Matches the names this tool produces for one project. `None` when the
/// name is too large for the regex size limit.
fn project_object_pattern(project_name: &str) -> Option<Regex> {
    let pattern = format!(r"^{}-[0-9]{{8}}-[0-9]{{6}}\.", regex::escape(project_name));
    Regex::new(&pattern).ok()
}

/// Names in a listing that were not produced for `project_name`.
pub(crate) fn foreign_objects<'a>(object_names: &'a [String], project_name: &str) -> Vec<&'a str> {
    let Some(pattern) = project_object_pattern(project_name) else {
        tracing::debug!(project = %project_name, "no object pattern for project, skipping foreign object check");
        return Vec::new();
    };

    object_names
        .iter()
        .filter(|name| !pattern.is_match(name))
        .map(|name| name.as_str())
        .collect()
}
