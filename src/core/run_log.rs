use crate::core::timestamp::RunTimestamp;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub(crate) const LOG_FILE_NAME: &str = "backup.log";

/// Append-only operator log. Every line is written through a fresh handle so
/// an interrupted run can only lose trailing lines.
#[derive(Debug, Clone)]
pub(crate) struct RunLog {
    path: PathBuf,
    timestamp: RunTimestamp,
}

impl RunLog {
    pub(crate) fn new(path: impl Into<PathBuf>, timestamp: RunTimestamp) -> Self {
        Self {
            path: path.into(),
            timestamp,
        }
    }

    /// `{parent of project dir}/backup.log`
    pub(crate) fn for_project(project_dir: &Path, timestamp: RunTimestamp) -> Self {
        Self::new(log_path_for(project_dir), timestamp)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Writes one `[{timestamp}] {message}` line. A message spanning several
    /// lines is folded onto one, its lines joined with ` | `.
    pub(crate) fn append(&self, message: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let line = single_line(message);
        file.write_all(format!("[{}] {}\n", self.timestamp, line).as_bytes())
    }
}

fn single_line(message: &str) -> String {
    message
        .split(['\n', '\r'])
        .map(str::trim_end)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

pub(crate) fn log_path_for(project_dir: &Path) -> PathBuf {
    let absolute = std::path::absolute(project_dir).unwrap_or_else(|_| project_dir.to_path_buf());
    let trimmed: PathBuf = absolute.components().collect();

    match trimmed.parent() {
        Some(parent) => parent.join(LOG_FILE_NAME),
        None => trimmed.join(LOG_FILE_NAME),
    }
}
