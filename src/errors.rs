use std::path::PathBuf;
use thiserror::Error;

/// Failures while producing the local archive. These abort the run.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Project directory not found: {0}")]
    SourceMissing(PathBuf),

    #[error("Project path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to write archive {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive task failed: {0}")]
    Task(String),
}

/// Failures reported by a remote store. Never fatal to a run.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}: {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Missing required argument: --{0}")]
    Missing(&'static str),

    #[error("Invalid value for --{flag}: {reason}")]
    Invalid { flag: &'static str, reason: String },
}
