mod local;
mod rclone;
mod remote_store;
mod s3;

use crate::errors::StoreError;
use std::path::Path;
use std::sync::Arc;

pub use remote_store::RemoteStore;

/// Where the objects of one project live, plus backend specific knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreTarget {
    pub remote: String,
    pub remote_path: String,
    pub rclone_bin: String,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
}

pub struct StoreDefinition {
    pub id: &'static str,
    pub help: &'static str,
    pub build_store: fn(&StoreTarget) -> Result<Arc<dyn RemoteStore>, String>,
}

const STORE_DEFINITIONS: &[StoreDefinition] =
    &[rclone::DEFINITION, local::DEFINITION, s3::DEFINITION];

pub fn store_definition(id: &str) -> Option<&'static StoreDefinition> {
    STORE_DEFINITIONS
        .iter()
        .find(|definition| definition.id == id)
}

pub fn store_backend_ids() -> Vec<&'static str> {
    STORE_DEFINITIONS
        .iter()
        .map(|definition| definition.id)
        .collect()
}

pub fn store_backends_help() -> String {
    STORE_DEFINITIONS
        .iter()
        .map(|definition| format!("'{}': {}", definition.id, definition.help))
        .collect::<Vec<String>>()
        .join("; ")
}

pub fn build_remote_store(
    backend: &str,
    target: &StoreTarget,
) -> Result<Arc<dyn RemoteStore>, String> {
    let definition = store_definition(backend).ok_or_else(|| {
        format!(
            "Unknown backend '{}'. Available backends: {}",
            backend,
            store_backend_ids().join(", ")
        )
    })?;

    (definition.build_store)(target)
}

pub(crate) fn object_name(local_file: &Path) -> Result<String, StoreError> {
    local_file
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| {
            StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} has no file name", local_file.display()),
            ))
        })
}

/// Joins a namespace path and an object name with a single `/`.
pub(crate) fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');

    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(remote: &str, remote_path: &str) -> StoreTarget {
        StoreTarget {
            remote: remote.to_string(),
            remote_path: remote_path.to_string(),
            rclone_bin: "rclone".to_string(),
            s3_region: None,
            s3_endpoint: None,
        }
    }

    #[test]
    fn join_key_handles_empty_and_trailing_slash() {
        assert_eq!(join_key("", "a.tar.gz"), "a.tar.gz");
        assert_eq!(join_key("backups", "a.tar.gz"), "backups/a.tar.gz");
        assert_eq!(join_key("backups/", "a.tar.gz"), "backups/a.tar.gz");
    }

    #[test]
    fn registry_lists_every_backend() {
        assert_eq!(store_backend_ids(), vec!["rclone", "local", "s3"]);
        assert!(store_backends_help().contains("'local'"));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let err = build_remote_store("ftp", &target("r", "p")).err().unwrap();
        assert!(err.contains("rclone, local, s3"), "{}", err);
    }

    #[test]
    fn builds_rclone_store_with_remote_colon_path_ids() {
        let store = build_remote_store("rclone", &target("gdrive", "backups/site")).unwrap();
        assert_eq!(
            store.object_id("site-20240101-000000.tar.gz"),
            "gdrive:backups/site/site-20240101-000000.tar.gz"
        );
    }

    #[test]
    fn object_name_is_the_file_name() {
        assert_eq!(
            object_name(Path::new("/tmp/site-20240101-000000.tar.gz")).unwrap(),
            "site-20240101-000000.tar.gz"
        );
        assert!(object_name(Path::new("/")).is_err());
    }
}
