use crate::errors::StoreError;
use crate::storage_clients::{RemoteStore, StoreDefinition, StoreTarget, object_name};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// A directory on a mounted filesystem acting as the remote namespace.
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    fn object_id(&self, name: &str) -> String {
        self.path.join(name).display().to_string()
    }

    async fn upload(&self, local_file: &Path) -> Result<String, StoreError> {
        let name = object_name(local_file)?;

        if !self.path.exists() {
            tokio::fs::create_dir_all(&self.path).await?;
        }

        tokio::fs::copy(local_file, self.path.join(&name)).await?;

        Ok(self.object_id(&name))
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut files = Vec::new();

        if !self.path.exists() {
            return Ok(files);
        }

        for entry in WalkDir::new(&self.path).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| StoreError::Io(e.into()))?;
            if entry.file_type().is_file() {
                files.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        Ok(files)
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        tokio::fs::remove_file(self.path.join(name)).await?;
        Ok(())
    }
}

fn build_store(target: &StoreTarget) -> Result<Arc<dyn RemoteStore>, String> {
    if target.remote.is_empty() {
        return Err("Missing required field: remote".to_string());
    }

    let path = Path::new(&target.remote).join(target.remote_path.trim_start_matches('/'));

    Ok(Arc::new(LocalStore::new(path)))
}

pub const DEFINITION: StoreDefinition = StoreDefinition {
    id: "local",
    help: "--remote is a base directory and --remote-path a folder inside it",
    build_store,
};
