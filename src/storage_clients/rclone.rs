use crate::errors::StoreError;
use crate::storage_clients::{RemoteStore, StoreDefinition, StoreTarget, join_key, object_name};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;

/// Talks to a configured rclone remote by running the rclone binary.
pub struct RcloneStore {
    binary: String,
    remote: String,
    remote_path: String,
}

impl RcloneStore {
    pub fn new(
        binary: impl Into<String>,
        remote: impl Into<String>,
        remote_path: impl Into<String>,
    ) -> Self {
        Self {
            binary: binary.into(),
            remote: remote.into(),
            remote_path: remote_path.into(),
        }
    }

    fn namespace(&self) -> String {
        format!("{}:{}", self.remote, self.remote_path)
    }

    async fn run(&self, args: &[String]) -> Result<Vec<u8>, StoreError> {
        let command = format!("{} {}", self.binary, args.join(" "));
        tracing::debug!(%command, "running rclone");

        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|source| StoreError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(StoreError::Command {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl RemoteStore for RcloneStore {
    fn object_id(&self, name: &str) -> String {
        format!("{}:{}", self.remote, join_key(&self.remote_path, name))
    }

    async fn upload(&self, local_file: &Path) -> Result<String, StoreError> {
        let object_id = self.object_id(&object_name(local_file)?);

        // copyto writes exactly this object; copy would treat it as a directory.
        self.run(&[
            "copyto".to_string(),
            local_file.to_string_lossy().to_string(),
            object_id.clone(),
        ])
        .await?;

        Ok(object_id)
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let stdout = self
            .run(&[
                "lsf".to_string(),
                "--files-only".to_string(),
                self.namespace(),
            ])
            .await?;

        Ok(String::from_utf8_lossy(&stdout)
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(|line| line.to_string())
            .collect())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.run(&["deletefile".to_string(), self.object_id(name)])
            .await?;
        Ok(())
    }
}

fn build_store(target: &StoreTarget) -> Result<Arc<dyn RemoteStore>, String> {
    if target.remote.is_empty() {
        return Err("Missing required field: remote".to_string());
    }

    Ok(Arc::new(RcloneStore::new(
        target.rclone_bin.clone(),
        target.remote.clone(),
        target.remote_path.clone(),
    )))
}

pub const DEFINITION: StoreDefinition = StoreDefinition {
    id: "rclone",
    help: "--remote is a configured rclone remote name",
    build_store,
};
