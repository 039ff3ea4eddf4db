use crate::errors::StoreError;
use async_trait::async_trait;
use std::path::Path;

/// List, upload and delete of named objects inside one remote namespace.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Identifier of `name` inside the namespace, as shown to operators.
    fn object_id(&self, name: &str) -> String;

    /// Copies `local_file` into the namespace under its own file name and
    /// returns the object id.
    async fn upload(&self, local_file: &Path) -> Result<String, StoreError>;

    /// Names of the objects directly inside the namespace.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    async fn delete(&self, name: &str) -> Result<(), StoreError>;
}
