use crate::errors::StoreError;
use crate::storage_clients::{RemoteStore, StoreDefinition, StoreTarget, join_key, object_name};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3 as s3;
use aws_types::region::Region;
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;

const DEFAULT_REGION: &str = "us-east-1";

pub struct S3Store {
    client: OnceCell<s3::Client>,
    bucket: String,
    prefix: String,
    region: Option<String>,
    endpoint: Option<String>,
}

pub struct S3StoreConfig {
    pub bucket: String,
    pub prefix: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

impl S3Store {
    /// The client is built on first use from the standard AWS chain
    /// (environment, profiles, SSO, web identity, container and instance roles).
    pub fn new(config: S3StoreConfig) -> Self {
        Self {
            client: OnceCell::new(),
            bucket: config.bucket,
            prefix: config.prefix.trim_matches('/').to_string(),
            region: config.region,
            endpoint: config.endpoint,
        }
    }

    async fn client(&self) -> &s3::Client {
        self.client
            .get_or_init(|| async {
                let mut loader = aws_config::defaults(BehaviorVersion::latest())
                    .region(region_provider(self.region.clone()));
                if let Some(endpoint) = &self.endpoint {
                    tracing::debug!(endpoint = %endpoint, "using custom S3 endpoint");
                    loader = loader.endpoint_url(endpoint);
                }
                let shared_config = loader.load().await;

                s3::Client::from_conf(s3::config::Builder::from(&shared_config).build())
            })
            .await
    }

    fn key(&self, name: &str) -> String {
        join_key(&self.prefix, name)
    }

    fn list_prefix(&self) -> String {
        if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.prefix)
        }
    }
}

#[async_trait]
impl RemoteStore for S3Store {
    fn object_id(&self, name: &str) -> String {
        format!("s3://{}/{}", self.bucket, self.key(name))
    }

    async fn upload(&self, local_file: &Path) -> Result<String, StoreError> {
        let name = object_name(local_file)?;
        let data = tokio::fs::read(local_file).await?;

        self.client()
            .await
            .put_object()
            .bucket(&self.bucket)
            .key(self.key(&name))
            .body(Bytes::from(data).into())
            .send()
            .await
            .map_err(|e| StoreError::S3(e.to_string()))?;

        Ok(self.object_id(&name))
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut files = Vec::new();
        let mut continuation_token = None;
        let prefix = self.list_prefix();

        loop {
            let mut req = self
                .client()
                .await
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&prefix)
                .delimiter("/");

            if let Some(ref token) = continuation_token {
                req = req.continuation_token(token);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| StoreError::S3(e.to_string()))?;

            for obj in resp.contents() {
                if let Some(name) = obj.key().and_then(|key| key.strip_prefix(&prefix)) {
                    if !name.is_empty() {
                        files.push(name.to_string());
                    }
                }
            }

            continuation_token = resp.next_continuation_token().map(|ct| ct.to_string());

            if continuation_token.is_none() {
                break;
            }
        }

        Ok(files)
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.client()
            .await
            .delete_object()
            .bucket(&self.bucket)
            .key(self.key(name))
            .send()
            .await
            .map_err(|e| StoreError::S3(e.to_string()))?;
        Ok(())
    }
}

fn build_store(target: &StoreTarget) -> Result<Arc<dyn RemoteStore>, String> {
    if target.remote.is_empty() {
        return Err("Missing required field: remote (the bucket)".to_string());
    }

    Ok(Arc::new(S3Store::new(S3StoreConfig {
        bucket: target.remote.clone(),
        prefix: target.remote_path.clone(),
        region: target.s3_region.clone(),
        endpoint: target.s3_endpoint.clone(),
    })))
}

/// `--s3-region`, then the SDK's region chain, then `us-east-1`.
fn region_provider(explicit: Option<String>) -> RegionProviderChain {
    RegionProviderChain::first_try(explicit.map(Region::new))
        .or_default_provider()
        .or_else(Region::new(DEFAULT_REGION))
}

pub const DEFINITION: StoreDefinition = StoreDefinition {
    id: "s3",
    help: "--remote is a bucket and --remote-path a key prefix",
    build_store,
};

#[cfg(test)]
mod tests {
    use super::*;
    use aws_config::meta::region::ProvideRegion;

    fn store(prefix: &str) -> S3Store {
        S3Store::new(S3StoreConfig {
            bucket: "backups".to_string(),
            prefix: prefix.to_string(),
            region: None,
            endpoint: Some("http://127.0.0.1:9000".to_string()),
        })
    }

    #[test]
    fn keys_live_under_the_prefix() {
        let store = store("/projects/site/");
        assert_eq!(store.key("a.tar.gz"), "projects/site/a.tar.gz");
        assert_eq!(store.list_prefix(), "projects/site/");
        assert_eq!(store.object_id("a.tar.gz"), "s3://backups/projects/site/a.tar.gz");
    }

    #[test]
    fn empty_prefix_means_bucket_root() {
        let store = store("");
        assert_eq!(store.key("a.tar.gz"), "a.tar.gz");
        assert_eq!(store.list_prefix(), "");
    }

    #[test]
    fn building_the_store_does_not_resolve_credentials() {
        let store = store("site");
        assert!(store.client.get().is_none());
    }

    #[tokio::test]
    async fn explicit_region_wins_over_the_chain() {
        let region = region_provider(Some("eu-west-1".to_string())).region().await;
        assert_eq!(region, Some(Region::new("eu-west-1")));
    }

    #[test]
    fn registry_builds_an_s3_store_without_a_region_flag() {
        let target = StoreTarget {
            remote: "backups".to_string(),
            remote_path: "site".to_string(),
            rclone_bin: "rclone".to_string(),
            s3_region: None,
            s3_endpoint: None,
        };
        let store = build_store(&target).unwrap();
        assert_eq!(store.object_id("a.tar.gz"), "s3://backups/site/a.tar.gz");
    }
}
