use crate::core::archive::ArchiveFormat;
use crate::errors::ConfigError;
use crate::storage_clients::StoreTarget;
use clap::ArgMatches;
use std::path::PathBuf;

pub(crate) const DEFAULT_RETENTION: usize = 7;

/// Everything one run needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunConfig {
    pub(crate) project_dir: PathBuf,
    pub(crate) project_name: String,
    pub(crate) backend: String,
    pub(crate) target: StoreTarget,
    pub(crate) retention: usize,
    pub(crate) webhook_url: Option<String>,
    pub(crate) no_notify: bool,
    pub(crate) format: ArchiveFormat,
    pub(crate) temp_dir: PathBuf,
    pub(crate) keep_local: bool,
}

impl RunConfig {
    pub(crate) fn from_matches(matches: &ArgMatches) -> Result<Self, ConfigError> {
        let project_dir = matches
            .get_one::<String>("project-dir")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("project-dir"))?;

        let project_name = required(matches, "project-name")?;
        if project_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                flag: "project-name",
                reason: "must not be empty".to_string(),
            });
        }

        let remote = required(matches, "remote")?;
        let remote_path = required(matches, "remote-path")?;

        let retention = matches
            .get_one::<usize>("retention")
            .copied()
            .unwrap_or(DEFAULT_RETENTION);

        let webhook_url = matches
            .get_one::<String>("webhook-url")
            .filter(|url| !url.is_empty())
            .cloned();

        let format_id = matches
            .get_one::<String>("format")
            .map(|s| s.as_str())
            .unwrap_or("tar.gz");
        let format = ArchiveFormat::from_id(format_id).ok_or_else(|| ConfigError::Invalid {
            flag: "format",
            reason: format!("unknown archive format '{}'", format_id),
        })?;

        let temp_dir = matches
            .get_one::<String>("temp-dir")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        Ok(Self {
            project_dir,
            project_name,
            backend: matches
                .get_one::<String>("backend")
                .cloned()
                .unwrap_or_else(|| "rclone".to_string()),
            target: StoreTarget {
                remote,
                remote_path,
                rclone_bin: matches
                    .get_one::<String>("rclone-bin")
                    .cloned()
                    .unwrap_or_else(|| "rclone".to_string()),
                s3_region: matches.get_one::<String>("s3-region").cloned(),
                s3_endpoint: matches.get_one::<String>("s3-endpoint").cloned(),
            },
            retention,
            webhook_url,
            no_notify: matches.get_flag("no-notify"),
            format,
            temp_dir,
            keep_local: matches.get_flag("keep-local"),
        })
    }
}

fn required(matches: &ArgMatches, flag: &'static str) -> Result<String, ConfigError> {
    matches
        .get_one::<String>(flag)
        .cloned()
        .ok_or(ConfigError::Missing(flag))
}
