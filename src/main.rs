use clap::error::ErrorKind;
use clap::{Arg, ArgAction, Command, arg, value_parser};
use std::sync::Arc;

use crate::config::{DEFAULT_RETENTION, RunConfig};
use crate::core::archive::Archiver;
use crate::core::notify::WebhookNotifier;
use crate::core::run::Orchestrator;
use crate::output::{
    RunProgress, detect_mode_from_args, emit_error, emit_help, is_json_mode, set_output_mode,
};
use crate::storage_clients::{build_remote_store, store_backend_ids, store_backends_help};
use crate::utils::{DEFAULT_LOG_LEVEL, handle_error, init_logging};

mod config;
mod core;
mod errors;
mod output;
mod storage_clients;
mod utils;

pub(crate) fn cli() -> Command {
    Command::new("rotback")
        .about("Archive a project directory, upload it off-site, rotate old copies and report the result.")
        .arg(
            Arg::new("project-dir")
                .long("project-dir")
                .value_name("PROJECT_DIR")
                .help("Directory to back up")
                .required(true),
        )
        .arg(
            Arg::new("project-name")
                .long("project-name")
                .value_name("PROJECT_NAME")
                .help("Project name used in the archive file name")
                .required(true),
        )
        .arg(arg!(--remote <REMOTE> "Remote storage name (meaning depends on --backend)").required(true))
        .arg(
            Arg::new("remote-path")
                .long("remote-path")
                .value_name("REMOTE_PATH")
                .help("Path inside the remote storage")
                .required(true),
        )
        .arg(
            arg!(--retention <RETENTION> "Number of backups to retain")
                .required(false)
                .value_parser(value_parser!(usize))
                .long_help(format!(
                    "Number of most recent backups to keep in the remote path (default: {})",
                    DEFAULT_RETENTION
                )),
        )
        .arg(
            Arg::new("webhook-url")
                .long("webhook-url")
                .value_name("WEBHOOK_URL")
                .help("Webhook URL for notifications")
                .required(false),
        )
        .arg(
            Arg::new("no-notify")
                .long("no-notify")
                .help("Disable webhook notification")
                .action(ArgAction::SetTrue),
        )
        .arg(
            arg!(--backend <BACKEND> "Remote storage backend")
                .required(false)
                .value_parser(store_backend_ids())
                .default_value("rclone")
                .long_help(store_backends_help()),
        )
        .arg(
            arg!(--format <FORMAT> "Archive format")
                .required(false)
                .value_parser(["tar.gz", "tar.zst"])
                .default_value("tar.gz"),
        )
        .arg(
            Arg::new("temp-dir")
                .long("temp-dir")
                .value_name("TEMP_DIR")
                .help("Directory for the local archive (default: the system temp directory)")
                .required(false),
        )
        .arg(
            Arg::new("keep-local")
                .long("keep-local")
                .help("Keep the local archive after a successful upload")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("rclone-bin")
                .long("rclone-bin")
                .value_name("RCLONE_BIN")
                .help("rclone executable (only for the rclone backend)")
                .default_value("rclone"),
        )
        .arg(
            Arg::new("s3-region")
                .long("s3-region")
                .value_name("S3_REGION")
                .help("Region for the S3 backend (default: AWS region chain, then us-east-1)")
                .required(false),
        )
        .arg(
            Arg::new("s3-endpoint")
                .long("s3-endpoint")
                .value_name("S3_ENDPOINT")
                .help("Custom endpoint for S3 compatible storage")
                .required(false),
        )
        .arg(
            arg!(--mode <MODE> "Output mode")
                .required(false)
                .value_parser(["interactive", "json"])
                .default_value("interactive"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LOG_LEVEL")
                .help("Diagnostic log filter when RUST_LOG is not set")
                .default_value(DEFAULT_LOG_LEVEL),
        )
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    set_output_mode(detect_mode_from_args(&args));

    let matches = match cli().try_get_matches_from(&args) {
        Ok(matches) => matches,
        Err(e) if is_json_mode() => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                emit_help(e.to_string());
                std::process::exit(0);
            }
            _ => emit_error(&e.to_string(), "invalid_arguments"),
        },
        Err(e) => e.exit(),
    };

    init_logging(
        matches
            .get_one::<String>("log-level")
            .map(|level| level.as_str())
            .unwrap_or(DEFAULT_LOG_LEVEL),
    );

    let config = match RunConfig::from_matches(&matches) {
        Ok(config) => config,
        Err(e) => handle_error(e.to_string(), None),
    };

    let store = match build_remote_store(&config.backend, &config.target) {
        Ok(store) => store,
        Err(e) => handle_error(e, None),
    };

    let orchestrator = Orchestrator::new(
        Archiver::new(&config.temp_dir, config.format),
        store,
        Arc::new(WebhookNotifier::new()),
    );

    let progress = RunProgress::for_current_mode();

    match orchestrator.run(&config, &progress).await {
        Ok(report) => progress.finish(&report),
        Err(e) => handle_error(format!("Backup failed: {}", e), Some(progress.bar())),
    }
}
