use crate::output::{emit_error, is_json_mode};
use console::style;
use indicatif::ProgressBar;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Prints the error in the current output mode and exits with status 1.
pub fn handle_error(message: String, pb: Option<&ProgressBar>) -> ! {
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if is_json_mode() {
        emit_error(&message, "error");
    }

    eprintln!("{} {}", style("Error:").red().bold(), message);
    std::process::exit(1);
}

/// `RUST_LOG` wins over `level`. Diagnostics go to stderr.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!is_json_mode()),
        )
        .try_init();
}
