use crate::core::run::RunReport;
use bytesize::ByteSize;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputMode {
    Interactive,
    Json,
}

static OUTPUT_MODE: OnceLock<OutputMode> = OnceLock::new();

fn parse_mode(value: &str) -> OutputMode {
    match value.to_ascii_lowercase().as_str() {
        "interactive" => OutputMode::Interactive,
        _ => OutputMode::Json,
    }
}

/// Reads `--mode` before clap runs so parse errors already use the right format.
pub fn detect_mode_from_args(args: &[String]) -> OutputMode {
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--mode" {
            return iter
                .next()
                .map(|value| parse_mode(value))
                .unwrap_or(OutputMode::Json);
        } else if let Some(value) = arg.strip_prefix("--mode=") {
            return parse_mode(value);
        }
    }

    OutputMode::Interactive
}

pub fn set_output_mode(mode: OutputMode) {
    let _ = OUTPUT_MODE.set(mode);
}

pub fn output_mode() -> OutputMode {
    *OUTPUT_MODE.get_or_init(|| OutputMode::Interactive)
}

pub fn is_json_mode() -> bool {
    output_mode() == OutputMode::Json
}

#[derive(Serialize)]
struct Event<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: &'a str,
    data: T,
}

#[derive(Serialize)]
struct ErrorData<'a> {
    message: &'a str,
    code: &'a str,
}

#[derive(Serialize)]
struct TextData {
    text: String,
}

#[derive(Serialize)]
struct ProgressData<'a> {
    message: &'a str,
}

fn emit_event<T: Serialize>(kind: &'static str, data: &T, to_stderr: bool) {
    let event = Event { kind, data };
    let json = serde_json::to_string(&event).unwrap_or_else(|e| {
        format!(
            "{{\"type\":\"error\",\"data\":{{\"message\":{:?},\"code\":\"serialization_error\"}}}}",
            e.to_string()
        )
    });

    if to_stderr {
        eprintln!("{json}");
    } else {
        println!("{json}");
    }
}

pub fn emit_output<T: Serialize>(data: &T) {
    emit_event("output", data, false);
}

pub fn emit_help(text: String) {
    emit_event("help", &TextData { text }, false);
}

pub fn emit_progress_message(message: &str) {
    emit_event("progress", &ProgressData { message }, false);
}

pub fn emit_error(message: &str, code: &str) -> ! {
    let payload = ErrorData { message, code };
    emit_event("error", &payload, true);
    std::process::exit(1);
}

/// Shows which stage a run is in: a spinner on a terminal, events in JSON mode.
pub struct RunProgress {
    bar: ProgressBar,
    json: bool,
}

impl RunProgress {
    pub fn for_current_mode() -> Self {
        if is_json_mode() {
            return Self {
                bar: ProgressBar::hidden(),
                json: true,
            };
        }

        let bar = ProgressBar::new(100);
        bar.enable_steady_tick(Duration::from_millis(100));
        if let Ok(spinner) = ProgressStyle::with_template("{spinner:.green} {msg}") {
            bar.set_style(spinner);
        }

        Self { bar, json: false }
    }

    #[cfg(test)]
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
            json: false,
        }
    }

    pub fn stage(&self, message: &str) {
        if self.json {
            emit_progress_message(message);
        } else {
            self.bar.set_message(message.to_string());
        }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }

    pub fn finish(&self, report: &RunReport) {
        if self.json {
            emit_output(report);
            return;
        }

        let elapsed = self.bar.elapsed();
        let ok = report.upload.ok;
        let prefix_style = if ok {
            "{prefix:.green} {msg}"
        } else {
            "{prefix:.yellow} {msg}"
        };
        if let Ok(done) = ProgressStyle::with_template(prefix_style) {
            self.bar.set_style(done);
        }
        self.bar.set_prefix(if ok { "✓" } else { "!" });
        self.bar.finish_with_message(summary_line(report, elapsed));

        if !ok {
            eprintln!(
                "{} upload failed: {}",
                style("Warning:").yellow().bold(),
                report.upload.error
            );
        }
    }
}

fn summary_line(report: &RunReport, elapsed: Duration) -> String {
    let upload = if report.upload.ok {
        format!("uploaded to {}", report.upload.remote_object_id)
    } else {
        "upload failed".to_string()
    };

    format!(
        "Backup {} ({}) {}, {} old backup(s) deleted ({:.2?})",
        report.timestamp,
        ByteSize::b(report.archive_size),
        upload,
        report.deleted_objects.len(),
        elapsed,
    )
}
