//! Prints the widget rows for the current battery reading.

use std::process::ExitCode;

use chrono::Utc;
use juice_core::registry::SystemRegistry;
use juice_core::widget::{self, Timeline};
use juice_core::{config, BatteryReading, BatteryService};
use tracing::warn;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: juice-status [--json] [--write]

  --json   print the widget timeline as JSON
  --write  write the widget timeline to the configured snapshot path
  --help   show this message";

fn main() -> ExitCode {
    // stdout carries the rows, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut json = false;
    let mut write = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            "--write" => write = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return ExitCode::SUCCESS;
            }
            other => {
                eprintln!("unknown argument: {other}\n\n{USAGE}");
                return ExitCode::from(2);
            }
        }
    }

    let cfg = config::load();
    let locale = cfg.locale();

    let reading = match BatteryService::new(SystemRegistry::new()).read() {
        Ok(reading) => reading,
        Err(e) => {
            warn!(error = %e, "battery unavailable");
            BatteryReading::default()
        }
    };

    let rows = widget::rows(&reading, &locale);
    let timeline = Timeline::build(
        Utc::now(),
        cfg.widget.entries,
        cfg.widget.spacing_minutes,
        &rows,
    );

    if write {
        let path = cfg.snapshot_path();
        if let Err(e) = timeline.write(&path) {
            eprintln!("failed to write {}: {e}", path.display());
            return ExitCode::FAILURE;
        }
    }

    if json {
        match serde_json::to_string_pretty(&timeline) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("failed to encode timeline: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        for row in &rows {
            println!("{}: {}", row.title, row.value);
        }
    }

    ExitCode::SUCCESS
}
