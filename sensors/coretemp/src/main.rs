//! waittemp: block until every CPU core has cooled to a target temperature.
//!
//! Prints a refreshed per-core table once per second and exits with status
//! 0 once all readable cores are at or below the target.

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;
use env_logger::Env;
use log::debug;
use std::process;
use waittemp_core::{MonitorConfig, SensorError, TerminalScreen};
use waittemp_coretemp::TargetTemperature;

/// Command-line arguments for waittemp.
#[derive(Parser)]
#[command(name = "waittemp")]
#[command(about = "Wait until every CPU core has cooled to a target temperature")]
#[command(version)]
struct Args {
    /// Target temperature in °C (digits only)
    #[arg(value_parser = parse_target)]
    target: TargetTemperature,
}

fn parse_target(s: &str) -> Result<TargetTemperature, String> {
    s.parse().map_err(|e: SensorError| e.to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    // Usage errors exit with 1 rather than clap's 2.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            if let Err(err) = e.print() {
                debug!("failed to print usage error: {err}");
            }
            process::exit(1);
        }
    };

    let config = MonitorConfig::default();
    let screen = TerminalScreen::new(config.default_terminal_width);
    let summary = waittemp_coretemp::wait(&config, screen, args.target)
        .await
        .context("failed to wait for CPU cores to cool down")?;

    debug!(
        "finished at {} after {} samples ({} of {} cores readable)",
        summary.finished,
        summary.samples,
        summary.last.available(),
        summary.last.len()
    );
    Ok(())
}
