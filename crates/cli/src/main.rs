use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use farmwatch_config::Config;
use farmwatch_monitor::{Monitor, Snapshot};
use farmwatch_status::Progress;

#[derive(Debug, Parser)]
#[command(
    name = "farmwatch",
    version,
    about = "Status light for a blockchain node and farmer"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config/default.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one refresh and print the result.
    Status {
        /// Emit the full snapshot as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Refresh on an interval, printing every result.
    Watch {
        /// Seconds between refreshes.
        #[arg(long, default_value_t = 30)]
        interval: u64,
        /// Emit full snapshots as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)?;
    let monitor = Monitor::new(&config)?;

    match cli.command.unwrap_or(Commands::Status { json: false }) {
        Commands::Status { json } => {
            let snapshot = monitor.poll().await?;
            print_snapshot(&snapshot, json)?;
        }
        Commands::Watch { interval, json } => {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
            loop {
                ticker.tick().await;
                match monitor.poll().await {
                    Ok(snapshot) => print_snapshot(&snapshot, json)?,
                    // Data-source failure is not "Unknown" — say so and
                    // keep watching.
                    Err(err) => {
                        warn!(%err, "refresh failed");
                        println!("Error: {err}");
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &Snapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }

    let report = &snapshot.report;
    println!("{}", report.state.label());
    match report.progress {
        Some(Progress::Heights { progress, tip }) => println!("{progress} / {tip}"),
        Some(Progress::Plots { count, total_bytes }) => {
            let noun = if count == 1 { "Plot" } else { "Plots" };
            println!("{count} {noun} / {total_bytes} bytes");
        }
        None => {}
    }

    Ok(())
}
