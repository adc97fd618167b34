use clap::{Parser, Subcommand};
use railsim::{config::AppConfig, run, RunOptions};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "railsim", about = "Railway network discrete-event simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a simulation from a directory of CSV input files.
    Run {
        /// Directory containing stations.csv, sections.csv, trains.csv, disruptions.csv.
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Optional TOML config file overriding the defaults.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Where to write the exported event log CSV.
        #[arg(long, default_value = "simulation_events.csv")]
        events_out: PathBuf,

        /// If given, also writes the final report as JSON.
        #[arg(long)]
        report_out: Option<PathBuf>,

        /// Where to write the Prometheus text-format metrics snapshot.
        #[arg(long, default_value = "metrics.prom")]
        metrics_out: PathBuf,

        /// Seed the RNG for deterministic runs.
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { data_dir, config, events_out, report_out, metrics_out, seed } => {
            let mut app_config = match config {
                Some(path) => AppConfig::from_file(&path)?,
                None => AppConfig::default(),
            };
            app_config.apply_env_overrides();
            app_config.validate()?;

            let filter = tracing_subscriber::EnvFilter::try_new(&app_config.logging.level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
            let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
            if app_config.logging.json_format {
                subscriber.json().init();
            } else {
                subscriber.init();
            }

            info!(data_dir = %data_dir.display(), ?seed, "starting simulation run");

            let outcome = run(RunOptions { data_dir, config: app_config, seed })?;

            outcome.log.export_csv(&events_out)?;
            info!(path = %events_out.display(), events = outcome.log.len(), "event log exported");

            if let Some(report_out) = &report_out {
                let report_json = serde_json::to_string_pretty(&outcome.report)?;
                std::fs::write(report_out, report_json)?;
                info!(path = %report_out.display(), "report written");
            }

            std::fs::write(&metrics_out, &outcome.metrics_text)?;
            info!(path = %metrics_out.display(), "metrics written");

            outcome.report.print_summary();
            Ok(())
        }
    }
}
