//! Railway network discrete-event simulator: given a static model
//! (stations, directional sections, fixed-block signalling) and a
//! population of trains with routes, advances a virtual clock over a
//! time-ordered event queue and produces a movement trace, per-train
//! delay attribution, and network throughput.

pub mod config;
pub mod error;
pub mod kernel;
pub mod loader;
pub mod logsink;
pub mod metrics;
pub mod model;
pub mod motion;
pub mod report;

use anyhow::{Context, Result};
use kernel::Simulator;
use std::path::{Path, PathBuf};

pub struct RunOptions {
    pub data_dir: PathBuf,
    pub config: config::AppConfig,
    pub seed: Option<u64>,
}

pub struct RunOutcome {
    pub report: report::SimulationReport,
    pub log: logsink::EventLog,
    pub metrics_text: String,
}

/// Loads the static model from `options.data_dir`, generates blocks,
/// drives the kernel to completion, and builds the final report. The
/// single entrypoint shared by the CLI binary and integration tests.
pub fn run(options: RunOptions) -> Result<RunOutcome> {
    let paths = &options.config.paths;
    let data_dir = &options.data_dir;

    let stations = loader::load_stations(resolve(data_dir, &paths.stations_file))
        .context("loading stations")?;
    let mut sections = loader::load_sections(resolve(data_dir, &paths.sections_file))
        .context("loading sections")?;
    let trains = loader::load_trains(resolve(data_dir, &paths.trains_file))
        .context("loading trains")?;
    let disruptions = loader::load_disruptions(resolve(data_dir, &paths.disruptions_file))
        .context("loading disruptions")?;

    loader::validate_routes(&stations, &sections, &trains).context("validating routes")?;
    loader::blocks::generate_blocks_for_network(&mut sections, &trains);

    let mut sim = Simulator::new(stations, sections, trains, options.config.simulation.clone(), options.seed)
        .context("initializing simulator")?;

    for d in disruptions {
        tracing::info!(
            section = %format!("{}-{}", d.section_u, d.section_v),
            start = d.start_time_s,
            end = d.end_time_s,
            "scheduling static disruption"
        );
        sim.schedule(
            d.start_time_s,
            kernel::EventTag::StartDisruption,
            None,
            kernel::EventMeta { disruption: Some(d.clone()), ..Default::default() },
        );
        sim.schedule(
            d.end_time_s,
            kernel::EventTag::EndDisruption,
            None,
            kernel::EventMeta { disruption: Some(d), ..Default::default() },
        );
    }

    sim.run();

    let trains = sim.trains_snapshot();
    let report = report::SimulationReport::build(&trains, sim.time);

    sim.metrics.trains_delayed_total.set(trains.values().filter(|t| t.total_delay() > 0).count() as i64);
    sim.metrics.network_throughput_trains_per_hour.set(report.throughput_trains_per_hour);
    sim.metrics.average_delay_seconds.set(report.average_delay_s);
    let metrics_text = sim.metrics.render().context("rendering metrics")?;

    Ok(RunOutcome { report, log: sim.into_log(), metrics_text })
}

fn resolve(data_dir: &Path, file: &str) -> PathBuf {
    data_dir.join(file)
}
