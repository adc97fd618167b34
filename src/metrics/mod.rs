use anyhow::Result;
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Opts, Registry, TextEncoder};

use crate::model::DelayCause;

/// Simulation metrics, grounded in the teacher's `AppMetrics` pattern but
/// scoped to this domain and rendered once at the end of a run rather than
/// scraped from a live endpoint (spec §1 non-goal: real-time operation).
#[derive(Debug)]
pub struct AppMetrics {
    pub trains_generated_total: IntCounter,
    pub trains_finished_total: IntGauge,
    pub trains_delayed_total: IntGauge,
    pub network_throughput_trains_per_hour: Gauge,
    pub average_delay_seconds: Gauge,
    pub disruptions_active: IntGauge,
    pub signal_holds_total: IntCounter,
    pub crossing_holds_total: IntCounter,
    pub platform_holds_total: IntCounter,
    registry: Registry,
}

impl AppMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let trains_generated_total = IntCounter::with_opts(Opts::new(
            "trains_generated_total",
            "Total number of trains introduced into the simulation",
        ))?;
        let trains_finished_total = IntGauge::with_opts(Opts::new(
            "trains_finished_total",
            "Number of trains that have reached their destination",
        ))?;
        let trains_delayed_total = IntGauge::with_opts(Opts::new(
            "trains_delayed_total",
            "Number of trains currently carrying nonzero delay",
        ))?;
        let network_throughput_trains_per_hour = Gauge::with_opts(Opts::new(
            "network_throughput_trains_per_hour",
            "Finished trains per hour of virtual time",
        ))?;
        let average_delay_seconds = Gauge::with_opts(Opts::new(
            "average_delay_seconds",
            "Average total delay across finished trains",
        ))?;
        let disruptions_active = IntGauge::with_opts(Opts::new(
            "disruptions_active",
            "Number of currently active disruptions",
        ))?;
        let signal_holds_total = IntCounter::with_opts(Opts::new(
            "signal_holds_total",
            "Total number of holds attributed to a red signal",
        ))?;
        let crossing_holds_total = IntCounter::with_opts(Opts::new(
            "crossing_holds_total",
            "Total number of holds attributed to single-line path contention",
        ))?;
        let platform_holds_total = IntCounter::with_opts(Opts::new(
            "platform_holds_total",
            "Total number of holds attributed to platform contention",
        ))?;

        registry.register(Box::new(trains_generated_total.clone()))?;
        registry.register(Box::new(trains_finished_total.clone()))?;
        registry.register(Box::new(trains_delayed_total.clone()))?;
        registry.register(Box::new(network_throughput_trains_per_hour.clone()))?;
        registry.register(Box::new(average_delay_seconds.clone()))?;
        registry.register(Box::new(disruptions_active.clone()))?;
        registry.register(Box::new(signal_holds_total.clone()))?;
        registry.register(Box::new(crossing_holds_total.clone()))?;
        registry.register(Box::new(platform_holds_total.clone()))?;

        Ok(Self {
            trains_generated_total,
            trains_finished_total,
            trains_delayed_total,
            network_throughput_trains_per_hour,
            average_delay_seconds,
            disruptions_active,
            signal_holds_total,
            crossing_holds_total,
            platform_holds_total,
            registry,
        })
    }

    pub fn record_hold_opened(&self, cause: DelayCause) {
        match cause {
            DelayCause::Signal => self.signal_holds_total.inc(),
            DelayCause::Crossing => self.crossing_holds_total.inc(),
            DelayCause::Platform => self.platform_holds_total.inc(),
        }
    }

    /// Renders the registry in Prometheus text exposition format.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
