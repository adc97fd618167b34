//! Aggregate throughput and per-cause delay reporting (spec §6, §4.7),
//! supplementing the original source's `analytics.py` with a network-wide
//! delay breakdown by cause.

use crate::model::{DelayCause, Train, TrainStatus};
use serde::Serialize;
use std::collections::HashMap;

pub fn average_delay(trains: &[&Train]) -> f64 {
    if trains.is_empty() {
        return 0.0;
    }
    let total: u64 = trains.iter().map(|t| t.total_delay()).sum();
    total as f64 / trains.len() as f64
}

pub fn throughput(finished_trains: usize, time_window_s: i64) -> f64 {
    if time_window_s == 0 {
        return 0.0;
    }
    (finished_trains as f64 * 3600.0) / time_window_s as f64
}

#[derive(Debug, Serialize)]
pub struct TrainDelayReport {
    pub train_id: String,
    pub priority: i32,
    pub status: TrainStatus,
    pub delays: HashMap<DelayCause, u64>,
    pub total_delay_s: u64,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub total_trains: usize,
    pub finished_trains: usize,
    pub total_time_s: i64,
    pub throughput_trains_per_hour: f64,
    pub average_delay_s: f64,
    pub network_delay_by_cause_s: HashMap<DelayCause, u64>,
    pub per_train: Vec<TrainDelayReport>,
}

impl SimulationReport {
    pub fn build(trains: &HashMap<String, Train>, total_time_s: i64) -> Self {
        let mut ordered: Vec<&Train> = trains.values().collect();
        ordered.sort_by(|a, b| a.train_id.cmp(&b.train_id));

        let finished: Vec<&Train> = ordered
            .iter()
            .copied()
            .filter(|t| t.status == TrainStatus::Finished)
            .collect();

        let mut network_delay_by_cause_s = crate::model::zeroed_delay_map();
        for t in &finished {
            for (cause, secs) in &t.delays {
                *network_delay_by_cause_s.entry(*cause).or_insert(0) += secs;
            }
        }

        let per_train = ordered
            .iter()
            .map(|t| TrainDelayReport {
                train_id: t.train_id.clone(),
                priority: t.priority,
                status: t.status,
                delays: t.delays.clone(),
                total_delay_s: t.total_delay(),
            })
            .collect();

        Self {
            total_trains: ordered.len(),
            finished_trains: finished.len(),
            total_time_s,
            throughput_trains_per_hour: throughput(finished.len(), total_time_s),
            average_delay_s: average_delay(&finished),
            network_delay_by_cause_s,
            per_train,
        }
    }

    pub fn print_summary(&self) {
        println!("{}", "=".repeat(20) + " SIMULATION REPORT " + &"=".repeat(20));
        println!("Total trains generated: {}", self.total_trains);
        println!("Finished trains: {}", self.finished_trains);
        println!(
            "Total simulation time: {}s ({:.2} hours)",
            self.total_time_s,
            self.total_time_s as f64 / 3600.0
        );
        println!(
            "Network throughput: {:.2} trains/hour",
            self.throughput_trains_per_hour
        );
        println!("Average delay for finished trains: {:.1}s", self.average_delay_s);

        println!("\n--- Per-Train Delay Report ---");
        for t in &self.per_train {
            let breakdown: Vec<String> = DelayCause::ALL
                .iter()
                .filter_map(|c| {
                    let secs = t.delays.get(c).copied().unwrap_or(0);
                    if secs > 0 {
                        Some(format!("{}: {}s", c.label(), secs))
                    } else {
                        None
                    }
                })
                .collect();
            let breakdown = if breakdown.is_empty() {
                "no delays".to_string()
            } else {
                breakdown.join(", ")
            };
            println!(
                "  - {} (priority {}, {:?}): {}",
                t.train_id, t.priority, t.status, breakdown
            );
        }
    }
}
