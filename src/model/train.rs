use super::zeroed_delay_map;
use super::DelayCause;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainStatus {
    Waiting,
    Running,
    Finished,
}

/// A train: immutable motion parameters and route, plus mutable status and
/// per-cause delay accounting (spec §3). Lower `priority` wins arbitration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Train {
    pub train_id: String,
    pub category: String,
    pub priority: i32,
    pub vmax_kmph: f64,
    pub acceleration_ms2: f64,
    pub base_deceleration_ms2: f64,
    pub length_m: f64,
    pub route: Vec<String>,
    pub depart_time_s: i64,
    pub status: TrainStatus,
    pub delays: HashMap<DelayCause, u64>,
}

impl Train {
    pub fn new(
        train_id: impl Into<String>,
        category: impl Into<String>,
        priority: i32,
        vmax_kmph: f64,
        acceleration_ms2: f64,
        base_deceleration_ms2: f64,
        length_m: f64,
        route: Vec<String>,
        depart_time_s: i64,
    ) -> Self {
        Self {
            train_id: train_id.into(),
            category: category.into(),
            priority,
            vmax_kmph,
            acceleration_ms2,
            base_deceleration_ms2,
            length_m,
            route,
            depart_time_s,
            status: TrainStatus::Waiting,
            delays: zeroed_delay_map(),
        }
    }

    pub fn total_delay(&self) -> u64 {
        self.delays.values().sum()
    }

    pub fn add_delay(&mut self, cause: DelayCause, seconds: u64) {
        *self.delays.entry(cause).or_insert(0) += seconds;
    }
}
