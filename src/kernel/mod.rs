//! The event-driven scheduling kernel (spec §2, §4.1, §5): a single
//! threaded, cooperatively-advanced loop that pops the earliest event,
//! advances the clock, and dispatches to the handler named by its tag.

pub mod block;
pub mod disruption;
pub mod events;
pub mod reservation;
pub mod station;

pub use events::{EventMeta, EventTag, EventQueue};

use crate::config::SimulationConfig;
use crate::metrics::AppMetrics;
use crate::model::{DelayCause, Section, Station, Train, TrainStatus};
use crate::logsink::EventLog;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};

pub struct Simulator {
    pub time: i64,
    queue: EventQueue,

    pub stations: HashMap<String, Station>,
    pub sections: HashMap<(String, String), Section>,
    trains: HashMap<String, Train>,
    generated: HashSet<String>,

    block_occupancy: HashMap<String, String>,
    section_reservations: HashMap<(String, String), String>,
    hold_events: HashMap<String, i64>,
    waiting_at_block: HashMap<String, (String, EventMeta)>,
    waiting_for_platform: HashMap<String, Vec<(String, EventMeta)>>,

    pub log: EventLog,
    pub metrics: AppMetrics,
    config: SimulationConfig,
    rng: StdRng,
}

impl Simulator {
    pub fn new(
        stations: HashMap<String, Station>,
        sections: HashMap<(String, String), Section>,
        trains: Vec<Train>,
        config: SimulationConfig,
        seed: Option<u64>,
    ) -> anyhow::Result<Self> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let mut sim = Self {
            time: 0,
            queue: EventQueue::new(),
            stations,
            sections,
            trains: trains.into_iter().map(|t| (t.train_id.clone(), t)).collect(),
            generated: HashSet::new(),
            block_occupancy: HashMap::new(),
            section_reservations: HashMap::new(),
            hold_events: HashMap::new(),
            waiting_at_block: HashMap::new(),
            waiting_for_platform: HashMap::new(),
            log: EventLog::new(),
            metrics: AppMetrics::new()?,
            config,
            rng,
        };

        // Sorted by (depart_time, train_id) so the initial event order — and
        // hence every tie-break downstream — is a pure function of the
        // input data, never of `HashMap` iteration order (spec §8, L3).
        let mut train_ids: Vec<(String, i64)> = sim
            .trains
            .values()
            .map(|t| (t.train_id.clone(), t.depart_time_s))
            .collect();
        train_ids.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        for (train_id, depart_time_s) in train_ids {
            sim.queue
                .schedule(depart_time_s, EventTag::GenerateTrain, Some(train_id), EventMeta::default());
        }
        sim.queue.schedule(
            sim.config.random_event_check_interval_s,
            EventTag::CheckForRandomEvent,
            None,
            EventMeta::default(),
        );

        Ok(sim)
    }

    pub fn schedule(&mut self, time: i64, tag: EventTag, train_id: Option<String>, meta: EventMeta) {
        self.queue.schedule(time, tag, train_id, meta);
    }

    /// Runs until the queue is empty or every generated train has finished
    /// (spec §4.1).
    pub fn run(&mut self) {
        while let Some(event) = self.queue.pop() {
            self.time = event.time;
            tracing::debug!(time = self.time, tag = ?event.tag, train = ?event.train_id, "dispatch");

            let train_id = event.train_id.clone();
            match event.tag {
                EventTag::GenerateTrain => self.handle_generate_train(train_id.expect("GenerateTrain carries a train id")),
                EventTag::Depart => self.handle_depart(train_id.expect("Depart carries a train id"), event.meta),
                EventTag::EnterBlock => self.handle_enter_block(train_id.expect("EnterBlock carries a train id"), event.meta),
                EventTag::ExitBlock => self.handle_exit_block(train_id.expect("ExitBlock carries a train id"), event.meta),
                EventTag::FreeBlock => self.handle_free_block(train_id.expect("FreeBlock carries a train id"), event.meta),
                EventTag::ResumeCheck => self.handle_resume_check(train_id.expect("ResumeCheck carries a train id"), event.meta),
                EventTag::EnterStation => self.handle_enter_station(train_id.expect("EnterStation carries a train id"), event.meta),
                EventTag::Arrive => self.handle_arrive(train_id.expect("Arrive carries a train id"), event.meta),
                EventTag::StartDisruption => self.handle_start_disruption(event.meta),
                EventTag::EndDisruption => self.handle_end_disruption(event.meta),
                EventTag::CheckForRandomEvent => self.handle_check_for_random_event(),
            }

            if !self.generated.is_empty()
                && self
                    .generated
                    .iter()
                    .all(|id| self.trains.get(id).map(|t| t.status == TrainStatus::Finished).unwrap_or(true))
            {
                tracing::info!("all generated trains have finished, ending simulation");
                break;
            }
        }
    }

    fn handle_generate_train(&mut self, train_id: String) {
        self.generated.insert(train_id.clone());
        self.metrics.trains_generated_total.inc();
        let first_stop = self
            .trains
            .get(&train_id)
            .map(|t| t.route[0].clone())
            .unwrap_or_default();
        self.log.log(
            self.time,
            &train_id,
            "GENERATE_TRAIN",
            first_stop,
            Some(format!("scheduled for departure at t={}s", self.time)),
        );
        self.schedule(self.time, EventTag::Depart, Some(train_id), EventMeta { section_idx: 0, ..Default::default() });
    }

    fn handle_depart(&mut self, train_id: String, meta: EventMeta) {
        let section_idx = meta.section_idx;

        if section_idx > 0 {
            let depart_station_code = self.trains[&train_id].route[section_idx].clone();
            self.release_platform_and_nudge_waitlist(&train_id, &depart_station_code);
        } else if let Some(train) = self.trains.get_mut(&train_id) {
            train.status = TrainStatus::Running;
            let dest = train.route[0].clone();
            self.log.log(self.time, &train_id, "DEPART_JOURNEY_START", dest, None);
        }

        let route_len = self.trains[&train_id].route.len();
        if route_len > section_idx + 1 {
            // A single-line path can span several sections (spec §4.4); the
            // station stop between them must not drop `reserved_path`, or
            // the reservation on earlier sections in the path would leak
            // forever and later sections would re-reserve themselves piecemeal.
            let next_meta = EventMeta {
                section_idx,
                block_idx: 0,
                entry_speed_ms: 0.0,
                reserved_path: meta.reserved_path,
                ..Default::default()
            };
            self.schedule(self.time, EventTag::EnterBlock, Some(train_id), next_meta);
        }
    }

    /// Advances past the current section: releases any single-line path
    /// that ends here, then either arrives (route exhausted) or enters the
    /// next station (spec §4.3 `handle_exit_block`'s tail, §4.4 release).
    pub(crate) fn move_to_next_section(
        &mut self,
        train_id: &str,
        current_section_idx: usize,
        final_speed_ms: f64,
        mut meta: EventMeta,
    ) {
        self.maybe_release_path(train_id, current_section_idx, &mut meta);

        let route_len = self.trains[train_id].route.len();
        if current_section_idx + 1 >= route_len - 1 {
            self.schedule(self.time, EventTag::Arrive, Some(train_id.to_string()), meta);
        } else {
            let next_meta = EventMeta {
                section_idx: current_section_idx + 1,
                entry_speed_ms: final_speed_ms,
                ..meta
            };
            self.schedule(self.time, EventTag::EnterStation, Some(train_id.to_string()), next_meta);
        }
    }

    fn handle_arrive(&mut self, train_id: String, mut meta: EventMeta) {
        let dest_station_code = self.trains[&train_id].route.last().cloned().unwrap_or_default();

        if let Some(train) = self.trains.get_mut(&train_id) {
            train.status = TrainStatus::Finished;
        }
        self.metrics.trains_finished_total.inc();

        // Briefly occupy then free a platform so the waitlist nudge fires
        // uniformly with every other station departure (spec §4.5).
        if let Some(station) = self.stations.get_mut(&dest_station_code) {
            if !station.occupied_platforms.contains(&train_id) {
                station.occupied_platforms.push(train_id.clone());
            }
        }
        self.release_platform_and_nudge_waitlist(&train_id, &dest_station_code);

        if let Some(path) = meta.reserved_path.take() {
            self.log.log(self.time, &train_id, "RELEASE_PATH", "final release on arrival", None);
            for (u, v) in path {
                if self.section_reservations.get(&(u.clone(), v.clone())) == Some(&train_id) {
                    self.section_reservations.remove(&(u, v));
                }
            }
        }

        let total_delay = self.trains[&train_id].total_delay();
        self.log.log(
            self.time,
            &train_id,
            "ARRIVE_JOURNEY_END",
            dest_station_code,
            Some(format!("total delay={total_delay}s")),
        );
    }

    pub(crate) fn section_key(&self, train_id: &str, section_idx: usize) -> (String, String) {
        let route = &self.trains[train_id].route;
        (route[section_idx].clone(), route[section_idx + 1].clone())
    }

    pub(crate) fn train(&self, train_id: &str) -> &Train {
        &self.trains[train_id]
    }

    pub(crate) fn train_mut(&mut self, train_id: &str) -> &mut Train {
        self.trains.get_mut(train_id).expect("train must be registered before being referenced by id")
    }

    pub(crate) fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// A snapshot of final train state for reporting, taken once the run
    /// loop has returned.
    pub fn trains_snapshot(&self) -> HashMap<String, Train> {
        self.trains.clone()
    }

    pub fn into_log(self) -> EventLog {
        self.log
    }

    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Opens a hold for `train_id` if one isn't already open, and records
    /// the cause for the metrics counter (the delay accounting itself
    /// waits until the hold closes, per spec §4.7).
    pub(crate) fn open_hold(&mut self, train_id: &str, cause: DelayCause) {
        if !self.hold_events.contains_key(train_id) {
            self.hold_events.insert(train_id.to_string(), self.time);
            self.metrics.record_hold_opened(cause);
        }
    }

    /// Closes any open hold for `train_id`, attributing the accumulated
    /// wait to `cause` (spec §4.3 step 4, §4.7). Every hold is closed with
    /// the cause it was actually opened under — a crossing hold closes as
    /// soon as its path reservation succeeds (`reservation::try_enter_single_line_path`),
    /// so by the time this is called at a signal-aspect check, any hold
    /// still open can only be a signal hold.
    pub(crate) fn close_hold_with_cause(&mut self, train_id: &str, cause: DelayCause) -> Option<u64> {
        let start = self.hold_events.remove(train_id)?;
        let wait = (self.time - start).max(0) as u64;
        self.train_mut(train_id).add_delay(cause, wait);
        Some(wait)
    }

    fn release_platform_and_nudge_waitlist(&mut self, train_id: &str, station_code: &str) {
        let freed = self
            .stations
            .get_mut(station_code)
            .map(|s| {
                if let Some(pos) = s.occupied_platforms.iter().position(|id| id == train_id) {
                    s.occupied_platforms.remove(pos);
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false);

        if !freed {
            return;
        }
        self.log.log(self.time, train_id, "DEPART_STATION", station_code, Some("platform freed".to_string()));

        let waitlist = self.waiting_for_platform.get_mut(station_code);
        let next = waitlist.and_then(|list| {
            if list.is_empty() {
                return None;
            }
            // Lowest priority value served next, stable on ties via
            // insertion order (spec §4.5, §5 ordering guarantee iii).
            let idx = list
                .iter()
                .enumerate()
                .min_by_key(|(i, (id, _))| (self.trains[id].priority, *i))
                .map(|(i, _)| i)?;
            Some(list.remove(idx))
        });

        if let Some((waiting_id, waiting_meta)) = next {
            let priority = self.trains[&waiting_id].priority;
            self.log.log(
                self.time,
                &waiting_id,
                "PLATFORM_AVAILABLE",
                station_code,
                Some(format!("granted by priority {priority}")),
            );
            self.schedule(self.time, EventTag::EnterStation, Some(waiting_id), waiting_meta);
        }
    }
}
