//! Platform capacity arbitration and dwell sampling (spec §4.5).

use super::{EventMeta, EventTag, Simulator};
use crate::model::DelayCause;
use rand_distr::{Distribution, Normal};

impl Simulator {
    pub(crate) fn handle_enter_station(&mut self, train_id: String, meta: EventMeta) {
        let station_code = self.train(&train_id).route[meta.section_idx].clone();
        self.close_hold_with_cause(&train_id, DelayCause::Platform);

        if !self.stations.contains_key(&station_code) {
            // spec §7: a route stop with no matching station record is a
            // non-fatal anomaly — log it and skip arbitration so the train
            // still completes its journey.
            self.log.log(
                self.time,
                &train_id,
                "ANOMALY_UNKNOWN_STATION",
                station_code.clone(),
                Some("no station record, skipping platform arbitration".to_string()),
            );
        }

        let has_room = self
            .stations
            .get(&station_code)
            .map(|s| s.has_free_platform())
            .unwrap_or(true);

        if has_room {
            if let Some(station) = self.stations.get_mut(&station_code) {
                station.occupied_platforms.push(train_id.clone());
            }

            let dwell_s = self.sample_dwell(&station_code);
            self.log.log(
                self.time,
                &train_id,
                "ENTER_STATION",
                station_code,
                Some(format!("dwell={dwell_s}s")),
            );
            self.schedule(self.time + dwell_s, EventTag::Depart, Some(train_id), meta);
        } else {
            self.open_hold(&train_id, DelayCause::Platform);
            self.log.log(
                self.time,
                &train_id,
                "HOLD_FOR_PLATFORM",
                station_code.clone(),
                Some("all platforms occupied".to_string()),
            );
            self.waiting_for_platform.entry(station_code).or_default().push((train_id, meta));
        }
    }

    /// Rounds a `Normal(mean, std)` sample to the station's dwell
    /// parameters, clamped to the configured minimum dwell (spec §4.5).
    fn sample_dwell(&mut self, station_code: &str) -> i64 {
        let (mean, std) = self
            .stations
            .get(station_code)
            .map(|s| (s.dwell_mean_s as f64, s.dwell_std_dev_s as f64))
            .unwrap_or((60.0, 5.0));
        let min_dwell_s = self.config().min_dwell_s;

        let sampled = if std > 0.0 {
            match Normal::new(mean, std) {
                Ok(dist) => dist.sample(self.rng_mut()),
                Err(_) => mean,
            }
        } else {
            mean
        };

        (sampled.round() as i64).max(min_dwell_s)
    }
}
