//! Disruption start/end and the random-event generator (spec §4.6).

use super::{EventMeta, EventTag, Simulator};
use crate::model::Disruption;
use rand::Rng;

impl Simulator {
    pub(crate) fn handle_start_disruption(&mut self, meta: EventMeta) {
        let Some(d) = meta.disruption else { return };
        let forward = (d.section_u.clone(), d.section_v.clone());
        let reverse = (d.section_v.clone(), d.section_u.clone());

        for key in [&forward, &reverse] {
            if let Some(section) = self.sections.get_mut(key) {
                section.active_disruptions.push(d.clone());
                section.recalculate_vmax();
            }
        }
        self.metrics.disruptions_active.inc();
        self.log.log(
            self.time,
            "System",
            "START_DISRUPTION",
            format!("{}-{}", d.section_u, d.section_v),
            Some(format!("factor={}", d.speed_factor)),
        );
    }

    pub(crate) fn handle_end_disruption(&mut self, meta: EventMeta) {
        let Some(d) = meta.disruption else { return };
        let forward = (d.section_u.clone(), d.section_v.clone());
        let reverse = (d.section_v.clone(), d.section_u.clone());

        for key in [&forward, &reverse] {
            if let Some(section) = self.sections.get_mut(key) {
                section.active_disruptions.retain(|existing| existing != &d);
                section.recalculate_vmax();
            }
        }
        self.metrics.disruptions_active.dec();
        self.log.log(
            self.time,
            "System",
            "END_DISRUPTION",
            format!("{}-{}", d.section_u, d.section_v),
            None,
        );
    }

    /// Self-reschedules unconditionally, then with probability
    /// `random_event_probability` rolls a new disruption on a random
    /// undirected section (spec §4.6).
    pub(crate) fn handle_check_for_random_event(&mut self) {
        let interval = self.config().random_event_check_interval_s;
        self.schedule(self.time + interval, EventTag::CheckForRandomEvent, None, EventMeta::default());

        let roll: f64 = self.rng_mut().gen();
        if roll >= self.config().random_event_probability {
            return;
        }

        let candidates: Vec<(String, String)> = self
            .sections
            .keys()
            .filter(|(u, v)| u < v)
            .cloned()
            .collect();
        if candidates.is_empty() {
            return;
        }

        let (min_s, max_s) = (self.config().min_disruption_duration_s, self.config().max_disruption_duration_s);
        let idx = self.rng_mut().gen_range(0..candidates.len());
        let (u, v) = candidates[idx].clone();
        let duration = self.rng_mut().gen_range(min_s..=max_s);
        let factor = (self.rng_mut().gen_range(0.2..=0.7) * 100.0).round() / 100.0;

        let d = Disruption {
            section_u: u,
            section_v: v,
            start_time_s: self.time,
            end_time_s: self.time + duration,
            speed_factor: factor,
        };

        self.schedule(self.time, EventTag::StartDisruption, None, EventMeta { disruption: Some(d.clone()), ..Default::default() });
        self.schedule(self.time + duration, EventTag::EndDisruption, None, EventMeta { disruption: Some(d), ..Default::default() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::model::{LineType, Section, Signalling};
    use std::collections::HashMap;

    fn network() -> Simulator {
        let mut sections = HashMap::new();
        sections.insert(
            ("A".to_string(), "B".to_string()),
            Section::new("A", "B", LineType::Double, 10.0, 100.0, Signalling::Absolute, 0.0),
        );
        sections.insert(
            ("B".to_string(), "A".to_string()),
            Section::new("B", "A", LineType::Double, 10.0, 100.0, Signalling::Absolute, 0.0),
        );
        Simulator::new(HashMap::new(), sections, Vec::new(), AppConfig::default().simulation, Some(1)).unwrap()
    }

    fn disruption(factor: f64, start: i64, end: i64) -> Disruption {
        Disruption { section_u: "A".to_string(), section_v: "B".to_string(), start_time_s: start, end_time_s: end, speed_factor: factor }
    }

    /// spec §8 S4, L2: overlapping disruptions compose by worst (minimum)
    /// factor, and ending the later-started one restores exactly the
    /// remaining factor, regardless of removal order.
    #[test]
    fn overlapping_disruptions_compose_by_worst_factor_and_restore_on_end() {
        let mut sim = network();
        let key = ("A".to_string(), "B".to_string());
        let d1 = disruption(0.5, 0, 200);
        let d2 = disruption(0.3, 100, 150);

        sim.handle_start_disruption(EventMeta { disruption: Some(d1.clone()), ..Default::default() });
        assert_eq!(sim.sections[&key].vmax_kmph, 50.0);

        sim.time = 100;
        sim.handle_start_disruption(EventMeta { disruption: Some(d2.clone()), ..Default::default() });
        assert_eq!(sim.sections[&key].vmax_kmph, 30.0);

        sim.time = 150;
        sim.handle_end_disruption(EventMeta { disruption: Some(d2), ..Default::default() });
        assert_eq!(sim.sections[&key].vmax_kmph, 50.0);

        sim.time = 200;
        sim.handle_end_disruption(EventMeta { disruption: Some(d1), ..Default::default() });
        assert_eq!(sim.sections[&key].vmax_kmph, 100.0);
    }
}
