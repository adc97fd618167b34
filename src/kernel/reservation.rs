//! Single-line path reservation (spec §4.4): lookahead over contiguous
//! single-line sections to bound head-on deadlock on bidirectional track.

use super::{EventMeta, EventTag, Simulator};
use crate::model::{DelayCause, LineType, Section, Station};
use std::collections::HashMap;

/// Whether a single-line lookahead stopped at an actual loop/junction
/// station, left single-line track for a double-line section, or simply
/// ran out of route. Only the last case is worth flagging to a human: it
/// means the train is exposed on single-line track for its entire
/// remaining journey with no passing point (spec.md §9, "Single-line
/// lookahead policy").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookaheadEnd {
    Boundary,
    LeftSingleLine,
    RouteEnd,
}

/// The maximal contiguous run of single-line sections starting at
/// `start_idx` in `route`, ending at the first loop/junction station, the
/// point it leaves single-line track, or the end of the route. `start_idx`
/// must itself be a single-line section. Pure and `Simulator`-free so the
/// loader's reachability check (spec.md §9) can reuse it without a live
/// kernel.
pub(crate) fn trace_single_line_path(
    route: &[String],
    stations: &HashMap<String, Station>,
    sections: &HashMap<(String, String), Section>,
    start_idx: usize,
) -> (Vec<(String, String)>, LookaheadEnd) {
    let mut path = Vec::new();
    let mut idx = start_idx;

    loop {
        let key = (route[idx].clone(), route[idx + 1].clone());
        path.push(key);

        let boundary_station = &route[idx + 1];
        if stations.get(boundary_station).map(|s| s.is_path_boundary()).unwrap_or(true) {
            return (path, LookaheadEnd::Boundary);
        }
        if idx + 2 >= route.len() {
            return (path, LookaheadEnd::RouteEnd);
        }
        let next_key = (route[idx + 1].clone(), route[idx + 2].clone());
        match sections.get(&next_key) {
            Some(s) if s.line_type == LineType::Single => idx += 1,
            _ => return (path, LookaheadEnd::LeftSingleLine),
        }
    }
}

impl Simulator {
    pub(crate) fn compute_single_line_path(&self, train_id: &str, start_idx: usize) -> Vec<(String, String)> {
        let route = &self.train(train_id).route;
        trace_single_line_path(route, &self.stations, &self.sections, start_idx).0
    }

    /// Atomically checks and reserves every section in `path`, in both
    /// directions, against occupancy and existing reservations (spec §4.4,
    /// invariant I3). All-or-nothing: a conflict anywhere leaves every
    /// section untouched.
    fn reserve_path(&mut self, train_id: &str, path: &[(String, String)]) -> bool {
        for (u, v) in path {
            let reverse = (v.clone(), u.clone());
            if let Some(holder) = self.section_reservations.get(&(u.clone(), v.clone())) {
                if holder != train_id {
                    return false;
                }
            }
            if let Some(holder) = self.section_reservations.get(&reverse) {
                if holder != train_id {
                    return false;
                }
            }
            let occupied_by_other = |blocks: &[crate::model::Block], occ: &std::collections::HashMap<String, String>| {
                blocks.iter().any(|b| occ.get(&b.block_id).map(|t| t != train_id).unwrap_or(false))
            };
            if let Some(section) = self.sections.get(&(u.clone(), v.clone())) {
                if occupied_by_other(&section.blocks, &self.block_occupancy) {
                    return false;
                }
            }
            if let Some(section) = self.sections.get(&reverse) {
                if occupied_by_other(&section.blocks, &self.block_occupancy) {
                    return false;
                }
            }
        }

        for (u, v) in path {
            self.section_reservations.insert((u.clone(), v.clone()), train_id.to_string());
        }
        true
    }

    fn release_path(&mut self, train_id: &str, path: &[(String, String)]) {
        for key in path {
            if self.section_reservations.get(key).map(|t| t == train_id).unwrap_or(false) {
                self.section_reservations.remove(key);
            }
        }
    }

    /// Runs path reservation on entry to the first block of a single-line
    /// section. On success, attaches the path to `meta` and returns `true`.
    /// On failure, opens a crossing hold and self-reschedules the retry at
    /// `t + crossing_retry_interval_s` (spec §4.3 step 2, §4.4).
    pub(crate) fn try_enter_single_line_path(&mut self, train_id: &str, section_idx: usize, meta: &mut EventMeta) -> bool {
        let path = self.compute_single_line_path(train_id, section_idx);
        if self.reserve_path(train_id, &path) {
            // Close any crossing hold accrued while this train was retrying
            // before logging `RESERVE_PATH` — otherwise the hold outlives
            // its `HOLD_FOR_CROSSING` log entry and the later signal-aspect
            // close mis-sniffs the wait as a signal delay (spec §4.7, §9:
            // "Any cross-cause bleed is a defect").
            self.close_hold_with_cause(train_id, DelayCause::Crossing);
            let n = path.len();
            meta.reserved_path = Some(path);
            self.log.log(
                self.time,
                train_id,
                "RESERVE_PATH",
                self.section_key(train_id, section_idx).0,
                Some(format!("{n} section(s) reserved")),
            );
            true
        } else {
            self.open_hold(train_id, DelayCause::Crossing);
            self.log.log(
                self.time,
                train_id,
                "HOLD_FOR_CROSSING",
                self.section_key(train_id, section_idx).0,
                Some("single-line path busy".to_string()),
            );
            meta.entry_speed_ms = 0.0;
            let retry_meta = meta.clone();
            let retry_at = self.time + self.config().crossing_retry_interval_s;
            self.schedule(retry_at, EventTag::EnterBlock, Some(train_id.to_string()), retry_meta);
            false
        }
    }

    /// Releases `meta.reserved_path` once the train completes the final
    /// section of that path (spec §4.4, "A train releases its path when it
    /// enters a section outside the path").
    pub(crate) fn maybe_release_path(&mut self, train_id: &str, completed_section_idx: usize, meta: &mut EventMeta) {
        let completed_key = self.section_key(train_id, completed_section_idx);
        let released = match &meta.reserved_path {
            Some(path) => path.last() == Some(&completed_key),
            None => false,
        };
        if released {
            let path = meta.reserved_path.take().unwrap();
            self.release_path(train_id, &path);
            self.log.log(self.time, train_id, "RELEASE_PATH", completed_key.1, None);
        }
    }
}
