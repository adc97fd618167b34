use serde::{Deserialize, Serialize};

/// A fixed-length piece of track protected by one signal.
///
/// Block ids follow `<u>-<v>-B<i>`, `i` starting at 1 and increasing in the
/// direction of travel from `u` to `v` (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub block_id: String,
    pub length_km: f64,
}

impl Block {
    pub fn new(block_id: impl Into<String>, length_km: f64) -> Self {
        Self {
            block_id: block_id.into(),
            length_km,
        }
    }

    pub fn length_m(&self) -> f64 {
        self.length_km * 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineType {
    Single,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signalling {
    Absolute,
    Automatic,
}

/// Time-bounded multiplicative speed reduction on a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disruption {
    pub section_u: String,
    pub section_v: String,
    pub start_time_s: i64,
    pub end_time_s: i64,
    pub speed_factor: f64,
}

/// A station on the network. `occupied_platforms` is the ordered sequence
/// of train ids currently holding a platform; `|occupied_platforms| <=
/// num_platforms` must hold after every event (invariant I3/P3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub code: String,
    pub name: String,
    pub has_loop: bool,
    pub num_loops: u32,
    pub num_platforms: u32,
    pub max_train_len_m: u32,
    pub is_junction: bool,
    pub dwell_mean_s: i64,
    pub dwell_std_dev_s: i64,
    pub occupied_platforms: Vec<String>,
}

impl Station {
    /// A station terminates a single-line reservation path: it's a loop or
    /// a junction (spec §4.4, GLOSSARY "Path (single-line)").
    pub fn is_path_boundary(&self) -> bool {
        self.num_loops > 0 || self.is_junction
    }

    pub fn has_free_platform(&self) -> bool {
        (self.occupied_platforms.len() as u32) < self.num_platforms
    }
}

/// A directed edge between two adjacent stations. Every undirected input
/// row materializes as two `Section` records, `(u,v)` and `(v,u)`, with
/// independently-tracked occupancy (spec §9, open question: "the spec
/// treats them as independent").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub u: String,
    pub v: String,
    pub line_type: LineType,
    pub length_km: f64,
    pub vmax_kmph: f64,
    pub original_vmax_kmph: f64,
    pub signalling: Signalling,
    pub gradient: f64,
    pub blocks: Vec<Block>,
    pub active_disruptions: Vec<Disruption>,
}

impl Section {
    pub fn new(
        u: impl Into<String>,
        v: impl Into<String>,
        line_type: LineType,
        length_km: f64,
        vmax_kmph: f64,
        signalling: Signalling,
        gradient: f64,
    ) -> Self {
        Self {
            u: u.into(),
            v: v.into(),
            line_type,
            length_km,
            vmax_kmph,
            original_vmax_kmph: vmax_kmph,
            signalling,
            gradient,
            blocks: Vec::new(),
            active_disruptions: Vec::new(),
        }
    }

    pub fn key(&self) -> (String, String) {
        (self.u.clone(), self.v.clone())
    }

    /// Recomputes `vmax_kmph` from `active_disruptions`: the most severe
    /// (lowest) speed factor wins, composition is idempotent and order
    /// independent (spec §4.6, L2).
    pub fn recalculate_vmax(&mut self) {
        match self
            .active_disruptions
            .iter()
            .map(|d| d.speed_factor)
            .fold(None, |acc, f| Some(acc.map_or(f, |a: f64| a.min(f))))
        {
            Some(worst_factor) => self.vmax_kmph = self.original_vmax_kmph * worst_factor,
            None => self.vmax_kmph = self.original_vmax_kmph,
        }
    }
}
