use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod infrastructure;
pub mod train;

pub use infrastructure::*;
pub use train::*;

/// Cause bucket for a single hold. Every hold closes into exactly one of
/// these (spec §4.7) — never a bare scalar delay field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DelayCause {
    Signal,
    Crossing,
    Platform,
}

impl DelayCause {
    pub const ALL: [DelayCause; 3] = [DelayCause::Signal, DelayCause::Crossing, DelayCause::Platform];

    pub fn label(&self) -> &'static str {
        match self {
            DelayCause::Signal => "signal",
            DelayCause::Crossing => "crossing",
            DelayCause::Platform => "platform",
        }
    }
}

/// Zero-initialized per-cause delay map, so reports never need to special
/// case a missing bucket.
pub fn zeroed_delay_map() -> HashMap<DelayCause, u64> {
    DelayCause::ALL.iter().map(|c| (*c, 0)).collect()
}
