//! Pre-simulation block generation (spec §6, "Block generation"), ported
//! from the original source's `utils.py`.

use crate::model::{Block, Section, Signalling, Train};
use std::collections::HashMap;

const GRAVITY_MS2: f64 = 9.81;
const REACTION_TIME_S: f64 = 2.5;
const SAFETY_MARGIN_M: f64 = 200.0;
const DEFAULT_BLOCK_LENGTH_M: f64 = 1000.0;

/// Worst-case minimum safe block length for one train on one section:
/// reaction distance plus braking distance under the train's deceleration
/// net of the section's gradient, plus a safety margin.
pub fn min_block_length_m(train: &Train, section: &Section) -> f64 {
    let vmax_ms = section.vmax_kmph * (1000.0 / 3600.0);

    let gradient_angle = (section.gradient / 100.0).atan();
    let gradient_effect = GRAVITY_MS2 * gradient_angle.sin();
    let effective_deceleration = (train.base_deceleration_ms2 - gradient_effect).max(0.1);

    let reaction_distance_m = vmax_ms * REACTION_TIME_S;
    let braking_distance_m = vmax_ms.powi(2) / (2.0 * effective_deceleration);

    (reaction_distance_m + braking_distance_m + SAFETY_MARGIN_M).round()
}

/// Populates `section.blocks` for every automatically-signalled section,
/// sized to the worst-case stopping distance among trains whose `vmax`
/// meets or exceeds the section's cap. Defaults to 1km blocks if no train
/// qualifies (spec §6).
pub fn generate_blocks_for_network(sections: &mut HashMap<(String, String), Section>, trains: &[Train]) {
    for section in sections.values_mut() {
        if section.signalling != Signalling::Automatic {
            continue;
        }

        let worst_case_length = trains
            .iter()
            .filter(|t| t.vmax_kmph >= section.vmax_kmph)
            .map(|t| min_block_length_m(t, section))
            .fold(0.0_f64, f64::max);

        let worst_case_length = if worst_case_length > 0.0 {
            worst_case_length
        } else {
            DEFAULT_BLOCK_LENGTH_M
        };

        let num_blocks = ((section.length_km * 1000.0) / worst_case_length).ceil().max(1.0) as usize;
        let block_length_km = section.length_km / num_blocks as f64;

        section.blocks = (1..=num_blocks)
            .map(|i| Block::new(format!("{}-{}-B{}", section.u, section.v, i), block_length_km))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LineType;

    fn sample_train(vmax: f64, decel: f64) -> Train {
        Train::new("T1", "pax", 1, vmax, 0.5, decel, 200.0, vec!["A".into(), "B".into()], 0)
    }

    #[test]
    fn generates_blocks_only_for_automatic_sections() {
        let mut sections = HashMap::new();
        sections.insert(
            ("A".to_string(), "B".to_string()),
            Section::new("A", "B", LineType::Double, 10.0, 60.0, Signalling::Automatic, 0.0),
        );
        sections.insert(
            ("B".to_string(), "C".to_string()),
            Section::new("B", "C", LineType::Double, 10.0, 60.0, Signalling::Absolute, 0.0),
        );
        let trains = vec![sample_train(60.0, 0.5)];
        generate_blocks_for_network(&mut sections, &trains);

        assert!(!sections[&("A".to_string(), "B".to_string())].blocks.is_empty());
        assert!(sections[&("B".to_string(), "C".to_string())].blocks.is_empty());
    }

    #[test]
    fn defaults_to_1km_blocks_when_no_train_qualifies() {
        let mut sections = HashMap::new();
        sections.insert(
            ("A".to_string(), "B".to_string()),
            Section::new("A", "B", LineType::Double, 3.0, 200.0, Signalling::Automatic, 0.0),
        );
        let trains = vec![sample_train(60.0, 0.5)];
        generate_blocks_for_network(&mut sections, &trains);
        let blocks = &sections[&("A".to_string(), "B".to_string())].blocks;
        assert_eq!(blocks.len(), 3);
    }

    #[test]
    fn block_ids_follow_convention() {
        let mut sections = HashMap::new();
        sections.insert(
            ("A".to_string(), "B".to_string()),
            Section::new("A", "B", LineType::Double, 1.0, 60.0, Signalling::Automatic, 0.0),
        );
        let trains = vec![sample_train(60.0, 0.5)];
        generate_blocks_for_network(&mut sections, &trains);
        let blocks = &sections[&("A".to_string(), "B".to_string())].blocks;
        assert_eq!(blocks[0].block_id, "A-B-B1");
    }
}
