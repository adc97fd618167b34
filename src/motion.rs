//! Closed-form block-transit physics (spec §4.2). Pure functions, no kernel
//! state — directly unit-testable against the scenarios in spec §8.

const KMPH_TO_MS: f64 = 1000.0 / 3600.0;

pub fn kmph_to_ms(kmph: f64) -> f64 {
    kmph * KMPH_TO_MS
}

/// Computes `(transit_time_s, exit_speed_ms)` for one block.
///
/// `target_speed_ms` supplied means the train must brake to that speed by
/// the end of the block (the braking branch); `None` means accelerate to
/// the block's speed cap and cruise (the accelerate/cruise branch).
/// Transit time is floored to an integer and clamped to a minimum of 1s —
/// this is what guarantees forward progress even with zero acceleration or
/// zero entry speed (spec §7, "Divide-by-zero in motion").
pub fn block_transit(
    train_vmax_kmph: f64,
    train_accel_ms2: f64,
    train_decel_ms2: f64,
    section_vmax_kmph: f64,
    block_length_km: f64,
    entry_speed_ms: f64,
    target_speed_ms: Option<f64>,
) -> (i64, f64) {
    let block_len_m = block_length_km * 1000.0;

    if let Some(target) = target_speed_ms {
        let section_max_ms = kmph_to_ms(section_vmax_kmph);
        let v0 = entry_speed_ms.min(section_max_ms);
        let decel = train_decel_ms2;

        let dist_to_brake_m = if decel > 0.0 {
            (v0.powi(2) - target.powi(2)) / (2.0 * decel)
        } else {
            f64::INFINITY
        };

        if dist_to_brake_m >= block_len_m {
            let exit_speed_sq = v0.powi(2) - 2.0 * decel * block_len_m;
            let exit_speed = exit_speed_sq.max(0.0).sqrt();
            let transit_time = if decel > 0.0 {
                (v0 - exit_speed) / decel
            } else {
                f64::INFINITY
            };
            (clamp_transit(transit_time), exit_speed)
        } else {
            let cruise_dist_m = block_len_m - dist_to_brake_m;
            let time_to_cruise = if v0 > 0.0 {
                cruise_dist_m / v0
            } else {
                f64::INFINITY
            };
            let time_to_brake = if decel > 0.0 {
                (v0 - target) / decel
            } else {
                f64::INFINITY
            };
            (clamp_transit(time_to_cruise + time_to_brake), target)
        }
    } else {
        let max_speed_ms = kmph_to_ms(train_vmax_kmph.min(section_vmax_kmph));
        let accel = train_accel_ms2;

        if entry_speed_ms >= max_speed_ms {
            let transit_time = if max_speed_ms > 0.0 {
                block_len_m / max_speed_ms
            } else {
                f64::INFINITY
            };
            return (clamp_transit(transit_time), max_speed_ms);
        }

        let dist_to_accel_m = if accel > 0.0 {
            (max_speed_ms.powi(2) - entry_speed_ms.powi(2)) / (2.0 * accel)
        } else {
            f64::INFINITY
        };

        if dist_to_accel_m >= block_len_m {
            let exit_speed_sq = entry_speed_ms.powi(2) + 2.0 * accel * block_len_m;
            let exit_speed = exit_speed_sq.sqrt();
            let transit_time = if accel > 0.0 {
                (exit_speed - entry_speed_ms) / accel
            } else {
                f64::INFINITY
            };
            (clamp_transit(transit_time), exit_speed)
        } else {
            let time_to_accel = if accel > 0.0 {
                (max_speed_ms - entry_speed_ms) / accel
            } else {
                f64::INFINITY
            };
            let cruise_dist_m = block_len_m - dist_to_accel_m;
            let time_to_cruise = if max_speed_ms > 0.0 {
                cruise_dist_m / max_speed_ms
            } else {
                f64::INFINITY
            };
            (clamp_transit(time_to_accel + time_to_cruise), max_speed_ms)
        }
    }
}

fn clamp_transit(seconds: f64) -> i64 {
    if !seconds.is_finite() {
        return 1;
    }
    seconds.floor().max(1.0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_cruise_at_entry_speed_above_cap() {
        let (time, exit) = block_transit(60.0, 0.5, 0.5, 60.0, 1.0, kmph_to_ms(60.0), None);
        assert_eq!(time, (1000.0 / kmph_to_ms(60.0)).floor() as i64);
        assert!((exit - kmph_to_ms(60.0)).abs() < 1e-9);
    }

    #[test]
    fn accelerate_then_cruise_reaches_cap() {
        let (_, exit) = block_transit(100.0, 1.0, 1.0, 100.0, 5.0, 0.0, None);
        assert!((exit - kmph_to_ms(100.0)).abs() < 1e-6);
    }

    #[test]
    fn pure_acceleration_does_not_reach_cap() {
        let (_, exit) = block_transit(200.0, 0.5, 0.5, 200.0, 0.05, 0.0, None);
        assert!(exit < kmph_to_ms(200.0));
        assert!(exit > 0.0);
    }

    #[test]
    fn braking_to_zero_within_block() {
        let v0 = kmph_to_ms(60.0);
        let (_, exit) = block_transit(60.0, 0.5, 0.5, 60.0, 5.0, v0, Some(0.0));
        assert!((exit - 0.0).abs() < 1e-9);
    }

    #[test]
    fn braking_does_not_reach_target_within_block() {
        let v0 = kmph_to_ms(120.0);
        let (_, exit) = block_transit(120.0, 0.5, 0.2, 120.0, 0.1, v0, Some(0.0));
        assert!(exit > 0.0);
        assert!(exit < v0);
    }

    #[test]
    fn zero_entry_speed_still_makes_progress() {
        let (time, _) = block_transit(60.0, 0.5, 0.5, 60.0, 1.0, 0.0, None);
        assert!(time >= 1);
    }
}
