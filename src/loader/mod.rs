//! CSV ingestion of the static model (spec §6). An external collaborator to
//! the kernel: it produces `Station`/`Section`/`Train`/`Disruption` values
//! and nothing more.

pub mod blocks;

use crate::error::{SimError, SimResult};
use crate::model::{Disruption, LineType, Section, Signalling, Station, Train};
use std::collections::HashMap;
use std::path::Path;

fn parse_bool(raw: &str, default: bool) -> bool {
    let s = raw.trim();
    if s.is_empty() {
        return default;
    }
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn field<'a>(row: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    row.get(key).map(|s| s.as_str()).filter(|s| !s.is_empty())
}

fn required<'a>(row: &'a HashMap<String, String>, key: &str, file: &str) -> SimResult<&'a str> {
    field(row, key).ok_or_else(|| SimError::MalformedRow {
        file: file.to_string(),
        detail: format!("missing required column `{key}`"),
    })
}

fn parse_num<T: std::str::FromStr>(row: &HashMap<String, String>, key: &str, file: &str) -> SimResult<T> {
    let raw = required(row, key, file)?;
    raw.parse::<T>().map_err(|_| SimError::MalformedRow {
        file: file.to_string(),
        detail: format!("column `{key}` has invalid value `{raw}`"),
    })
}

fn open_reader(path: &Path) -> SimResult<csv::Reader<std::fs::File>> {
    csv::Reader::from_path(path).map_err(|e| SimError::Csv {
        file: path.display().to_string(),
        source: e,
    })
}

pub fn load_stations(path: impl AsRef<Path>) -> SimResult<HashMap<String, Station>> {
    let path = path.as_ref();
    let file_name = path.display().to_string();
    let mut reader = open_reader(path)?;
    let mut stations = HashMap::new();

    for result in reader.deserialize::<HashMap<String, String>>() {
        let row = result.map_err(|e| SimError::Csv {
            file: file_name.clone(),
            source: e,
        })?;
        let code = required(&row, "code", &file_name)?.to_string();
        let station = Station {
            code: code.clone(),
            name: required(&row, "name", &file_name)?.to_string(),
            has_loop: parse_bool(field(&row, "has_loop").unwrap_or(""), true),
            num_loops: field(&row, "num_loops").and_then(|s| s.parse().ok()).unwrap_or(1),
            num_platforms: field(&row, "num_platforms").and_then(|s| s.parse().ok()).unwrap_or(1),
            max_train_len_m: field(&row, "max_train_len_m")
                .and_then(|s| s.parse().ok())
                .unwrap_or(700),
            is_junction: parse_bool(field(&row, "is_junction").unwrap_or(""), false),
            dwell_mean_s: field(&row, "dwell_mean_s").and_then(|s| s.parse().ok()).unwrap_or(60),
            dwell_std_dev_s: field(&row, "dwell_std_dev_s")
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            occupied_platforms: Vec::new(),
        };
        stations.insert(code, station);
    }

    Ok(stations)
}

/// Loads sections and materializes both directions. Block ids for the
/// reverse direction are regenerated in reversed order so block `i` of
/// `(v,u)` is the physical twin of block `N-i+1` of `(u,v)` — callers must
/// run block generation (§[BLOCK GENERATION]) before relying on
/// `section.blocks` being populated; this loader only creates the section
/// shells.
pub fn load_sections(path: impl AsRef<Path>) -> SimResult<HashMap<(String, String), Section>> {
    let path = path.as_ref();
    let file_name = path.display().to_string();
    let mut reader = open_reader(path)?;
    let mut sections = HashMap::new();

    for result in reader.deserialize::<HashMap<String, String>>() {
        let row = result.map_err(|e| SimError::Csv {
            file: file_name.clone(),
            source: e,
        })?;
        let u = required(&row, "u", &file_name)?.to_string();
        let v = required(&row, "v", &file_name)?.to_string();
        let line_type = match required(&row, "line_type", &file_name)?.to_lowercase().as_str() {
            "single" => LineType::Single,
            "double" => LineType::Double,
            other => {
                return Err(SimError::MalformedRow {
                    file: file_name.clone(),
                    detail: format!("unknown line_type `{other}`"),
                })
            }
        };
        let length_km: f64 = parse_num(&row, "length_km", &file_name)?;
        let vmax_kmph: f64 = parse_num(&row, "vmax_kmph", &file_name)?;
        let signalling = match field(&row, "signalling").unwrap_or("absolute").to_lowercase().as_str() {
            "automatic" => Signalling::Automatic,
            _ => Signalling::Absolute,
        };
        let gradient: f64 = field(&row, "gradient").and_then(|s| s.parse().ok()).unwrap_or(0.0);

        let forward = Section::new(u.clone(), v.clone(), line_type, length_km, vmax_kmph, signalling, gradient);
        let reverse = Section::new(v.clone(), u.clone(), line_type, length_km, vmax_kmph, signalling, gradient);

        sections.insert((u, v), forward);
        sections.insert((reverse.u.clone(), reverse.v.clone()), reverse);
    }

    Ok(sections)
}

pub fn load_trains(path: impl AsRef<Path>) -> SimResult<Vec<Train>> {
    let path = path.as_ref();
    let file_name = path.display().to_string();
    let mut reader = open_reader(path)?;
    let mut trains = Vec::new();

    for result in reader.deserialize::<HashMap<String, String>>() {
        let row = result.map_err(|e| SimError::Csv {
            file: file_name.clone(),
            source: e,
        })?;
        let route: Vec<String> = required(&row, "route", &file_name)?
            .split('|')
            .map(|s| s.to_string())
            .collect();
        if route.len() < 2 {
            return Err(SimError::MalformedRow {
                file: file_name.clone(),
                detail: format!("route `{:?}` must have at least 2 stops", route),
            });
        }

        trains.push(Train::new(
            required(&row, "train_id", &file_name)?.to_string(),
            required(&row, "category", &file_name)?.to_string(),
            parse_num(&row, "priority", &file_name)?,
            parse_num(&row, "vmax_kmph", &file_name)?,
            parse_num(&row, "acceleration_ms2", &file_name)?,
            parse_num(&row, "base_deceleration_ms2", &file_name)?,
            parse_num(&row, "length_m", &file_name)?,
            route,
            field(&row, "depart_time_s").and_then(|s| s.parse().ok()).unwrap_or(0),
        ));
    }

    Ok(trains)
}

/// Loads scheduled disruptions. A missing file is informational, not an
/// error (spec §6, §7): the simulation simply runs without them.
pub fn load_disruptions(path: impl AsRef<Path>) -> SimResult<Vec<Disruption>> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!(
            path = %path.display(),
            "disruption file not found, running without scheduled disruptions"
        );
        return Ok(Vec::new());
    }

    let file_name = path.display().to_string();
    let mut reader = open_reader(path)?;
    let mut disruptions = Vec::new();

    for result in reader.deserialize::<HashMap<String, String>>() {
        let row = result.map_err(|e| SimError::Csv {
            file: file_name.clone(),
            source: e,
        })?;
        disruptions.push(Disruption {
            section_u: required(&row, "section_u", &file_name)?.to_string(),
            section_v: required(&row, "section_v", &file_name)?.to_string(),
            start_time_s: parse_num(&row, "start_time_s", &file_name)?,
            end_time_s: parse_num(&row, "end_time_s", &file_name)?,
            speed_factor: parse_num(&row, "speed_factor", &file_name)?,
        });
    }

    Ok(disruptions)
}

/// Cross-checks every train's route against the loaded stations and
/// sections: each stop must be a known station, and each consecutive pair
/// of stops must have a section record. A route that fails this is a
/// structural defect in the input data, not a runtime anomaly the kernel
/// can shrug off (spec.md §7) — load fails with `SimError::UnknownStationReference`.
///
/// Also flags (via `tracing::warn!`, non-fatal) any route whose single-line
/// lookahead runs out of stops before reaching a loop/junction station —
/// supplementing spec.md §9's "Single-line lookahead policy" open question.
pub fn validate_routes(
    stations: &HashMap<String, Station>,
    sections: &HashMap<(String, String), Section>,
    trains: &[Train],
) -> SimResult<()> {
    for train in trains {
        for stop in &train.route {
            if !stations.contains_key(stop) {
                return Err(SimError::UnknownStationReference {
                    code: stop.clone(),
                    context: format!("train `{}` route references an unknown station", train.train_id),
                });
            }
        }
        for hop in train.route.windows(2) {
            let key = (hop[0].clone(), hop[1].clone());
            if !sections.contains_key(&key) {
                return Err(SimError::UnknownStationReference {
                    code: format!("{}-{}", hop[0], hop[1]),
                    context: format!("train `{}` route has no matching section", train.train_id),
                });
            }
        }

        let hop_is_single = |u: &str, v: &str| {
            sections.get(&(u.to_string(), v.to_string())).map(|s| s.line_type == LineType::Single).unwrap_or(false)
        };
        for (idx, hop) in train.route.windows(2).enumerate() {
            if !hop_is_single(&hop[0], &hop[1]) {
                continue;
            }
            // Only trace from the start of each contiguous single-line run,
            // so a multi-section path logs one warning, not one per hop.
            if idx > 0 && hop_is_single(&train.route[idx - 1], &train.route[idx]) {
                continue;
            }
            let (_, end) = crate::kernel::reservation::trace_single_line_path(&train.route, stations, sections, idx);
            if end == crate::kernel::reservation::LookaheadEnd::RouteEnd {
                tracing::warn!(
                    train = %train.train_id,
                    from = %hop[0],
                    "route stays on single-line track through its final stop with no loop/junction passing point"
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "{contents}").unwrap();
        f
    }

    #[test]
    fn loads_station_with_bool_variants() {
        let f = write_temp(
            "code,name,has_loop,num_loops,num_platforms,max_train_len_m,is_junction,dwell_mean_s,dwell_std_dev_s\n\
             A,Alpha,TRUE,1,2,700,yes,60,5\n",
        );
        let stations = load_stations(f.path()).unwrap();
        let a = &stations["A"];
        assert!(a.has_loop);
        assert!(a.is_junction);
        assert_eq!(a.num_platforms, 2);
    }

    #[test]
    fn loads_sections_bidirectionally_with_defaults() {
        let f = write_temp("u,v,line_type,length_km,vmax_kmph\nA,B,single,5.0,60.0\n");
        let sections = load_sections(f.path()).unwrap();
        assert_eq!(sections.len(), 2);
        let fwd = &sections[&("A".to_string(), "B".to_string())];
        let rev = &sections[&("B".to_string(), "A".to_string())];
        assert_eq!(fwd.line_type, LineType::Single);
        assert_eq!(fwd.signalling, Signalling::Absolute);
        assert_eq!(rev.length_km, fwd.length_km);
    }

    #[test]
    fn missing_disruption_file_is_not_fatal() {
        let disruptions = load_disruptions("/nonexistent/disruptions.csv").unwrap();
        assert!(disruptions.is_empty());
    }

    #[test]
    fn malformed_train_row_fails_load() {
        let f = write_temp("train_id,category,priority,vmax_kmph,acceleration_ms2,base_deceleration_ms2,length_m,route\nT1,pax,not_a_number,60,0.5,0.5,200,A|B\n");
        assert!(load_trains(f.path()).is_err());
    }

    fn station(code: &str) -> Station {
        Station {
            code: code.to_string(),
            name: code.to_string(),
            has_loop: false,
            num_loops: 0,
            num_platforms: 1,
            max_train_len_m: 700,
            is_junction: false,
            dwell_mean_s: 60,
            dwell_std_dev_s: 5,
            occupied_platforms: Vec::new(),
        }
    }

    #[test]
    fn validate_routes_rejects_unknown_station() {
        let mut stations = HashMap::new();
        stations.insert("A".to_string(), station("A"));
        let sections = HashMap::new();
        let trains = vec![Train::new("T1", "pax", 1, 60.0, 0.5, 0.5, 200.0, vec!["A".to_string(), "B".to_string()], 0)];

        let err = validate_routes(&stations, &sections, &trains).unwrap_err();
        assert!(matches!(err, SimError::UnknownStationReference { .. }));
    }

    #[test]
    fn validate_routes_rejects_missing_section() {
        let mut stations = HashMap::new();
        stations.insert("A".to_string(), station("A"));
        stations.insert("B".to_string(), station("B"));
        let sections = HashMap::new();
        let trains = vec![Train::new("T1", "pax", 1, 60.0, 0.5, 0.5, 200.0, vec!["A".to_string(), "B".to_string()], 0)];

        let err = validate_routes(&stations, &sections, &trains).unwrap_err();
        assert!(matches!(err, SimError::UnknownStationReference { .. }));
    }

    #[test]
    fn validate_routes_accepts_well_formed_route() {
        let mut stations = HashMap::new();
        stations.insert("A".to_string(), station("A"));
        stations.insert("B".to_string(), station("B"));
        let mut sections = HashMap::new();
        sections.insert(("A".to_string(), "B".to_string()), Section::new("A", "B", LineType::Double, 10.0, 60.0, Signalling::Automatic, 0.0));
        let trains = vec![Train::new("T1", "pax", 1, 60.0, 0.5, 0.5, 200.0, vec!["A".to_string(), "B".to_string()], 0)];

        assert!(validate_routes(&stations, &sections, &trains).is_ok());
    }
}
