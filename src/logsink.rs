//! Structured event sink (spec §6, "Event log sink"). Distinct from
//! `tracing` — this is the train-movement trace that gets exported to CSV,
//! not operational logging.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub time: i64,
    pub train_id: String,
    pub event: String,
    pub location: String,
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(
        &mut self,
        time: i64,
        train_id: &str,
        event: impl Into<String>,
        location: impl Into<String>,
        reason: Option<String>,
    ) {
        let entry = LogEntry {
            time,
            train_id: train_id.to_string(),
            event: event.into(),
            location: location.into(),
            reason,
        };
        tracing::debug!(
            time = entry.time,
            train = %entry.train_id,
            event = %entry.event,
            location = %entry.location,
            "event logged"
        );
        self.events.push(entry);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn export_csv(&self, path: impl AsRef<std::path::Path>) -> csv::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for entry in &self.events {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(())
    }
}
