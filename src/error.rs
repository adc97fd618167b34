use thiserror::Error;

/// Load-phase errors. Per spec §7, a malformed static model fails the load
/// phase with a diagnostic; the simulation never starts. Everything the
/// kernel encounters once running is handled in place (a logged anomaly),
/// never surfaced as an `Err`.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("CSV error reading {file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error reading {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed row in {file}: {detail}")]
    MalformedRow { file: String, detail: String },

    #[error("configuration error: {0}")]
    Config(String),

    /// A train's route references a station or section that doesn't exist
    /// in the loaded static model. Unlike the runtime anomalies the kernel
    /// handles in place (spec §7), this is a structural defect in the input
    /// data itself, caught at load time.
    #[error("unknown station reference `{code}` ({context})")]
    UnknownStationReference { code: String, context: String },
}

pub type SimResult<T> = Result<T, SimError>;
