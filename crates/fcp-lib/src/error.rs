use thiserror::Error;

/// Errors raised by loading, column resolution and cycle selection.
#[derive(Error, Debug)]
pub enum FcpError {
    #[error("error loading {file}: {reason}")]
    Load { file: String, reason: String },
    #[error("could not find column(s) for {}; available headers: {}", .missing.join(", "), .headers.join(", "))]
    ColumnResolution {
        missing: Vec<String>,
        headers: Vec<String>,
    },
    #[error("column mapping points at column {index} but the table only has {arity} column(s)")]
    InvalidMapping { index: usize, arity: usize },
    #[error("no non-zero current (|I| > {threshold:e}) in {file}")]
    NoActivity { file: String, threshold: f64 },
    #[error("{kind} {requested} not found. Available: 1-{available}")]
    CycleRange {
        kind: &'static str,
        requested: i64,
        available: usize,
    },
    #[error("invalid cycle format: '{0}'. Use 'discharge X', 'charge X', a cycle number, or 'all'")]
    SpecFormat(String),
    #[error("cycles were computed for dataset generation {computed}, not for this dataset (generation {current})")]
    StaleCycles { computed: u64, current: u64 },
    #[error("active mass must be a positive number of grams, got {0}")]
    InvalidMass(f64),
    #[error("unknown colormap '{0}' (expected viridis, plasma, inferno, cool or tab10)")]
    UnknownColormap(String),
}

pub type Result<T, E = FcpError> = std::result::Result<T, E>;
