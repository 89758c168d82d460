use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, GenError>;

/// Failures raised while building or reading generator artifacts.
///
/// Everything here is fatal for the detector unit that hit it and is never
/// retried: the whole computation is deterministic, so re-running with the
/// same inputs cannot change the outcome.
#[derive(Debug, Error)]
pub enum GenError {
    /// A required object is absent from the histogram store.
    #[error("no stored object for detector {detector}, channel {channel:?} (key '{key}')")]
    MissingInput {
        detector: usize,
        /// `None` for objects not tied to an indexed channel
        /// (the secondary spectrum, a persisted table).
        channel: Option<usize>,
        key: String,
    },

    /// Input spectra feeding one aggregation or sampler build disagree on
    /// bin layout (count or centers).
    #[error("bin layout mismatch in {context}: {detail}")]
    ShapeMismatch { context: String, detail: String },

    /// A spectrum violated its construction invariants.
    #[error("invalid spectrum: {0}")]
    InvalidSpectrum(String),

    /// Bad or inconsistent configuration values.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Format-level store failure (I/O, parse, schema).
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
