use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Barrier timeout: workers {missing:?} did not report within {waited:?}")]
    BarrierTimeout { missing: Vec<usize>, waited: Duration },

    #[error("Worker {rank} failed: {source}")]
    WorkerFailed {
        rank: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("Runtime error: {0}")]
    RuntimeError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    /// True for failures raised before any worker started aggregating.
    pub fn is_configuration(&self) -> bool {
        match self {
            Error::Configuration(_) => true,
            Error::WorkerFailed { source, .. } => source.is_configuration(),
            _ => false,
        }
    }

    /// True when a worker rejected its input data.
    pub fn is_data_integrity(&self) -> bool {
        match self {
            Error::DataIntegrity(_) => true,
            Error::WorkerFailed { source, .. } => source.is_data_integrity(),
            _ => false,
        }
    }
}
