use std::path::PathBuf;
use thiserror::Error;

use crate::llm::BatchStatus;

/// Failure of a single request against the completion API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed API response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Whether retrying the same request could succeed.
    ///
    /// Transport failures, timeouts, rate limiting and server errors are transient.
    /// Any other 4xx means the request itself is wrong and retrying is pointless.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Status { status, .. } => {
                *status == 408 || *status == 429 || *status >= 500
            }
            ApiError::Malformed(_) => true,
        }
    }
}

/// Errors raised by the dispatcher
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("All {attempts} completion attempts failed: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: ApiError,
    },

    #[error("Completion request rejected: {0}")]
    Rejected(#[source] ApiError),

    #[error("Batch job {job_id} ended with status '{status}'")]
    BatchJobFailed { job_id: String, status: BatchStatus },

    #[error("Batch job {job_id} still '{status}' after {waited_secs}s")]
    BatchJobTimeout {
        job_id: String,
        status: BatchStatus,
        waited_secs: u64,
    },

    #[error("Batch job {job_id} returned no result for {} of {expected} requests (missing: {missing:?})", missing.len())]
    BatchResultIncomplete {
        job_id: String,
        expected: usize,
        missing: Vec<usize>,
    },

    #[error("Failed to encode batch request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Top-level error for pipeline stages and the runner
#[derive(Debug, Error)]
pub enum ScholarError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("GROQ_API_KEY is not set. Export it or add it to a .env file.")]
    MissingApiKey,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No reference papers found in {0:?}")]
    NoReferencePapers(PathBuf),

    #[error("No text could be extracted from any reference paper")]
    NoValidPapers,

    #[error("No main paper found in {0:?}")]
    NoMainPaper(PathBuf),

    #[error("No text could be extracted from main paper {0:?}")]
    EmptyMainPaper(PathBuf),

    #[error("No '{prefix}_*.txt' file found in {dir:?}; run the previous stage first or pass --input")]
    NoStageOutput { prefix: String, dir: PathBuf },

    #[error("Input file {0:?} contains no papers")]
    EmptyStageInput(PathBuf),

    #[error("All {0} summaries in the input recorded a failure; nothing left to process")]
    NoUsableSummaries(usize),
}

impl ScholarError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScholarError::Io {
            path: path.into(),
            source,
        }
    }
}
