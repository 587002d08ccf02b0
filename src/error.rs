// Error types for band activity detection
//
// Detection errors are per-tick diagnostics: a failed tick is skipped and the
// previous results are held over, never aborting the host. Batch errors cover
// file-level analysis, where a timeout is a permanent failure for that file.

use std::fmt;

/// Errors surfaced by the real-time detection core
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    /// Frame does not match the tracker's declared buffer length
    InvalidFrame { expected: usize, got: usize },

    /// Frame was produced at a different sample rate than the tracker expects
    SampleRateMismatch { expected: u32, got: u32 },
}

impl fmt::Display for DetectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionError::InvalidFrame { expected, got } => {
                write!(
                    f,
                    "invalid spectral frame: expected {} magnitudes, got {}",
                    expected, got
                )
            }
            DetectionError::SampleRateMismatch { expected, got } => {
                write!(
                    f,
                    "sample rate mismatch: tracker configured for {} Hz, frame carries {} Hz",
                    expected, got
                )
            }
        }
    }
}

impl std::error::Error for DetectionError {}

/// Errors surfaced by the batch (file-level) analyzer
#[derive(Debug)]
pub enum BatchError {
    /// Analysis did not complete within the allotted time
    Timeout { limit_ms: u64 },

    /// A declared band has no reading in the input
    MissingBand { name: String },

    /// The analysis worker terminated abnormally
    Worker { reason: String },

    /// Stem separation collaborator failed
    Separation { reason: String },
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::Timeout { limit_ms } => {
                write!(f, "band analysis timed out after {} ms", limit_ms)
            }
            BatchError::MissingBand { name } => {
                write!(f, "no energy reading supplied for band \"{}\"", name)
            }
            BatchError::Worker { reason } => {
                write!(f, "band analysis worker failed: {}", reason)
            }
            BatchError::Separation { reason } => {
                write!(f, "stem separation failed: {}", reason)
            }
        }
    }
}

impl std::error::Error for BatchError {}

impl From<tokio::task::JoinError> for BatchError {
    fn from(err: tokio::task::JoinError) -> Self {
        BatchError::Worker {
            reason: err.to_string(),
        }
    }
}
