// ============================================================
// Layer 3 — Domain Errors
// ============================================================
// Typed failures that callers may want to match on.
// Everything else (I/O, JSON, recorder failures) travels as
// anyhow::Error with context attached at the boundary.
//
// Reference: Rust Book §9 (Recoverable Errors with Result)
//            thiserror crate documentation

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("initialization method {0} is not implemented")]
    UnknownInitPolicy(String),

    #[error("evaluation method '{0}' is not supported (expected 'max' or 'avg')")]
    UnknownEvalMethod(String),

    #[error("fusion mode '{0}' is not supported (expected add, mult, avg or max)")]
    UnknownFusion(String),

    #[error("positional encoding '{0}' is not supported (expected absolute or relative)")]
    UnknownPositionalEncoding(String),

    #[error("device '{0}' is not supported (expected gpu or cpu)")]
    UnknownDevice(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("parameter '{name}' has {rank} dimension(s); {policy} initialization needs a matrix")]
    UnsupportedInitShape {
        name:   String,
        rank:   usize,
        policy: String,
    },

    #[error("training loss became non-finite at epoch {epoch}")]
    NonFiniteLoss { epoch: usize },

    #[error("video name '{0}' does not follow the 'video_<index>' convention")]
    MalformedVideoName(String),

    #[error("video '{0}' is not present in the dataset")]
    MissingVideo(String),

    #[error("video '{key}': {what} has length {found}, expected {expected}")]
    LengthMismatch {
        key:      String,
        what:     &'static str,
        found:    usize,
        expected: usize,
    },
}
