//! Error taxonomy for harness operations.

use std::path::PathBuf;
use std::time::Duration;

/// Error type for harness operations.
///
/// Lower-level failures are never swallowed: execution and digest errors
/// propagate as the result of the enclosing operation with the original
/// cause attached. The harness itself never retries a failed command.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("command failed: {command}: {detail}")]
    Exec { command: String, detail: String },

    #[error("failed to spawn command: {command}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to digest {path}")]
    Digest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("services not ready after {0:?}")]
    Timeout(Duration),

    #[error("all restart candidates failed; last attempt: {0}")]
    RestartExhausted(#[source] Box<HarnessError>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for harness operations.
pub type HarnessResult<T> = Result<T, HarnessError>;
