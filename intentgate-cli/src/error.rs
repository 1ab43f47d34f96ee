//! CLI-specific error types

use thiserror::Error;

/// Errors that can occur while hosting the gate
#[derive(Debug, Error)]
pub enum CliError {
    /// Gate, request, or configuration error
    #[error("Gate error: {0}")]
    Gate(#[from] intentgate_core::Error),

    /// Malformed protocol line
    #[error("Protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    /// IO error (stdin, stdout, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
