//! Top-level error type for intentgate
//!
//! Flattens the per-concern errors into the categories a host needs to act on:
//!
//! - [`Error::InvalidRequest`] - The tool call was malformed; report it to the agent
//! - [`Error::Config`] - Fix the configuration file and restart
//!
//! Policy decisions are never errors; they are [`PreHookOutcome`](crate::PreHookOutcome)s,
//! and hook failures become `HOOK_ERROR` blocks inside the engine.

use thiserror::Error;

use crate::config::ConfigError;
use crate::context::ContextError;

#[derive(Debug, Error)]
pub enum Error {
    /// The tool call failed boundary validation
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<ContextError> for Error {
    fn from(err: ContextError) -> Self {
        Error::InvalidRequest(err.to_string())
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
