//! Gate configuration.
//!
//! All paths are relative to the workspace root. Every field has a default,
//! so a config file only needs the values it changes:
//!
//! ```json
//! { "trace_log": ".audit/trace.jsonl", "model_identifier": "claude-sonnet-4-5" }
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Workspace-relative locations and limits used by the hooks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateConfig {
    /// Intent manifest.
    pub manifest: PathBuf,
    /// Directory receiving rendered `<id>.xml` intent contexts.
    pub context_dir: PathBuf,
    /// Append-only JSONL audit log.
    pub trace_log: PathBuf,
    /// Optional list of paths exempt from scope checks.
    pub ignore_file: PathBuf,
    /// Characters of a shell command shown in approval prompts.
    pub command_summary_limit: usize,
    /// Recorded as the contributor model in trace records.
    pub model_identifier: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            manifest: PathBuf::from(".orchestration/active_intents.yaml"),
            context_dir: PathBuf::from(".orchestration/intent_contexts"),
            trace_log: PathBuf::from(".orchestration/agent_trace.jsonl"),
            ignore_file: PathBuf::from(".intentignore"),
            command_summary_limit: 120,
            model_identifier: "unknown-model".to_string(),
        }
    }
}

impl GateConfig {
    /// Load a JSON config file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_manifest(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest = path.into();
        self
    }

    pub fn with_context_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.context_dir = path.into();
        self
    }

    pub fn with_trace_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.trace_log = path.into();
        self
    }

    pub fn with_ignore_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignore_file = path.into();
        self
    }

    pub fn with_command_summary_limit(mut self, limit: usize) -> Self {
        self.command_summary_limit = limit;
        self
    }

    pub fn with_model_identifier(mut self, model: impl Into<String>) -> Self {
        self.model_identifier = model.into();
        self
    }
}
