//! Gate construction from command-line options

use intentgate_core::{Gate, GateBuilder};
use std::path::{Path, PathBuf};

use crate::error::CliError;

/// Start a [`GateBuilder`] for `workspace` (or the current directory), with
/// the config file applied when one is given.
pub async fn gate_builder(
    workspace: Option<&Path>,
    config: Option<&Path>,
) -> Result<GateBuilder, CliError> {
    let root: PathBuf = match workspace {
        Some(root) => root.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let mut builder = Gate::builder().with_workspace_root(&root);
    if let Some(path) = config {
        builder = builder.with_config_file(path).await?;
    }
    tracing::debug!(root = %root.display(), "workspace configured");
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_config_file_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.json");
        std::fs::write(&path, r#"{"model_identifier": "local-model"}"#).unwrap();

        let gate = gate_builder(Some(dir.path()), Some(&path))
            .await
            .unwrap()
            .build();
        assert_eq!(gate.config().model_identifier, "local-model");
    }

    #[tokio::test]
    async fn test_bad_config_is_gate_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = gate_builder(Some(dir.path()), Some(&path)).await.err().unwrap();
        match err {
            CliError::Gate(e) => assert!(e.is_config()),
            other => panic!("expected gate error, got {:?}", other),
        }
    }
}
