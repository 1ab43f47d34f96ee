//! Workspace root and revision lookup.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Revision reported when the real one cannot be determined.
pub const UNKNOWN_REVISION: &str = "unknown";

/// Supplies the workspace root hooks operate in.
pub trait WorkspaceResolver: Send + Sync {
    /// The root directory, or `None` when no workspace is open.
    fn workspace_root(&self) -> Option<PathBuf>;
}

/// A workspace root fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct FixedWorkspace {
    root: Option<PathBuf>,
}

impl FixedWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// No workspace; hooks that need one will block.
    pub fn none() -> Self {
        Self { root: None }
    }
}

impl WorkspaceResolver for FixedWorkspace {
    fn workspace_root(&self) -> Option<PathBuf> {
        self.root.clone()
    }
}

/// Best-effort lookup of the current version-control revision.
#[async_trait]
pub trait RevisionResolver: Send + Sync {
    /// Never fails; returns [`UNKNOWN_REVISION`] when lookup is impossible.
    async fn revision(&self, root: &Path) -> String;
}

/// Resolves `HEAD` with `git rev-parse`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitRevision;

#[async_trait]
impl RevisionResolver for GitRevision {
    async fn revision(&self, root: &Path) -> String {
        let output = tokio::process::Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(root)
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => {
                let revision = String::from_utf8_lossy(&out.stdout).trim().to_string();
                if revision.is_empty() {
                    UNKNOWN_REVISION.to_string()
                } else {
                    revision
                }
            }
            Ok(out) => {
                tracing::debug!(status = %out.status, "git rev-parse failed");
                UNKNOWN_REVISION.to_string()
            }
            Err(e) => {
                tracing::debug!(error = %e, "could not run git");
                UNKNOWN_REVISION.to_string()
            }
        }
    }
}

/// A revision fixed at construction.
#[derive(Debug, Clone)]
pub struct FixedRevision(pub String);

#[async_trait]
impl RevisionResolver for FixedRevision {
    async fn revision(&self, _root: &Path) -> String {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_workspace() {
        assert_eq!(
            FixedWorkspace::new("/tmp/ws").workspace_root(),
            Some(PathBuf::from("/tmp/ws"))
        );
        assert_eq!(FixedWorkspace::none().workspace_root(), None);
    }

    #[tokio::test]
    async fn test_git_revision_outside_repo_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        // git cannot start in a missing directory
        let missing = dir.path().join("missing");
        assert_eq!(GitRevision.revision(&missing).await, UNKNOWN_REVISION);
    }

    #[tokio::test]
    async fn test_fixed_revision() {
        let rev = FixedRevision("abc123".into());
        assert_eq!(rev.revision(Path::new(".")).await, "abc123");
    }
}
