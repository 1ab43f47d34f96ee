//! Common test utilities shared across test files.
//!
//! Items here may not be used by all test files, hence the module-level allow.
#![allow(dead_code)]

use intentgate_core::test_utils::RecordingApprover;
use intentgate_core::{FixedRevision, Gate, GateConfig, ToolCallContext};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

pub const REVISION: &str = "0123456789abcdef";

pub const MANIFEST: &str = "# Intents for this workspace
active_intents:
  - id: I-1
    name: Feature work
    status: IN_PROGRESS
    owned_scope:
      - src/feature/**
    constraints:
      - Do not touch the public API
  - id: I-9
    name: Docs
    owned_scope:
      - docs/**
      - README.md
  - id: I-EMPTY
    status: DRAFT
";

/// A temporary workspace with the standard manifest.
pub fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), MANIFEST);
    dir
}

pub fn write_manifest(root: &Path, text: &str) {
    let orchestration = root.join(".orchestration");
    std::fs::create_dir_all(&orchestration).unwrap();
    std::fs::write(orchestration.join("active_intents.yaml"), text).unwrap();
}

/// A gate over `root` with the given approver and a fixed revision.
pub fn gate(root: &Path, approver: Arc<RecordingApprover>) -> Gate {
    Gate::builder()
        .with_workspace_root(root)
        .with_approval_arc(approver)
        .with_revision(FixedRevision(REVISION.into()))
        .with_config(GateConfig::default())
        .build()
}

pub fn call(tool: &str, params: Value, session: &str) -> ToolCallContext {
    ToolCallContext::new(tool, params)
        .unwrap()
        .with_session(session)
}

/// Parsed lines of the trace log, or nothing if it does not exist.
pub fn trace_lines(root: &Path) -> Vec<Value> {
    match std::fs::read_to_string(root.join(".orchestration/agent_trace.jsonl")) {
        Ok(text) => text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect(),
        Err(_) => Vec::new(),
    }
}
