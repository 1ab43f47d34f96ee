//! # intentgate
//!
//! Intent-scoped authorization hooks and provenance tracing for AI coding agents.
//!
//! An agent's tool calls pass through a [`HookEngine`] before and after they
//! execute. The standard chain assembled by [`Gate::builder`] enforces:
//!
//! - **Handshake**: a session must select an *intent* from
//!   `.orchestration/active_intents.yaml` before any destructive tool runs.
//! - **Intent selection**: the selected id must exist; its context is rendered
//!   to `.orchestration/intent_contexts/<id>.xml`.
//! - **Write scope**: file mutations must fall inside the intent's `owned_scope`
//!   globs, minus anything listed in `.intentignore`.
//! - **Approval**: a human approves each destructive call through an
//!   [`ApprovalPort`].
//!
//! Accepted `write_to_file` calls are recorded in
//! `.orchestration/agent_trace.jsonl` with a content hash and the owning intent.
//!
//! Blocked calls carry a [`PolicyViolation`] whose document is meant to be
//! shown to the agent verbatim.
//!
//! ## Quick Start
//!
//! ```ignore
//! use intentgate_core::{ChannelApprover, Gate, PreHookOutcome};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> intentgate_core::Result<()> {
//! let (approver, mut requests) = ChannelApprover::new();
//! let approver = Arc::new(approver);
//!
//! let gate = Gate::builder()
//!     .with_workspace_root("/path/to/project")
//!     .with_approval_arc(approver.clone())
//!     .build();
//!
//! let outcome = gate
//!     .pre_tool("write_to_file", json!({"path": "src/lib.rs"}), Some("session-1"), None)
//!     .await?;
//!
//! match outcome {
//!     PreHookOutcome::Allow { .. } => { /* run the tool, then gate.post(...) */ }
//!     PreHookOutcome::Block { error } => println!("{}", error.document_string()),
//!     PreHookOutcome::WaitForApproval { approval_id } => println!("waiting on {approval_id}"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod approval;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod gate;
pub mod hooks;
pub mod manifest;
pub mod policy;
pub mod scope;
pub mod session;
pub mod tool;
pub mod trace;
pub mod workspace;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use approval::{ApprovalError, ApprovalPort, ApprovalRequest, ChannelApprover, StaticApprover};
pub use config::{ConfigError, GateConfig};
pub use context::{ContextError, PostHookContext, ToolCallContext};
pub use engine::{HookEngine, HookError, HookId, PostHook, PreHook, PreHookOutcome};
pub use error::{Error, Result};
pub use gate::{Gate, GateBuilder};
pub use manifest::{find_intent, load_manifest, parse_manifest, IdlessEntries, IntentRecord};
pub use policy::{PolicyCode, PolicyViolation};
pub use scope::{matches, ScopePattern, ScopeSet};
pub use session::{normalize_session_id, MemorySessionStore, SessionStore, GLOBAL_SESSION};
pub use tool::{is_destructive_tool, ToolCall, ToolKind};
pub use trace::{content_hash, AuditRecord, TracePostHook, TraceWriter};
pub use workspace::{
    FixedRevision, FixedWorkspace, GitRevision, RevisionResolver, WorkspaceResolver,
    UNKNOWN_REVISION,
};
