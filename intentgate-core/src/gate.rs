//! Gate and GateBuilder for wiring the standard hook chain
//!
//! The builder collects collaborators, then registers the standard hooks on a
//! fresh [`HookEngine`] in this order:
//!
//! 1. [`IntentSelectionValidator`]
//! 2. [`HandshakeGate`]
//! 3. [`WriteScopeEnforcer`]
//! 4. [`DestructiveApprovalGate`]
//!
//! and [`TracePostHook`] as the only post-hook. Selection validation runs
//! before the handshake, so an unknown intent is never bound to a session.
//!
//! # Example
//!
//! ```rust
//! use intentgate_core::{Gate, StaticApprover, ToolCallContext};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let gate = Gate::builder()
//!     .with_workspace_root("/tmp/project")
//!     .with_approval(StaticApprover::deny_all())
//!     .build();
//!
//! let ctx = ToolCallContext::new("write_to_file", json!({"path": "a.txt"}))
//!     .unwrap()
//!     .with_session("s1");
//! let outcome = gate.pre(&ctx).await;
//! assert!(outcome.is_block()); // no intent selected yet
//! # });
//! ```

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::approval::{ApprovalPort, StaticApprover};
use crate::config::GateConfig;
use crate::context::{PostHookContext, ToolCallContext};
use crate::engine::{HookEngine, PreHookOutcome};
use crate::error::Result;
use crate::hooks::{
    DestructiveApprovalGate, HandshakeGate, IntentSelectionValidator, WriteScopeEnforcer,
};
use crate::session::{MemorySessionStore, SessionStore};
use crate::trace::TracePostHook;
use crate::workspace::{FixedWorkspace, GitRevision, RevisionResolver, WorkspaceResolver};

/// A hook engine with the standard policy chain registered.
pub struct Gate {
    engine: Arc<HookEngine>,
    sessions: Arc<dyn SessionStore>,
    config: Arc<GateConfig>,
}

impl Gate {
    pub fn builder() -> GateBuilder {
        GateBuilder::new()
    }

    /// Run the pre-hook chain for a call.
    pub async fn pre(&self, ctx: &ToolCallContext) -> PreHookOutcome {
        self.engine.run_pre_hooks(ctx).await
    }

    /// Run the post-hook chain for a completed call.
    pub async fn post(&self, ctx: &PostHookContext) {
        self.engine.run_post_hooks(ctx).await
    }

    /// Validate a raw tool call and run the pre-hook chain for it.
    ///
    /// Parameters that fail boundary validation are returned as
    /// [`Error::InvalidRequest`](crate::Error::InvalidRequest); no hook runs.
    pub async fn pre_tool(
        &self,
        tool: impl Into<String>,
        params: Value,
        session_id: Option<&str>,
        intent_id: Option<&str>,
    ) -> Result<PreHookOutcome> {
        let ctx = call_context(tool.into(), params, session_id, intent_id)?;
        Ok(self.pre(&ctx).await)
    }

    /// Validate a raw completed tool call and run the post-hook chain for it.
    pub async fn post_tool(
        &self,
        tool: impl Into<String>,
        params: Value,
        result: Value,
        session_id: Option<&str>,
        intent_id: Option<&str>,
    ) -> Result<()> {
        let ctx = call_context(tool.into(), params, session_id, intent_id)?;
        self.post(&ctx.into_post(result)).await;
        Ok(())
    }

    /// The underlying engine, for registering extra hooks.
    pub fn engine(&self) -> &Arc<HookEngine> {
        &self.engine
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}

fn call_context(
    tool: String,
    params: Value,
    session_id: Option<&str>,
    intent_id: Option<&str>,
) -> Result<ToolCallContext> {
    let mut ctx = ToolCallContext::new(tool, params)?;
    if let Some(session) = session_id {
        ctx = ctx.with_session(session);
    }
    if let Some(intent) = intent_id {
        ctx = ctx.with_intent(intent);
    }
    Ok(ctx)
}

/// Builder for [`Gate`]
///
/// Every collaborator has a default: no workspace, reject every approval,
/// an in-memory session store, `git` revisions, and [`GateConfig::default`].
pub struct GateBuilder {
    workspace: Arc<dyn WorkspaceResolver>,
    approval: Arc<dyn ApprovalPort>,
    sessions: Arc<dyn SessionStore>,
    revision: Arc<dyn RevisionResolver>,
    config: GateConfig,
}

impl Default for GateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GateBuilder {
    pub fn new() -> Self {
        Self {
            workspace: Arc::new(FixedWorkspace::none()),
            approval: Arc::new(StaticApprover::deny_all()),
            sessions: Arc::new(MemorySessionStore::new()),
            revision: Arc::new(GitRevision),
            config: GateConfig::default(),
        }
    }

    pub fn with_workspace_root(self, root: impl Into<PathBuf>) -> Self {
        self.with_workspace(FixedWorkspace::new(root))
    }

    pub fn with_workspace(mut self, workspace: impl WorkspaceResolver + 'static) -> Self {
        self.workspace = Arc::new(workspace);
        self
    }

    pub fn with_approval(self, approval: impl ApprovalPort + 'static) -> Self {
        self.with_approval_arc(Arc::new(approval))
    }

    /// Use a shared approval port, e.g. a [`ChannelApprover`](crate::ChannelApprover)
    /// the host also answers through.
    pub fn with_approval_arc(mut self, approval: Arc<dyn ApprovalPort>) -> Self {
        self.approval = approval;
        self
    }

    pub fn with_session_store(mut self, sessions: Arc<dyn SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_revision(mut self, revision: impl RevisionResolver + 'static) -> Self {
        self.revision = Arc::new(revision);
        self
    }

    pub fn with_config(mut self, config: GateConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the config with one loaded from a JSON file.
    pub async fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let config = GateConfig::load(path).await?;
        Ok(self.with_config(config))
    }

    pub fn build(self) -> Gate {
        let config = Arc::new(self.config);
        let engine = Arc::new(HookEngine::with_approval(Arc::clone(&self.approval)));

        engine.register_pre_hook(IntentSelectionValidator::new(
            Arc::clone(&self.workspace),
            Arc::clone(&config),
        ));
        engine.register_pre_hook(HandshakeGate::new(Arc::clone(&self.sessions)));
        engine.register_pre_hook(WriteScopeEnforcer::new(
            Arc::clone(&self.workspace),
            Arc::clone(&self.sessions),
            Arc::clone(&config),
        ));
        engine.register_pre_hook(DestructiveApprovalGate::new(
            Arc::clone(&self.sessions),
            engine.approval(),
            config.command_summary_limit,
        ));
        engine.register_post_hook(TracePostHook::new(
            self.workspace,
            Arc::clone(&self.sessions),
            self.revision,
            Arc::clone(&config),
        ));

        tracing::debug!(
            pre_hooks = engine.pre_hook_count(),
            post_hooks = engine.post_hook_count(),
            "gate built"
        );

        Gate {
            engine,
            sessions: self.sessions,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_registers_standard_chain() {
        let gate = Gate::builder().build();
        assert_eq!(gate.engine().pre_hook_count(), 4);
        assert_eq!(gate.engine().post_hook_count(), 1);
        assert_eq!(gate.config().command_summary_limit, 120);
    }

    #[tokio::test]
    async fn test_pre_tool_rejects_malformed_params() {
        let gate = Gate::builder().build();
        let err = gate
            .pre_tool("write_to_file", serde_json::json!([1, 2]), Some("s1"), None)
            .await
            .unwrap_err();
        assert!(err.is_invalid_request());

        let err = gate
            .post_tool("write_to_file", serde_json::json!("x"), Value::Null, None, None)
            .await
            .unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[tokio::test]
    async fn test_pre_tool_runs_chain() {
        let gate = Gate::builder().build();
        let outcome = gate
            .pre_tool("read_file", serde_json::json!({"path": "a.txt"}), None, None)
            .await
            .unwrap();
        assert!(outcome.is_allow());
    }

    #[tokio::test]
    async fn test_with_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.json");
        std::fs::write(&path, r#"{"command_summary_limit": 40}"#).unwrap();
        let gate = Gate::builder().with_config_file(&path).await.unwrap().build();
        assert_eq!(gate.config().command_summary_limit, 40);

        let err = Gate::builder()
            .with_config_file(dir.path().join("missing.json"))
            .await
            .err()
            .unwrap();
        assert!(err.is_config());
    }

    #[test]
    fn test_shared_session_store() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let gate = Gate::builder()
            .with_session_store(Arc::clone(&store))
            .build();
        store.set_active_intent(Some("s"), "I-1");
        assert_eq!(
            gate.sessions().get_active_intent(Some("s")).as_deref(),
            Some("I-1")
        );
    }
}
