//! Hook registration and execution.
//!
//! Pre-hooks run before a tool executes and decide whether it may. They run
//! one at a time in registration order, and the first non-allow outcome ends
//! the chain. A hook that fails internally blocks the call with `HOOK_ERROR`;
//! the engine never fails open.
//!
//! Post-hooks run after the tool has executed. Every one of them runs; their
//! failures are logged and swallowed because the tool has already happened.
//!
//! # Example
//!
//! ```rust
//! use intentgate_core::engine::{HookEngine, PreHookOutcome};
//! use intentgate_core::ToolCallContext;
//!
//! # tokio_test::block_on(async {
//! let engine = HookEngine::new();
//! let ctx = ToolCallContext::new("read_file", serde_json::json!({})).unwrap();
//!
//! // No hooks registered: everything is allowed.
//! assert!(engine.run_pre_hooks(&ctx).await.is_allow());
//! # });
//! ```

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::approval::{ApprovalPort, StaticApprover};
use crate::context::{PostHookContext, ToolCallContext};
use crate::policy::{PolicyCode, PolicyViolation};

/// Internal failure of a hook.
///
/// Returned by hooks for conditions they did not anticipate. The engine turns
/// these into `HOOK_ERROR` blocks for pre-hooks and log lines for post-hooks.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<String> for HookError {
    fn from(s: String) -> Self {
        HookError::Other(s)
    }
}

impl From<&str> for HookError {
    fn from(s: &str) -> Self {
        HookError::Other(s.to_string())
    }
}

/// Decision of a pre-hook, and of the pre-hook chain as a whole.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PreHookOutcome {
    /// The call may proceed. The payload carries context for the caller.
    Allow {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<Map<String, Value>>,
    },
    /// The call must not proceed.
    Block { error: PolicyViolation },
    /// The call is parked until an out-of-band decision arrives.
    WaitForApproval { approval_id: String },
}

impl PreHookOutcome {
    pub fn allow() -> Self {
        PreHookOutcome::Allow { payload: None }
    }

    pub fn allow_with(payload: Map<String, Value>) -> Self {
        PreHookOutcome::Allow {
            payload: Some(payload),
        }
    }

    pub fn block(violation: PolicyViolation) -> Self {
        PreHookOutcome::Block { error: violation }
    }

    pub fn is_allow(&self) -> bool {
        matches!(self, PreHookOutcome::Allow { .. })
    }

    pub fn is_block(&self) -> bool {
        matches!(self, PreHookOutcome::Block { .. })
    }

    /// The blocking code, if this is a block.
    pub fn block_code(&self) -> Option<PolicyCode> {
        match self {
            PreHookOutcome::Block { error } => Some(error.code),
            _ => None,
        }
    }

    pub fn payload(&self) -> Option<&Map<String, Value>> {
        match self {
            PreHookOutcome::Allow { payload } => payload.as_ref(),
            _ => None,
        }
    }
}

/// A check run before a tool executes.
#[async_trait]
pub trait PreHook: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn before(&self, ctx: &ToolCallContext) -> Result<PreHookOutcome, HookError>;
}

/// A side effect run after a tool executes.
#[async_trait]
pub trait PostHook: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn after(&self, ctx: &PostHookContext) -> Result<(), HookError>;
}

/// Unique identifier for a registered hook.
///
/// Used to remove hooks via [`HookEngine::unregister_pre_hook`] and
/// [`HookEngine::unregister_post_hook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

/// Ordered pre/post hook chains plus the approval port hooks may consult.
pub struct HookEngine {
    pre_hooks: RwLock<Vec<(HookId, Arc<dyn PreHook>)>>,
    post_hooks: RwLock<Vec<(HookId, Arc<dyn PostHook>)>>,
    next_hook_id: AtomicU64,
    approval: Arc<dyn ApprovalPort>,
}

impl HookEngine {
    /// Create an engine whose approval port rejects everything.
    pub fn new() -> Self {
        Self::with_approval(Arc::new(StaticApprover::deny_all()))
    }

    pub fn with_approval(approval: Arc<dyn ApprovalPort>) -> Self {
        Self {
            pre_hooks: RwLock::new(Vec::new()),
            post_hooks: RwLock::new(Vec::new()),
            next_hook_id: AtomicU64::new(0),
            approval,
        }
    }

    fn next_id(&self) -> HookId {
        HookId(self.next_hook_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Append a pre-hook to the chain.
    pub fn register_pre_hook(&self, hook: impl PreHook + 'static) -> HookId {
        self.register_pre_hook_arc(Arc::new(hook))
    }

    pub fn register_pre_hook_arc(&self, hook: Arc<dyn PreHook>) -> HookId {
        let id = self.next_id();
        self.pre_hooks.write().push((id, hook));
        id
    }

    /// Remove a pre-hook. Returns `false` if it was not registered.
    pub fn unregister_pre_hook(&self, id: HookId) -> bool {
        let mut hooks = self.pre_hooks.write();
        let before = hooks.len();
        hooks.retain(|(hook_id, _)| *hook_id != id);
        hooks.len() < before
    }

    /// Append a post-hook to the chain.
    pub fn register_post_hook(&self, hook: impl PostHook + 'static) -> HookId {
        self.register_post_hook_arc(Arc::new(hook))
    }

    pub fn register_post_hook_arc(&self, hook: Arc<dyn PostHook>) -> HookId {
        let id = self.next_id();
        self.post_hooks.write().push((id, hook));
        id
    }

    /// Remove a post-hook. Returns `false` if it was not registered.
    pub fn unregister_post_hook(&self, id: HookId) -> bool {
        let mut hooks = self.post_hooks.write();
        let before = hooks.len();
        hooks.retain(|(hook_id, _)| *hook_id != id);
        hooks.len() < before
    }

    pub fn pre_hook_count(&self) -> usize {
        self.pre_hooks.read().len()
    }

    pub fn post_hook_count(&self) -> usize {
        self.post_hooks.read().len()
    }

    /// Run the pre-hook chain.
    ///
    /// Allow payloads are merged in order, so a later hook's key replaces an
    /// earlier hook's.
    pub async fn run_pre_hooks(&self, ctx: &ToolCallContext) -> PreHookOutcome {
        // Snapshot so registration changes mid-run do not affect this call.
        let hooks: Vec<Arc<dyn PreHook>> =
            self.pre_hooks.read().iter().map(|(_, h)| Arc::clone(h)).collect();

        let mut merged: Option<Map<String, Value>> = None;
        for hook in hooks {
            match hook.before(ctx).await {
                Ok(PreHookOutcome::Allow { payload }) => {
                    if let Some(payload) = payload {
                        merged.get_or_insert_with(Map::new).extend(payload);
                    }
                }
                Ok(outcome) => {
                    tracing::debug!(
                        hook = hook.name(),
                        tool = %ctx.tool_name,
                        code = ?outcome.block_code(),
                        "pre-hook stopped the chain"
                    );
                    return outcome;
                }
                Err(e) => {
                    tracing::error!(hook = hook.name(), tool = %ctx.tool_name, error = %e, "pre-hook failed");
                    return PreHookOutcome::block(PolicyViolation::new(
                        PolicyCode::HookError,
                        e.to_string(),
                    ));
                }
            }
        }
        PreHookOutcome::Allow { payload: merged }
    }

    /// Run every post-hook, absorbing failures.
    pub async fn run_post_hooks(&self, ctx: &PostHookContext) {
        let hooks: Vec<Arc<dyn PostHook>> =
            self.post_hooks.read().iter().map(|(_, h)| Arc::clone(h)).collect();

        for hook in hooks {
            if let Err(e) = hook.after(ctx).await {
                tracing::warn!(hook = hook.name(), tool = %ctx.tool_name, error = %e, "post-hook failed");
            }
        }
    }

    /// Ask the approval port for a decision.
    pub async fn request_approval(&self, prompt: &str) -> bool {
        self.approval.request_approval(prompt).await
    }

    /// The approval port shared with hooks.
    pub fn approval(&self) -> Arc<dyn ApprovalPort> {
        Arc::clone(&self.approval)
    }
}

impl Default for HookEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{CountingPostHook, FailingPostHook, StubPreHook};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn ctx() -> ToolCallContext {
        ToolCallContext::new("read_file", json!({})).unwrap()
    }

    #[tokio::test]
    async fn test_empty_engine_allows() {
        let engine = HookEngine::new();
        assert_eq!(engine.run_pre_hooks(&ctx()).await, PreHookOutcome::allow());
    }

    #[tokio::test]
    async fn test_block_short_circuits() {
        let engine = HookEngine::new();
        let first = StubPreHook::allow();
        let blocker = StubPreHook::block(PolicyCode::ScopeViolation);
        let last = StubPreHook::allow();
        let (first_calls, blocker_calls, last_calls) =
            (first.calls(), blocker.calls(), last.calls());

        engine.register_pre_hook(first);
        engine.register_pre_hook(blocker);
        engine.register_pre_hook(last);

        let outcome = engine.run_pre_hooks(&ctx()).await;
        assert_eq!(outcome.block_code(), Some(PolicyCode::ScopeViolation));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(blocker_calls.load(Ordering::SeqCst), 1);
        assert_eq!(last_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_wait_for_approval_short_circuits() {
        let engine = HookEngine::new();
        let waiter = StubPreHook::new(PreHookOutcome::WaitForApproval {
            approval_id: "ap-1".into(),
        });
        let after = StubPreHook::allow();
        let after_calls = after.calls();
        engine.register_pre_hook(waiter);
        engine.register_pre_hook(after);

        let outcome = engine.run_pre_hooks(&ctx()).await;
        assert_eq!(
            outcome,
            PreHookOutcome::WaitForApproval {
                approval_id: "ap-1".into()
            }
        );
        assert_eq!(after_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_fails_closed() {
        let engine = HookEngine::new();
        let after = StubPreHook::allow();
        let after_calls = after.calls();
        engine.register_pre_hook(StubPreHook::fail("manifest exploded"));
        engine.register_pre_hook(after);

        let outcome = engine.run_pre_hooks(&ctx()).await;
        match outcome {
            PreHookOutcome::Block { error } => {
                assert_eq!(error.code, PolicyCode::HookError);
                assert_eq!(error.message, "manifest exploded");
            }
            other => panic!("expected block, got {:?}", other),
        }
        assert_eq!(after_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_payloads_merge_later_wins() {
        let engine = HookEngine::new();
        let mut a = Map::new();
        a.insert("shared".into(), json!("first"));
        a.insert("only_a".into(), json!(1));
        let mut b = Map::new();
        b.insert("shared".into(), json!("second"));

        engine.register_pre_hook(StubPreHook::new(PreHookOutcome::allow_with(a)));
        engine.register_pre_hook(StubPreHook::allow());
        engine.register_pre_hook(StubPreHook::new(PreHookOutcome::allow_with(b)));

        let outcome = engine.run_pre_hooks(&ctx()).await;
        let payload = outcome.payload().unwrap();
        assert_eq!(payload["shared"], "second");
        assert_eq!(payload["only_a"], 1);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let engine = HookEngine::new();
        let id = engine.register_pre_hook(StubPreHook::block(PolicyCode::HookError));
        assert_eq!(engine.pre_hook_count(), 1);

        assert!(engine.unregister_pre_hook(id));
        assert!(!engine.unregister_pre_hook(id));
        assert_eq!(engine.pre_hook_count(), 0);
        assert!(engine.run_pre_hooks(&ctx()).await.is_allow());
    }

    #[tokio::test]
    async fn test_unregister_removes_only_that_hook() {
        let engine = HookEngine::new();
        let keep = engine.register_pre_hook(StubPreHook::allow());
        let drop_id = engine.register_pre_hook(StubPreHook::block(PolicyCode::UserRejected));
        assert_ne!(keep, drop_id);

        engine.unregister_pre_hook(drop_id);
        assert_eq!(engine.pre_hook_count(), 1);
        assert!(engine.run_pre_hooks(&ctx()).await.is_allow());
    }

    #[tokio::test]
    async fn test_post_hooks_all_run_despite_failures() {
        let engine = HookEngine::new();
        let counter = Arc::new(AtomicUsize::new(0));
        engine.register_post_hook(CountingPostHook::new(Arc::clone(&counter)));
        engine.register_post_hook(FailingPostHook);
        engine.register_post_hook(CountingPostHook::new(Arc::clone(&counter)));

        engine.run_post_hooks(&ctx().into_post(json!(null))).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unregister_post_hook() {
        let engine = HookEngine::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = engine.register_post_hook(CountingPostHook::new(Arc::clone(&counter)));
        assert!(engine.unregister_post_hook(id));
        assert!(!engine.unregister_post_hook(id));

        engine.run_post_hooks(&ctx().into_post(json!(null))).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(engine.post_hook_count(), 0);
    }

    #[tokio::test]
    async fn test_request_approval_delegates() {
        let engine = HookEngine::with_approval(Arc::new(StaticApprover::approve_all()));
        assert!(engine.request_approval("ok?").await);
        assert!(!HookEngine::new().request_approval("ok?").await);
    }

    #[test]
    fn test_outcome_serialization() {
        let allow = serde_json::to_value(PreHookOutcome::allow()).unwrap();
        assert_eq!(allow, json!({"action": "allow"}));

        let block = serde_json::to_value(PreHookOutcome::block(PolicyViolation::new(
            PolicyCode::EmptyScope,
            "none",
        )))
        .unwrap();
        assert_eq!(block["action"], "block");
        assert_eq!(block["error"]["code"], "EMPTY_SCOPE");

        let wait = serde_json::to_value(PreHookOutcome::WaitForApproval {
            approval_id: "x".into(),
        })
        .unwrap();
        assert_eq!(wait, json!({"action": "wait_for_approval", "approval_id": "x"}));
    }
}
