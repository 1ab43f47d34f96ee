//! Test utilities for intentgate-core.
//!
//! Stub hooks and a recording approval port for exercising the engine
//! without a real workspace or a human at the keyboard.
//!
//! Enable with the `test-utils` feature:
//!
//! ```toml
//! [dev-dependencies]
//! intentgate-core = { version = "...", features = ["test-utils"] }
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::approval::ApprovalPort;
use crate::context::{PostHookContext, ToolCallContext};
use crate::engine::{HookError, PostHook, PreHook, PreHookOutcome};
use crate::policy::{PolicyCode, PolicyViolation};

/// Approval port with a fixed answer that remembers every prompt.
pub struct RecordingApprover {
    approve: bool,
    prompts: Mutex<Vec<String>>,
}

impl RecordingApprover {
    pub fn approving() -> Self {
        Self {
            approve: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            approve: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ApprovalPort for RecordingApprover {
    async fn request_approval(&self, prompt: &str) -> bool {
        self.prompts.lock().push(prompt.to_string());
        self.approve
    }
}

/// Pre-hook returning a canned outcome (or failure) and counting calls.
pub struct StubPreHook {
    result: Result<PreHookOutcome, String>,
    calls: Arc<AtomicUsize>,
}

impl StubPreHook {
    pub fn new(outcome: PreHookOutcome) -> Self {
        Self {
            result: Ok(outcome),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn allow() -> Self {
        Self::new(PreHookOutcome::allow())
    }

    pub fn block(code: PolicyCode) -> Self {
        Self::new(PreHookOutcome::block(PolicyViolation::new(
            code,
            format!("stub {}", code),
        )))
    }

    /// A hook that fails internally with `message`.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            result: Err(message.into()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter; clone it before handing the hook to an engine.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl PreHook for StubPreHook {
    fn name(&self) -> &str {
        "stub"
    }

    async fn before(&self, _ctx: &ToolCallContext) -> Result<PreHookOutcome, HookError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(HookError::Other)
    }
}

/// Post-hook that increments a shared counter.
pub struct CountingPostHook {
    counter: Arc<AtomicUsize>,
}

impl CountingPostHook {
    pub fn new(counter: Arc<AtomicUsize>) -> Self {
        Self { counter }
    }
}

#[async_trait]
impl PostHook for CountingPostHook {
    fn name(&self) -> &str {
        "counting"
    }

    async fn after(&self, _ctx: &PostHookContext) -> Result<(), HookError> {
        self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Post-hook that always fails.
pub struct FailingPostHook;

#[async_trait]
impl PostHook for FailingPostHook {
    fn name(&self) -> &str {
        "failing"
    }

    async fn after(&self, _ctx: &PostHookContext) -> Result<(), HookError> {
        Err(HookError::Other("post-hook failure".into()))
    }
}
