use async_trait::async_trait;
use serde_json::Map;
use std::sync::Arc;

use crate::context::ToolCallContext;
use crate::engine::{HookError, PreHook, PreHookOutcome};
use crate::policy::{PolicyCode, PolicyViolation};
use crate::session::SessionStore;
use crate::tool::ToolCall;

/// Instruction returned to an agent that skipped intent selection.
pub const HANDSHAKE_MESSAGE: &str = "You must cite a valid active Intent ID. First read .orchestration/active_intents.yaml, choose intent_id, then call select_active_intent(intent_id) to load intent context.";

/// Requires a session to select an intent before any destructive call.
///
/// A `select_active_intent` call with a non-empty id binds it to the session
/// without consulting the manifest; validation belongs to
/// [`IntentSelectionValidator`](super::IntentSelectionValidator), which runs
/// first in the standard chain.
pub struct HandshakeGate {
    sessions: Arc<dyn SessionStore>,
}

impl HandshakeGate {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl PreHook for HandshakeGate {
    fn name(&self) -> &str {
        "handshake"
    }

    async fn before(&self, ctx: &ToolCallContext) -> Result<PreHookOutcome, HookError> {
        if let ToolCall::SelectActiveIntent(params) = &ctx.call {
            if let Some(selected) = params.selected() {
                self.sessions.set_active_intent(ctx.session_id(), selected);
            }
            return Ok(PreHookOutcome::allow());
        }

        if !ctx.call.kind().is_some_and(|k| k.is_destructive()) {
            return Ok(PreHookOutcome::allow());
        }

        match self.sessions.get_active_intent(ctx.session_id()) {
            Some(active) => {
                let mut payload = Map::new();
                payload.insert("active_intent_id".into(), active.into());
                Ok(PreHookOutcome::allow_with(payload))
            }
            None => {
                tracing::info!(tool = %ctx.tool_name, "destructive call before intent selection");
                Ok(PreHookOutcome::block(
                    PolicyViolation::new(PolicyCode::HandshakeRequired, HANDSHAKE_MESSAGE)
                        .with_detail("tool", ctx.tool_name.clone()),
                ))
            }
        }
    }
}
