use async_trait::async_trait;
use std::sync::Arc;

use crate::approval::ApprovalPort;
use crate::context::ToolCallContext;
use crate::engine::{HookError, PreHook, PreHookOutcome};
use crate::policy::{PolicyCode, PolicyViolation};
use crate::session::SessionStore;
use crate::tool::ToolCall;

/// Shown in prompts and details when the session has no bound intent.
pub const UNKNOWN_INTENT: &str = "UNKNOWN";

/// Asks a human before any destructive tool runs.
pub struct DestructiveApprovalGate {
    sessions: Arc<dyn SessionStore>,
    approval: Arc<dyn ApprovalPort>,
    command_summary_limit: usize,
}

impl DestructiveApprovalGate {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        approval: Arc<dyn ApprovalPort>,
        command_summary_limit: usize,
    ) -> Self {
        Self {
            sessions,
            approval,
            command_summary_limit,
        }
    }
}

#[async_trait]
impl PreHook for DestructiveApprovalGate {
    fn name(&self) -> &str {
        "destructive_approval"
    }

    async fn before(&self, ctx: &ToolCallContext) -> Result<PreHookOutcome, HookError> {
        if !ctx.call.kind().is_some_and(|k| k.is_destructive()) {
            return Ok(PreHookOutcome::allow());
        }

        let intent = self
            .sessions
            .get_active_intent(ctx.session_id())
            .unwrap_or_else(|| UNKNOWN_INTENT.to_string());
        let prompt = format!(
            "Approve destructive action? intent={} tool={} {}",
            intent,
            ctx.tool_name,
            summarize_action(&ctx.call, self.command_summary_limit)
        );

        tracing::debug!(tool = %ctx.tool_name, intent = %intent, "awaiting approval");
        if self.approval.request_approval(&prompt).await {
            return Ok(PreHookOutcome::allow());
        }

        tracing::info!(tool = %ctx.tool_name, intent = %intent, "destructive action rejected");
        Ok(PreHookOutcome::block(
            PolicyViolation::new(
                PolicyCode::UserRejected,
                "User rejected destructive tool execution.",
            )
            .with_detail("intent_id", intent)
            .with_detail("tool", ctx.tool_name.clone()),
        ))
    }
}

/// One-line description of what a call will do.
///
/// Commands are cut to `command_limit` characters.
pub fn summarize_action(call: &ToolCall, command_limit: usize) -> String {
    match call {
        ToolCall::WriteToFile(_) | ToolCall::ApplyDiff(_) | ToolCall::FileEdit(..) => {
            format!("file={}", call.direct_path().unwrap_or_default())
        }
        ToolCall::ExecuteCommand(p) => {
            let command: String = p
                .command
                .as_deref()
                .unwrap_or_default()
                .chars()
                .take(command_limit)
                .collect();
            format!("command={}", command)
        }
        _ => "mutating action".to_string(),
    }
}
