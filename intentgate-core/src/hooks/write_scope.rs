use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;

use crate::config::GateConfig;
use crate::context::ToolCallContext;
use crate::engine::{HookError, PreHook, PreHookOutcome};
use crate::manifest::{find_intent, load_manifest, IdlessEntries};
use crate::policy::{PolicyCode, PolicyViolation};
use crate::scope::{normalize_path, ScopeSet};
use crate::session::SessionStore;
use crate::tool::ToolCall;
use crate::workspace::WorkspaceResolver;

lazy_static::lazy_static! {
    static ref PATCH_FILE_MARKER: Regex =
        Regex::new(r"(?m)\*\*\* (?:Update|Add|Delete) File:[ \t]+(.+?)\r?$").expect("valid regex");
    static ref DIFF_TARGET_MARKER: Regex =
        Regex::new(r"\+\+\+[ \t]+b/([^\r\n]+)").expect("valid regex");
}

/// Restricts scoped tools to paths the active intent owns.
///
/// Paths listed in the ignore file are exempt. An intent with an empty
/// `owned_scope` owns nothing.
pub struct WriteScopeEnforcer {
    workspace: Arc<dyn WorkspaceResolver>,
    sessions: Arc<dyn SessionStore>,
    config: Arc<GateConfig>,
}

impl WriteScopeEnforcer {
    pub fn new(
        workspace: Arc<dyn WorkspaceResolver>,
        sessions: Arc<dyn SessionStore>,
        config: Arc<GateConfig>,
    ) -> Self {
        Self {
            workspace,
            sessions,
            config,
        }
    }
}

#[async_trait]
impl PreHook for WriteScopeEnforcer {
    fn name(&self) -> &str {
        "write_scope"
    }

    async fn before(&self, ctx: &ToolCallContext) -> Result<PreHookOutcome, HookError> {
        if !ctx.call.kind().is_some_and(|k| k.is_scoped()) {
            return Ok(PreHookOutcome::allow());
        }

        let Some(root) = self.workspace.workspace_root() else {
            return Ok(PreHookOutcome::block(PolicyViolation::new(
                PolicyCode::NoWorkspace,
                "No workspace folder available for scope enforcement.",
            )));
        };

        let Some(intent_id) = self.sessions.get_active_intent(ctx.session_id()) else {
            return Ok(PreHookOutcome::block(
                PolicyViolation::new(
                    PolicyCode::IntentRequired,
                    "You must cite a valid active Intent ID.",
                )
                .with_detail("tool", ctx.tool_name.clone()),
            ));
        };

        let targets = extract_target_paths(&ctx.call);
        if targets.is_empty() {
            return Ok(PreHookOutcome::allow());
        }

        // An unreadable manifest is an internal failure; the engine blocks it.
        let records = load_manifest(root.join(&self.config.manifest), IdlessEntries::Keep).await?;
        let Some(intent) = find_intent(&records, &intent_id) else {
            return Ok(PreHookOutcome::block(
                PolicyViolation::new(
                    PolicyCode::InvalidIntent,
                    "Active intent not found in active_intents.yaml.",
                )
                .with_detail("intent_id", intent_id),
            ));
        };

        if intent.owned_scope.is_empty() {
            return Ok(PreHookOutcome::block(
                PolicyViolation::new(PolicyCode::EmptyScope, "Active intent has no owned_scope.")
                    .with_detail("intent_id", intent_id),
            ));
        }

        let owned = ScopeSet::new(&intent.owned_scope);
        let ignored = ScopeSet::new(load_ignore_patterns(&root.join(&self.config.ignore_file)).await);

        for raw in &targets {
            let path = normalize_target(raw);
            if ignored.matches_any(&path) {
                tracing::debug!(path = %path, "target exempt via ignore file");
                continue;
            }
            if !owned.matches_any(&path) {
                tracing::info!(intent = %intent_id, path = %path, "scope violation");
                return Ok(PreHookOutcome::block(
                    PolicyViolation::new(
                        PolicyCode::ScopeViolation,
                        format!(
                            "Scope Violation: {} is not authorized to edit [{}]. Request scope expansion.",
                            intent_id, path
                        ),
                    )
                    .with_detail("intent_id", intent_id.clone())
                    .with_detail("file", path.clone())
                    .with_detail("owned_scope", intent.owned_scope.clone()),
                ));
            }
        }

        Ok(PreHookOutcome::allow())
    }
}

/// Paths a call would mutate.
///
/// Single-target tools contribute their path field. Patches contribute every
/// `*** Update|Add|Delete File:` marker, then every `+++ b/` marker.
pub fn extract_target_paths(call: &ToolCall) -> Vec<String> {
    if let ToolCall::ApplyPatch(params) = call {
        let patch = params.patch.as_deref().unwrap_or_default();
        return PATCH_FILE_MARKER
            .captures_iter(patch)
            .chain(DIFF_TARGET_MARKER.captures_iter(patch))
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
    }

    call.direct_path()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| vec![p.to_string()])
        .unwrap_or_default()
}

/// Strip a leading `a/` then `b/` diff prefix and use forward slashes.
pub fn normalize_target(raw: &str) -> String {
    let stripped = raw.strip_prefix("a/").unwrap_or(raw);
    let stripped = stripped.strip_prefix("b/").unwrap_or(stripped);
    normalize_path(stripped)
}

/// Read the ignore file: one pattern per line, `#` comments and blanks skipped.
///
/// A missing or unreadable file means no exemptions.
pub async fn load_ignore_patterns(path: &Path) -> Vec<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(String::from)
            .collect(),
        Err(_) => Vec::new(),
    }
}
