use async_trait::async_trait;
use serde_json::Map;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::GateConfig;
use crate::context::ToolCallContext;
use crate::engine::{HookError, PreHook, PreHookOutcome};
use crate::manifest::{find_intent, load_manifest, IdlessEntries, IntentRecord};
use crate::policy::{PolicyCode, PolicyViolation};
use crate::tool::ToolCall;
use crate::workspace::WorkspaceResolver;

/// Validates `select_active_intent` against the manifest and renders the
/// chosen intent's context.
///
/// On success the rendered `<intent_context>` document is written to
/// `<context_dir>/<id>.xml` and returned in the `intent_context_xml` payload
/// so the host can surface it as the tool result.
pub struct IntentSelectionValidator {
    workspace: Arc<dyn WorkspaceResolver>,
    config: Arc<GateConfig>,
}

impl IntentSelectionValidator {
    pub fn new(workspace: Arc<dyn WorkspaceResolver>, config: Arc<GateConfig>) -> Self {
        Self { workspace, config }
    }

    async fn load_and_render(
        &self,
        root: &Path,
        intent_id: &str,
    ) -> std::io::Result<Option<(String, PathBuf)>> {
        let records = load_manifest(root.join(&self.config.manifest), IdlessEntries::Drop).await?;
        let Some(record) = find_intent(&records, intent_id) else {
            return Ok(None);
        };

        let xml = render_intent_context(intent_id, record);
        let out_dir = root.join(&self.config.context_dir);
        tokio::fs::create_dir_all(&out_dir).await?;
        let out_path = out_dir.join(format!("{}.xml", context_file_stem(intent_id)));
        tokio::fs::write(&out_path, &xml).await?;
        Ok(Some((xml, out_path)))
    }
}

#[async_trait]
impl PreHook for IntentSelectionValidator {
    fn name(&self) -> &str {
        "select_intent"
    }

    async fn before(&self, ctx: &ToolCallContext) -> Result<PreHookOutcome, HookError> {
        let ToolCall::SelectActiveIntent(params) = &ctx.call else {
            return Ok(PreHookOutcome::allow());
        };

        let Some(root) = self.workspace.workspace_root() else {
            return Ok(PreHookOutcome::block(PolicyViolation::new(
                PolicyCode::NoWorkspace,
                format!(
                    "No workspace folder available to read {}",
                    self.config.manifest.display()
                ),
            )));
        };

        let Some(intent_id) = params.selected() else {
            return Ok(PreHookOutcome::block(PolicyViolation::new(
                PolicyCode::MissingIntentId,
                "You must supply an intent_id.",
            )));
        };

        match self.load_and_render(&root, intent_id).await {
            Ok(Some((xml, path))) => {
                tracing::debug!(intent = intent_id, path = %path.display(), "wrote intent context");
                let mut payload = Map::new();
                payload.insert("intent_context_xml".into(), xml.into());
                Ok(PreHookOutcome::allow_with(payload))
            }
            Ok(None) => Ok(PreHookOutcome::block(
                PolicyViolation::new(
                    PolicyCode::InvalidIntent,
                    "You must cite a valid active Intent ID.",
                )
                .with_detail("intent_id", intent_id),
            )),
            Err(e) => {
                tracing::warn!(intent = intent_id, error = %e, "intent selection I/O failed");
                Ok(PreHookOutcome::block(PolicyViolation::new(
                    PolicyCode::HookIoError,
                    e.to_string(),
                )))
            }
        }
    }
}

/// Render the `<intent_context>` document for `record`.
///
/// Sections with no content are omitted.
pub fn render_intent_context(intent_id: &str, record: &IntentRecord) -> String {
    let mut lines = vec![format!(
        "<intent_context id=\"{}\">",
        escape_markup(intent_id)
    )];
    if let Some(name) = record.name.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("  <name>{}</name>", escape_markup(name)));
    }
    if let Some(status) = record.status.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("  <status>{}</status>", escape_markup(status)));
    }
    push_section(&mut lines, "owned_scope", "scope", &record.owned_scope);
    push_section(&mut lines, "constraints", "constraint", &record.constraints);
    push_section(
        &mut lines,
        "acceptance_criteria",
        "criterion",
        &record.acceptance_criteria,
    );
    lines.push("</intent_context>".to_string());
    lines.join("\n")
}

fn push_section(lines: &mut Vec<String>, section: &str, item: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    lines.push(format!("  <{}>", section));
    for value in values {
        lines.push(format!("    <{item}>{}</{item}>", escape_markup(value)));
    }
    lines.push(format!("  </{}>", section));
}

/// Escape `&`, `<`, `>` and `"` for embedding in markup.
pub fn escape_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape_markup`].
pub fn unescape_markup(s: &str) -> String {
    // `&amp;` last, so `&amp;lt;` becomes `&lt;` and not `<`.
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// File stem for an intent's context document.
///
/// Characters that could escape the context directory are replaced with `_`.
fn context_file_stem(intent_id: &str) -> String {
    let stem: String = intent_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.chars().all(|c| c == '.') {
        stem.replace('.', "_")
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::FixedWorkspace;
    use serde_json::json;

    const MANIFEST: &str = r#"active_intents:
  - id: INT-001
    name: "Widgets & <Gadgets>"
    status: IN_PROGRESS
    owned_scope:
      - src/widget/**
    constraints:
      - Keep "public" API stable
    acceptance_criteria:
      - Tests pass
  - name: nameless
"#;

    fn workspace_with_manifest(text: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let orchestration = dir.path().join(".orchestration");
        std::fs::create_dir_all(&orchestration).unwrap();
        std::fs::write(orchestration.join("active_intents.yaml"), text).unwrap();
        dir
    }

    fn validator(root: Option<&Path>) -> IntentSelectionValidator {
        let workspace = match root {
            Some(root) => FixedWorkspace::new(root),
            None => FixedWorkspace::none(),
        };
        IntentSelectionValidator::new(Arc::new(workspace), Arc::new(GateConfig::default()))
    }

    fn select(params: serde_json::Value) -> ToolCallContext {
        ToolCallContext::new("select_active_intent", params).unwrap()
    }

    #[tokio::test]
    async fn test_valid_selection_renders_and_writes() {
        let dir = workspace_with_manifest(MANIFEST);
        let outcome = validator(Some(dir.path()))
            .before(&select(json!({"intent_id": "INT-001"})))
            .await
            .unwrap();

        let xml = outcome.payload().unwrap()["intent_context_xml"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(xml.starts_with("<intent_context id=\"INT-001\">"));
        assert!(xml.contains("<name>Widgets &amp; &lt;Gadgets&gt;</name>"));
        assert!(xml.contains("<scope>src/widget/**</scope>"));
        assert!(xml.contains("<constraint>Keep &quot;public&quot; API stable</constraint>"));
        assert!(xml.contains("<criterion>Tests pass</criterion>"));

        let written = std::fs::read_to_string(
            dir.path().join(".orchestration/intent_contexts/INT-001.xml"),
        )
        .unwrap();
        assert_eq!(written, xml);
    }

    #[tokio::test]
    async fn test_unknown_intent_blocks() {
        let dir = workspace_with_manifest(MANIFEST);
        let outcome = validator(Some(dir.path()))
            .before(&select(json!({"intent_id": "INT-404"})))
            .await
            .unwrap();
        assert_eq!(outcome.block_code(), Some(PolicyCode::InvalidIntent));
    }

    #[tokio::test]
    async fn test_missing_id_blocks_before_reading() {
        // No manifest exists; the missing id is reported first.
        let dir = tempfile::tempdir().unwrap();
        let outcome = validator(Some(dir.path()))
            .before(&select(json!({})))
            .await
            .unwrap();
        assert_eq!(outcome.block_code(), Some(PolicyCode::MissingIntentId));
    }

    #[tokio::test]
    async fn test_no_workspace_blocks() {
        let outcome = validator(None)
            .before(&select(json!({"intent_id": "INT-001"})))
            .await
            .unwrap();
        assert_eq!(outcome.block_code(), Some(PolicyCode::NoWorkspace));
    }

    #[tokio::test]
    async fn test_missing_manifest_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = validator(Some(dir.path()))
            .before(&select(json!({"intent_id": "INT-001"})))
            .await
            .unwrap();
        assert_eq!(outcome.block_code(), Some(PolicyCode::HookIoError));
    }

    #[tokio::test]
    async fn test_other_tools_pass_through() {
        let outcome = validator(None)
            .before(&ToolCallContext::new("write_to_file", json!({})).unwrap())
            .await
            .unwrap();
        assert_eq!(outcome, PreHookOutcome::allow());
    }

    #[test]
    fn test_render_omits_empty_sections() {
        let record = IntentRecord {
            id: Some("I-1".into()),
            ..Default::default()
        };
        assert_eq!(
            render_intent_context("I-1", &record),
            "<intent_context id=\"I-1\">\n</intent_context>"
        );
    }

    #[test]
    fn test_escape_round_trip() {
        for original in ["a & b", "<tag attr=\"v\">", "&amp; literal", "plain", "&lt;&gt;"] {
            assert_eq!(unescape_markup(&escape_markup(original)), original);
        }
        assert_eq!(escape_markup("<&>\""), "&lt;&amp;&gt;&quot;");
    }

    #[test]
    fn test_context_file_stem_stays_in_directory() {
        assert_eq!(context_file_stem("INT-001"), "INT-001");
        assert_eq!(context_file_stem("../etc/passwd"), ".._etc_passwd");
        assert_eq!(context_file_stem(".."), "__");
        assert_eq!(context_file_stem("a b/c"), "a_b_c");
    }
}
