//! Tool names, capabilities, and typed call parameters.
//!
//! [`ToolKind`] is the single registry of tool names the gate knows about.
//! Two capability flags hang off it:
//!
//! | Tool | destructive | scoped |
//! |------|:-----------:|:------:|
//! | `write_to_file` | x | x |
//! | `apply_diff` | x | x |
//! | `apply_patch` | x | x |
//! | `edit_file` | x | x |
//! | `execute_command` | x | |
//! | `edit` | | x |
//! | `search_and_replace` | | x |
//! | `search_replace` | | x |
//! | `select_active_intent` | | |
//!
//! Destructive tools need a handshake and human approval. Scoped tools have
//! their target paths checked against the active intent's owned scope. The
//! two sets overlap only partially and are kept as independent flags.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Name of the tool that binds an intent to the session.
pub const SELECT_ACTIVE_INTENT: &str = "select_active_intent";

/// Every tool name the gate has policy for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    WriteToFile,
    ApplyDiff,
    ApplyPatch,
    EditFile,
    Edit,
    SearchAndReplace,
    SearchReplace,
    ExecuteCommand,
    SelectActiveIntent,
}

impl ToolKind {
    pub const ALL: [ToolKind; 9] = [
        ToolKind::WriteToFile,
        ToolKind::ApplyDiff,
        ToolKind::ApplyPatch,
        ToolKind::EditFile,
        ToolKind::Edit,
        ToolKind::SearchAndReplace,
        ToolKind::SearchReplace,
        ToolKind::ExecuteCommand,
        ToolKind::SelectActiveIntent,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::WriteToFile => "write_to_file",
            ToolKind::ApplyDiff => "apply_diff",
            ToolKind::ApplyPatch => "apply_patch",
            ToolKind::EditFile => "edit_file",
            ToolKind::Edit => "edit",
            ToolKind::SearchAndReplace => "search_and_replace",
            ToolKind::SearchReplace => "search_replace",
            ToolKind::ExecuteCommand => "execute_command",
            ToolKind::SelectActiveIntent => SELECT_ACTIVE_INTENT,
        }
    }

    /// Requires a handshake and human approval.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            ToolKind::WriteToFile
                | ToolKind::ExecuteCommand
                | ToolKind::ApplyPatch
                | ToolKind::EditFile
                | ToolKind::ApplyDiff
        )
    }

    /// Target paths are checked against the active intent's owned scope.
    pub fn is_scoped(&self) -> bool {
        matches!(
            self,
            ToolKind::WriteToFile
                | ToolKind::ApplyDiff
                | ToolKind::Edit
                | ToolKind::SearchAndReplace
                | ToolKind::SearchReplace
                | ToolKind::EditFile
                | ToolKind::ApplyPatch
        )
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// True if `tool_name` is in the destructive set.
pub fn is_destructive_tool(tool_name: &str) -> bool {
    ToolKind::from_name(tool_name).is_some_and(|k| k.is_destructive())
}

/// Parameters of `write_to_file`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WriteToFileParams {
    #[serde(default, deserialize_with = "lenient_string")]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mutation_class: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub intent_id: Option<String>,
}

/// Parameters of `apply_diff`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApplyDiffParams {
    #[serde(default, deserialize_with = "lenient_string")]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub diff: Option<String>,
}

/// Parameters shared by the edit family (`edit`, `edit_file`, `search_and_replace`, `search_replace`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FileEditParams {
    #[serde(default, deserialize_with = "lenient_string")]
    pub file_path: Option<String>,
}

/// Parameters of `apply_patch`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApplyPatchParams {
    #[serde(default, deserialize_with = "lenient_string")]
    pub patch: Option<String>,
}

/// Parameters of `execute_command`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ExecuteCommandParams {
    #[serde(default, deserialize_with = "lenient_string")]
    pub command: Option<String>,
}

/// Parameters of `select_active_intent`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SelectIntentParams {
    #[serde(default, deserialize_with = "lenient_string")]
    pub intent_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
}

impl SelectIntentParams {
    /// `intent_id`, falling back to `id`, trimmed; `None` when empty.
    pub fn selected(&self) -> Option<&str> {
        self.intent_id
            .as_deref()
            .or(self.id.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A tool call with parameters shaped for its tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    WriteToFile(WriteToFileParams),
    ApplyDiff(ApplyDiffParams),
    ApplyPatch(ApplyPatchParams),
    /// One of the edit family; the kind says which.
    FileEdit(ToolKind, FileEditParams),
    ExecuteCommand(ExecuteCommandParams),
    SelectActiveIntent(SelectIntentParams),
    /// A tool without gate policy; parameters are kept untyped.
    Other(Map<String, Value>),
}

impl ToolCall {
    /// Shape `params` for `tool_name`.
    pub fn parse(tool_name: &str, params: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let value = Value::Object(params.clone());
        let Some(kind) = ToolKind::from_name(tool_name) else {
            return Ok(ToolCall::Other(params.clone()));
        };
        Ok(match kind {
            ToolKind::WriteToFile => ToolCall::WriteToFile(serde_json::from_value(value)?),
            ToolKind::ApplyDiff => ToolCall::ApplyDiff(serde_json::from_value(value)?),
            ToolKind::ApplyPatch => ToolCall::ApplyPatch(serde_json::from_value(value)?),
            ToolKind::EditFile
            | ToolKind::Edit
            | ToolKind::SearchAndReplace
            | ToolKind::SearchReplace => ToolCall::FileEdit(kind, serde_json::from_value(value)?),
            ToolKind::ExecuteCommand => ToolCall::ExecuteCommand(serde_json::from_value(value)?),
            ToolKind::SelectActiveIntent => {
                ToolCall::SelectActiveIntent(serde_json::from_value(value)?)
            }
        })
    }

    pub fn kind(&self) -> Option<ToolKind> {
        match self {
            ToolCall::WriteToFile(_) => Some(ToolKind::WriteToFile),
            ToolCall::ApplyDiff(_) => Some(ToolKind::ApplyDiff),
            ToolCall::ApplyPatch(_) => Some(ToolKind::ApplyPatch),
            ToolCall::FileEdit(kind, _) => Some(*kind),
            ToolCall::ExecuteCommand(_) => Some(ToolKind::ExecuteCommand),
            ToolCall::SelectActiveIntent(_) => Some(ToolKind::SelectActiveIntent),
            ToolCall::Other(_) => None,
        }
    }

    /// The single file a call targets, for tools that name one directly.
    pub fn direct_path(&self) -> Option<&str> {
        match self {
            ToolCall::WriteToFile(p) => p.path.as_deref(),
            ToolCall::ApplyDiff(p) => p.path.as_deref(),
            ToolCall::FileEdit(_, p) => p.file_path.as_deref(),
            _ => None,
        }
    }
}

/// Accept strings, numbers, and booleans as text; `null` as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(D::Error::custom(format!(
            "expected a string, found {}",
            json_type_name(&other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
