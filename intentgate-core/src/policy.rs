//! Policy violation codes and the structured blocking payload.
//!
//! Every blocked tool call is answered with a JSON document the calling agent
//! can read directly:
//!
//! ```json
//! {
//!   "status": "error",
//!   "type": "policy_violation",
//!   "code": "SCOPE_VIOLATION",
//!   "message": "...",
//!   "details": { "intent_id": "INT-001" },
//!   "suggestion": "Adjust the tool call and retry."
//! }
//! ```

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Default remediation hint attached to every violation.
pub const DEFAULT_SUGGESTION: &str = "Adjust the tool call and retry.";

/// Machine-readable reason a tool call was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyCode {
    // Environment
    NoWorkspace,
    // Handshake
    HandshakeRequired,
    // Intent validation
    MissingIntentId,
    InvalidIntent,
    EmptyScope,
    // Authorization
    ScopeViolation,
    UserRejected,
    IntentRequired,
    // I/O
    HookIoError,
    // Internal
    HookError,
    // Boundary
    InvalidParams,
}

impl PolicyCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyCode::NoWorkspace => "NO_WORKSPACE",
            PolicyCode::HandshakeRequired => "HANDSHAKE_REQUIRED",
            PolicyCode::MissingIntentId => "MISSING_INTENT_ID",
            PolicyCode::InvalidIntent => "INVALID_INTENT",
            PolicyCode::EmptyScope => "EMPTY_SCOPE",
            PolicyCode::ScopeViolation => "SCOPE_VIOLATION",
            PolicyCode::UserRejected => "USER_REJECTED",
            PolicyCode::IntentRequired => "INTENT_REQUIRED",
            PolicyCode::HookIoError => "HOOK_IO_ERROR",
            PolicyCode::HookError => "HOOK_ERROR",
            PolicyCode::InvalidParams => "INVALID_PARAMS",
        }
    }
}

impl std::fmt::Display for PolicyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A blocked tool call.
///
/// Serializes as `{"code": ..., "message": <document>}` where the message is
/// the full `policy_violation` JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyViolation {
    pub code: PolicyCode,
    pub message: String,
    pub details: Map<String, Value>,
    pub suggestion: String,
}

impl PolicyViolation {
    pub fn new(code: PolicyCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Map::new(),
            suggestion: DEFAULT_SUGGESTION.to_string(),
        }
    }

    /// Attach a detail field.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = suggestion.into();
        self
    }

    /// The structured document surfaced to the agent.
    pub fn to_document(&self) -> Value {
        serde_json::json!({
            "status": "error",
            "type": "policy_violation",
            "code": self.code.as_str(),
            "message": self.message,
            "details": self.details,
            "suggestion": self.suggestion,
        })
    }

    /// The document rendered as a compact JSON string.
    pub fn document_string(&self) -> String {
        self.to_document().to_string()
    }
}

impl std::fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl Serialize for PolicyViolation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PolicyViolation", 2)?;
        state.serialize_field("code", self.code.as_str())?;
        state.serialize_field("message", &self.document_string())?;
        state.end()
    }
}
