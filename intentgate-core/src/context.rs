//! Per-request hook contexts.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::tool::ToolCall;

/// Errors raised while validating a request at the pipeline boundary.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Parameters were not a JSON object.
    #[error("parameters for '{tool}' must be an object, found {found}")]
    NotAnObject { tool: String, found: String },

    /// A known tool's parameters had the wrong shape.
    #[error("invalid parameters for '{tool}': {source}")]
    InvalidParams {
        tool: String,
        #[source]
        source: serde_json::Error,
    },
}

/// An incoming tool call as seen by the pre-hooks.
///
/// Immutable once constructed. `params` keeps the raw object; `call` is the
/// same data shaped for the tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallContext {
    pub tool_name: String,
    pub params: Map<String, Value>,
    pub call: ToolCall,
    pub intent_id: Option<String>,
    pub session_id: Option<String>,
}

impl ToolCallContext {
    /// Validate `params` for `tool_name`.
    ///
    /// `null` parameters are treated as an empty object.
    pub fn new(tool_name: impl Into<String>, params: Value) -> Result<Self, ContextError> {
        let tool_name = tool_name.into();
        let params = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ContextError::NotAnObject {
                    tool: tool_name,
                    found: other.to_string(),
                })
            }
        };
        let call = ToolCall::parse(&tool_name, &params).map_err(|source| {
            ContextError::InvalidParams {
                tool: tool_name.clone(),
                source,
            }
        })?;
        Ok(Self {
            tool_name,
            params,
            call,
            intent_id: None,
            session_id: None,
        })
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_intent(mut self, intent_id: impl Into<String>) -> Self {
        self.intent_id = Some(intent_id.into());
        self
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Attach the tool's result for the post-hook chain.
    pub fn into_post(self, result: Value) -> PostHookContext {
        PostHookContext {
            call: self,
            result,
        }
    }
}

/// A completed tool call as seen by the post-hooks.
#[derive(Debug, Clone, PartialEq)]
pub struct PostHookContext {
    pub call: ToolCallContext,
    pub result: Value,
}

impl std::ops::Deref for PostHookContext {
    type Target = ToolCallContext;

    fn deref(&self) -> &Self::Target {
        &self.call
    }
}
