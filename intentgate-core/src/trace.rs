//! Provenance trace for accepted file writes.
//!
//! Every completed `write_to_file` with a path, content, and mutation class
//! appends one JSON line to the trace log:
//!
//! ```json
//! {"id":"…","timestamp":"2026-01-01T00:00:00.000Z","vcs":{"revision_id":"abc123"},
//!  "mutation_class":"refactor","files":[{"relative_path":"a.txt","conversations":[{
//!  "url":"session-1","contributor":{"entity_type":"AI","model_identifier":"unknown-model"},
//!  "ranges":[{"start_line":1,"end_line":2,"content_hash":"sha256:…"}],
//!  "related":[{"type":"specification","value":"INT-001"}]}]}]}
//! ```
//!
//! Records are never rewritten. Appends are serialized so concurrent writers
//! cannot interleave partial lines.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::config::GateConfig;
use crate::context::PostHookContext;
use crate::engine::{HookError, PostHook};
use crate::hooks::UNKNOWN_INTENT;
use crate::scope::normalize_path;
use crate::session::SessionStore;
use crate::tool::ToolCall;
use crate::workspace::{RevisionResolver, WorkspaceResolver};

/// Conversation url recorded when the call had no session id.
pub const DEFAULT_CONVERSATION_URL: &str = "session";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditRecord {
    pub id: String,
    pub timestamp: String,
    pub vcs: VcsInfo,
    pub mutation_class: String,
    pub files: Vec<FileTrace>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VcsInfo {
    pub revision_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileTrace {
    pub relative_path: String,
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub url: String,
    pub contributor: Contributor,
    pub ranges: Vec<LineRange>,
    pub related: Vec<Related>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contributor {
    pub entity_type: String,
    pub model_identifier: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineRange {
    pub start_line: usize,
    pub end_line: usize,
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Related {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

/// Inputs for one audit record.
#[derive(Debug, Clone)]
pub struct WriteEvent<'a> {
    pub path: &'a str,
    pub content: &'a str,
    pub mutation_class: &'a str,
    pub intent_id: &'a str,
    pub conversation_url: &'a str,
    pub model_identifier: &'a str,
    pub revision: String,
}

impl AuditRecord {
    /// Build a record with a fresh id and the current time.
    pub fn for_write(event: WriteEvent<'_>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            vcs: VcsInfo {
                revision_id: event.revision,
            },
            mutation_class: event.mutation_class.to_string(),
            files: vec![FileTrace {
                relative_path: normalize_path(event.path),
                conversations: vec![Conversation {
                    url: event.conversation_url.to_string(),
                    contributor: Contributor {
                        entity_type: "AI".to_string(),
                        model_identifier: event.model_identifier.to_string(),
                    },
                    ranges: vec![LineRange {
                        start_line: 1,
                        end_line: line_count(event.content),
                        content_hash: content_hash(event.content),
                    }],
                    related: vec![Related {
                        kind: "specification".to_string(),
                        value: event.intent_id.to_string(),
                    }],
                }],
            }],
        }
    }
}

/// `sha256:` followed by the lowercase hex digest of `content`.
pub fn content_hash(content: &str) -> String {
    format!("sha256:{:x}", Sha256::digest(content.as_bytes()))
}

/// Number of lines in `content`; empty content is one line.
pub fn line_count(content: &str) -> usize {
    // `\r\n` ends with `\n`, so counting `\n` covers both.
    content.matches('\n').count() + 1
}

/// Appends records to a JSONL file.
pub struct TraceWriter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TraceWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record` as a single line, creating parent directories.
    pub async fn append(&self, record: &AuditRecord) -> Result<(), HookError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Post-hook that records `write_to_file` calls.
///
/// Calls missing a path, content, or mutation class are not recorded, and
/// neither are calls made without a workspace.
pub struct TracePostHook {
    workspace: Arc<dyn WorkspaceResolver>,
    sessions: Arc<dyn SessionStore>,
    revision: Arc<dyn RevisionResolver>,
    config: Arc<GateConfig>,
    writers: parking_lot::Mutex<Vec<Arc<TraceWriter>>>,
}

impl TracePostHook {
    pub fn new(
        workspace: Arc<dyn WorkspaceResolver>,
        sessions: Arc<dyn SessionStore>,
        revision: Arc<dyn RevisionResolver>,
        config: Arc<GateConfig>,
    ) -> Self {
        Self {
            workspace,
            sessions,
            revision,
            config,
            writers: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// One writer per log path, so every append to a file shares a lock.
    fn writer_for(&self, path: PathBuf) -> Arc<TraceWriter> {
        let mut writers = self.writers.lock();
        if let Some(existing) = writers.iter().find(|w| w.path() == path.as_path()) {
            return Arc::clone(existing);
        }
        let writer = Arc::new(TraceWriter::new(path));
        writers.push(Arc::clone(&writer));
        writer
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[async_trait]
impl PostHook for TracePostHook {
    fn name(&self) -> &str {
        "trace"
    }

    async fn after(&self, ctx: &PostHookContext) -> Result<(), HookError> {
        let ToolCall::WriteToFile(params) = &ctx.call.call else {
            return Ok(());
        };
        let (Some(path), Some(content), Some(mutation_class)) = (
            non_empty(params.path.as_deref()),
            params.content.as_deref().filter(|c| !c.is_empty()),
            non_empty(params.mutation_class.as_deref()),
        ) else {
            return Ok(());
        };
        let Some(root) = self.workspace.workspace_root() else {
            tracing::debug!("no workspace; skipping trace");
            return Ok(());
        };

        let intent_id = non_empty(params.intent_id.as_deref())
            .map(String::from)
            .or_else(|| self.sessions.get_active_intent(ctx.session_id()))
            .unwrap_or_else(|| UNKNOWN_INTENT.to_string());
        let revision = self.revision.revision(&root).await;

        let record = AuditRecord::for_write(WriteEvent {
            path,
            content,
            mutation_class,
            intent_id: &intent_id,
            conversation_url: ctx.session_id().unwrap_or(DEFAULT_CONVERSATION_URL),
            model_identifier: &self.config.model_identifier,
            revision,
        });

        let writer = self.writer_for(root.join(&self.config.trace_log));
        writer.append(&record).await?;
        tracing::debug!(path, intent = %intent_id, record = %record.id, "appended trace record");
        Ok(())
    }
}
