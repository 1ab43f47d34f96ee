//! JSON-lines protocol for `intentgate serve`
//!
//! The host (an editor extension or agent runner) writes one request per line
//! to stdin and reads one response per line from stdout.
//!
//! ```text
//! → {"type":"pre_tool","id":"1","tool":"write_to_file","params":{"path":"a.txt"},"session_id":"s1"}
//! ← {"type":"approval_required","approval_id":"…","prompt":"Approve destructive action? …"}
//! → {"type":"approval","approval_id":"…","approved":true}
//! ← {"type":"pre_tool_result","id":"1","outcome":{"action":"allow","payload":{…}}}
//! → {"type":"post_tool","id":"2","tool":"write_to_file","params":{…},"result":{…},"session_id":"s1"}
//! ← {"type":"post_tool_done","id":"2"}
//! ```
//!
//! Requests run concurrently, so a call waiting on approval does not hold up
//! others. Responses are written by a single task and never interleave.

use intentgate_core::{
    ApprovalRequest, ChannelApprover, Error, Gate, PolicyCode, PolicyViolation, PreHookOutcome,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::error::CliError;

/// A line from the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Evaluate the pre-hook chain for a tool call.
    PreTool {
        id: String,
        tool: String,
        #[serde(default)]
        params: Value,
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        intent_id: Option<String>,
    },
    /// Run the post-hook chain for a tool call that has executed.
    PostTool {
        id: String,
        tool: String,
        #[serde(default)]
        params: Value,
        #[serde(default)]
        result: Value,
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        intent_id: Option<String>,
    },
    /// Answer an outstanding `approval_required`.
    Approval { approval_id: String, approved: bool },
}

/// A line to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    PreToolResult { id: String, outcome: PreHookOutcome },
    PostToolDone { id: String },
    ApprovalRequired { approval_id: String, prompt: String },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        message: String,
    },
}

/// Evaluate a pre-tool request.
///
/// Parameters that fail boundary validation are blocked with `INVALID_PARAMS`.
pub async fn handle_pre_tool(
    gate: &Gate,
    tool: String,
    params: Value,
    session_id: Option<String>,
    intent_id: Option<String>,
) -> PreHookOutcome {
    let result = gate
        .pre_tool(tool, params, session_id.as_deref(), intent_id.as_deref())
        .await;
    match result {
        Ok(outcome) => outcome,
        Err(Error::InvalidRequest(message)) => {
            tracing::warn!(error = %message, "rejecting malformed tool call");
            PreHookOutcome::block(PolicyViolation::new(PolicyCode::InvalidParams, message))
        }
        Err(e) => {
            tracing::error!(error = %e, "pre-tool evaluation failed");
            PreHookOutcome::block(PolicyViolation::new(PolicyCode::HookError, e.to_string()))
        }
    }
}

async fn handle(gate: &Gate, request: Request) -> Option<Response> {
    match request {
        Request::PreTool {
            id,
            tool,
            params,
            session_id,
            intent_id,
        } => {
            let outcome = handle_pre_tool(gate, tool, params, session_id, intent_id).await;
            Some(Response::PreToolResult { id, outcome })
        }
        Request::PostTool {
            id,
            tool,
            params,
            result,
            session_id,
            intent_id,
        } => {
            let done = gate
                .post_tool(
                    tool,
                    params,
                    result,
                    session_id.as_deref(),
                    intent_id.as_deref(),
                )
                .await;
            match done {
                Ok(()) => Some(Response::PostToolDone { id }),
                Err(e) => Some(Response::Error {
                    id: Some(id),
                    message: CliError::from(e).to_string(),
                }),
            }
        }
        // Answered inline by the read loop.
        Request::Approval { .. } => None,
    }
}

/// Serve requests from `input` until it closes.
///
/// `gate` must have been built with `approver` as its approval port, and
/// `approvals` must be the receiver `approver` was created with.
pub async fn serve<R, W>(
    gate: Arc<Gate>,
    approver: Arc<ChannelApprover>,
    mut approvals: mpsc::UnboundedReceiver<ApprovalRequest>,
    input: R,
    mut output: W,
) -> Result<(), CliError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Response>();

    let writer = tokio::spawn(async move {
        while let Some(response) = out_rx.recv().await {
            let mut line = serde_json::to_string(&response)?;
            line.push('\n');
            output.write_all(line.as_bytes()).await?;
            output.flush().await?;
        }
        Ok::<(), CliError>(())
    });

    let forwarder = {
        let out_tx = out_tx.clone();
        tokio::spawn(async move {
            while let Some(request) = approvals.recv().await {
                let response = Response::ApprovalRequired {
                    approval_id: request.approval_id,
                    prompt: request.prompt,
                };
                if out_tx.send(response).is_err() {
                    break;
                }
            }
        })
    };

    let mut in_flight = JoinSet::new();
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request: Request = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                let _ = out_tx.send(Response::Error {
                    id: None,
                    message: format!("invalid request: {}", e),
                });
                continue;
            }
        };

        if let Request::Approval {
            approval_id,
            approved,
        } = &request
        {
            if let Err(e) = approver.respond(approval_id, *approved) {
                let _ = out_tx.send(Response::Error {
                    id: None,
                    message: e.to_string(),
                });
            }
            continue;
        }

        while in_flight.try_join_next().is_some() {}

        let gate = Arc::clone(&gate);
        let out_tx = out_tx.clone();
        in_flight.spawn(async move {
            if let Some(response) = handle(&gate, request).await {
                let _ = out_tx.send(response);
            }
        });
    }

    // Nobody is left to answer; reject whatever is still waiting.
    while !in_flight.is_empty() {
        for approval_id in approver.pending_ids() {
            let _ = approver.respond(&approval_id, false);
        }
        tokio::select! {
            _ = in_flight.join_next() => {}
            _ = tokio::time::sleep(Duration::from_millis(20)) => {}
        }
    }

    forwarder.abort();
    drop(out_tx);
    match writer.await {
        Ok(result) => result,
        Err(e) => Err(CliError::Io(std::io::Error::other(e.to_string()))),
    }
}
