//! Human approval port.
//!
//! The destructive-action gate asks an [`ApprovalPort`] whether a call may
//! proceed. Implementations may wait as long as a human takes to answer.
//!
//! - [`ChannelApprover`]: announces each prompt on a channel and waits for the
//!   host to call [`ChannelApprover::respond`]. Use this when a UI lives
//!   elsewhere (editor extension, web client, stdio protocol).
//! - [`StaticApprover`]: always approves or always rejects.
//!
//! The CLI crate adds a terminal prompter.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Errors that can occur when answering an approval request.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// No pending request has this id (already answered, timed out, or unknown).
    #[error("approval request not found: {0}")]
    RequestNotFound(String),

    /// The waiting side went away before the answer arrived.
    #[error("approval request {0} is no longer waiting")]
    ChannelClosed(String),
}

/// Asks a human whether a destructive tool call may run.
#[async_trait]
pub trait ApprovalPort: Send + Sync {
    /// Returns `true` if approved. May suspend indefinitely.
    async fn request_approval(&self, prompt: &str) -> bool;
}

/// Approver with a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticApprover {
    approve: bool,
}

impl StaticApprover {
    pub fn approve_all() -> Self {
        Self { approve: true }
    }

    pub fn deny_all() -> Self {
        Self { approve: false }
    }
}

#[async_trait]
impl ApprovalPort for StaticApprover {
    async fn request_approval(&self, prompt: &str) -> bool {
        tracing::debug!(prompt, approved = self.approve, "static approval");
        self.approve
    }
}

/// A prompt waiting for a human decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub approval_id: String,
    pub prompt: String,
}

/// Approval port backed by channels.
///
/// Each call to [`ApprovalPort::request_approval`] registers a pending request
/// under a fresh id and sends an [`ApprovalRequest`] to the receiver returned
/// by [`ChannelApprover::new`]. The call resolves when the host answers via
/// [`respond`](Self::respond). Without a timeout it waits forever; with one,
/// expiry counts as rejection. If the receiver has been dropped nobody can
/// answer, so the request is rejected immediately.
pub struct ChannelApprover {
    requests: mpsc::UnboundedSender<ApprovalRequest>,
    pending: Mutex<HashMap<String, oneshot::Sender<bool>>>,
    timeout: Option<Duration>,
}

impl ChannelApprover {
    /// Create an approver and the stream of requests the host must answer.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ApprovalRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                requests: tx,
                pending: Mutex::new(HashMap::new()),
                timeout: None,
            },
            rx,
        )
    }

    /// Reject requests not answered within `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Answer a pending request.
    pub fn respond(&self, approval_id: &str, approved: bool) -> Result<(), ApprovalError> {
        let tx = self
            .pending
            .lock()
            .remove(approval_id)
            .ok_or_else(|| ApprovalError::RequestNotFound(approval_id.to_string()))?;
        tx.send(approved)
            .map_err(|_| ApprovalError::ChannelClosed(approval_id.to_string()))
    }

    /// Ids of requests still awaiting an answer.
    pub fn pending_ids(&self) -> Vec<String> {
        self.pending.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl ApprovalPort for ChannelApprover {
    async fn request_approval(&self, prompt: &str) -> bool {
        let approval_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(approval_id.clone(), tx);

        let request = ApprovalRequest {
            approval_id: approval_id.clone(),
            prompt: prompt.to_string(),
        };
        if self.requests.send(request).is_err() {
            tracing::warn!(approval_id, "approval receiver dropped; rejecting");
            self.pending.lock().remove(&approval_id);
            return false;
        }

        let answer = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(answer) => answer.ok(),
                Err(_) => {
                    tracing::warn!(approval_id, "approval request timed out");
                    None
                }
            },
            None => rx.await.ok(),
        };

        self.pending.lock().remove(&approval_id);
        answer.unwrap_or(false)
    }
}
