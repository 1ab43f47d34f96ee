//! The standard policy hooks.
//!
//! | Hook | Kind | Acts on |
//! |------|------|---------|
//! | [`IntentSelectionValidator`] | pre | `select_active_intent` |
//! | [`HandshakeGate`] | pre | `select_active_intent` and destructive tools |
//! | [`WriteScopeEnforcer`] | pre | scoped tools |
//! | [`DestructiveApprovalGate`] | pre | destructive tools |
//! | [`TracePostHook`](crate::trace::TracePostHook) | post | `write_to_file` |
//!
//! Each hook receives its collaborators explicitly; none of them reach for
//! process-wide state.

mod approval;
mod handshake;
mod select_intent;
mod write_scope;

pub use approval::{summarize_action, DestructiveApprovalGate, UNKNOWN_INTENT};
pub use handshake::{HandshakeGate, HANDSHAKE_MESSAGE};
pub use select_intent::{escape_markup, render_intent_context, unescape_markup, IntentSelectionValidator};
pub use write_scope::{extract_target_paths, load_ignore_patterns, normalize_target, WriteScopeEnforcer};
