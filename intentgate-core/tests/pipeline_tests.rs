mod common;

use common::{call, gate, workspace, write_manifest};
use intentgate_core::test_utils::{RecordingApprover, StubPreHook};
use intentgate_core::{PolicyCode, PreHookOutcome};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn test_destructive_call_requires_handshake() {
    let dir = workspace();
    let approver = Arc::new(RecordingApprover::approving());
    let gate = gate(dir.path(), approver.clone());

    let outcome = gate
        .pre(&call("write_to_file", json!({"path": "src/feature/a.ts"}), "s1"))
        .await;

    assert_eq!(outcome.block_code(), Some(PolicyCode::HandshakeRequired));
    assert!(approver.prompts().is_empty());
}

#[tokio::test]
async fn test_selection_then_destructive_call() {
    let dir = workspace();
    let approver = Arc::new(RecordingApprover::approving());
    let gate = gate(dir.path(), approver.clone());

    let selected = gate
        .pre(&call("select_active_intent", json!({"intent_id": "I-9"}), "s1"))
        .await;
    let xml = selected.payload().unwrap()["intent_context_xml"]
        .as_str()
        .unwrap();
    assert!(xml.contains("<name>Docs</name>"));
    assert!(dir
        .path()
        .join(".orchestration/intent_contexts/I-9.xml")
        .exists());

    let outcome = gate
        .pre(&call("write_to_file", json!({"path": "docs/guide.md"}), "s1"))
        .await;
    assert_eq!(outcome.payload().unwrap()["active_intent_id"], "I-9");
    assert_eq!(
        approver.prompts(),
        vec!["Approve destructive action? intent=I-9 tool=write_to_file file=docs/guide.md"]
    );
}

#[tokio::test]
async fn test_invalid_selection_does_not_bind() {
    let dir = workspace();
    let gate = gate(dir.path(), Arc::new(RecordingApprover::approving()));

    let outcome = gate
        .pre(&call("select_active_intent", json!({"intent_id": "I-404"}), "s1"))
        .await;
    assert_eq!(outcome.block_code(), Some(PolicyCode::InvalidIntent));
    assert_eq!(gate.sessions().get_active_intent(Some("s1")), None);

    let outcome = gate
        .pre(&call("execute_command", json!({"command": "ls"}), "s1"))
        .await;
    assert_eq!(outcome.block_code(), Some(PolicyCode::HandshakeRequired));
}

#[tokio::test]
async fn test_scope_enforced_before_approval() {
    let dir = workspace();
    let approver = Arc::new(RecordingApprover::approving());
    let gate = gate(dir.path(), approver.clone());
    gate.pre(&call("select_active_intent", json!({"intent_id": "I-1"}), "s"))
        .await;

    let outcome = gate
        .pre(&call("write_to_file", json!({"path": "src/other/file.ts"}), "s"))
        .await;
    match outcome {
        PreHookOutcome::Block { error } => {
            assert_eq!(error.code, PolicyCode::ScopeViolation);
            let doc = error.to_document();
            assert_eq!(doc["status"], "error");
            assert_eq!(doc["type"], "policy_violation");
            assert_eq!(doc["details"]["intent_id"], "I-1");
        }
        other => panic!("expected block, got {:?}", other),
    }
    assert!(approver.prompts().is_empty());

    let outcome = gate
        .pre(&call("write_to_file", json!({"path": "src/feature/x.ts"}), "s"))
        .await;
    assert!(outcome.is_allow());
    assert_eq!(approver.prompts().len(), 1);
}

#[tokio::test]
async fn test_rejected_approval_blocks() {
    let dir = workspace();
    let approver = Arc::new(RecordingApprover::rejecting());
    let gate = gate(dir.path(), approver.clone());
    gate.pre(&call("select_active_intent", json!({"intent_id": "I-1"}), "s"))
        .await;

    let outcome = gate
        .pre(&call("execute_command", json!({"command": "cargo publish"}), "s"))
        .await;
    assert_eq!(outcome.block_code(), Some(PolicyCode::UserRejected));
    assert_eq!(
        approver.prompts(),
        vec!["Approve destructive action? intent=I-1 tool=execute_command command=cargo publish"]
    );
}

#[tokio::test]
async fn test_scoped_edit_without_intent() {
    let dir = workspace();
    let gate = gate(dir.path(), Arc::new(RecordingApprover::approving()));

    // `edit` is scoped but not destructive, so the handshake lets it through.
    let outcome = gate
        .pre(&call("edit", json!({"file_path": "src/feature/a.ts"}), "s"))
        .await;
    assert_eq!(outcome.block_code(), Some(PolicyCode::IntentRequired));
}

#[tokio::test]
async fn test_empty_scope_blocks_writes() {
    let dir = workspace();
    let gate = gate(dir.path(), Arc::new(RecordingApprover::approving()));
    gate.pre(&call("select_active_intent", json!({"id": "I-EMPTY"}), "s"))
        .await;

    let outcome = gate
        .pre(&call("apply_diff", json!({"path": "anything.txt"}), "s"))
        .await;
    assert_eq!(outcome.block_code(), Some(PolicyCode::EmptyScope));
}

#[tokio::test]
async fn test_unreadable_manifest_fails_closed() {
    let dir = workspace();
    let approver = Arc::new(RecordingApprover::approving());
    let gate = gate(dir.path(), approver.clone());
    gate.pre(&call("select_active_intent", json!({"intent_id": "I-1"}), "s"))
        .await;
    std::fs::remove_file(dir.path().join(".orchestration/active_intents.yaml")).unwrap();

    let outcome = gate
        .pre(&call("write_to_file", json!({"path": "src/feature/a.ts"}), "s"))
        .await;
    assert_eq!(outcome.block_code(), Some(PolicyCode::HookError));
    assert!(approver.prompts().is_empty());
}

#[tokio::test]
async fn test_manifest_is_reread_on_every_call() {
    let dir = workspace();
    let gate = gate(dir.path(), Arc::new(RecordingApprover::approving()));
    gate.pre(&call("select_active_intent", json!({"intent_id": "I-1"}), "s"))
        .await;

    write_manifest(
        dir.path(),
        "active_intents:\n  - id: I-1\n    owned_scope:\n      - lib/**\n",
    );
    let outcome = gate
        .pre(&call("write_to_file", json!({"path": "src/feature/a.ts"}), "s"))
        .await;
    assert_eq!(outcome.block_code(), Some(PolicyCode::ScopeViolation));
}

#[tokio::test]
async fn test_extra_hooks_run_after_standard_chain() {
    let dir = workspace();
    let gate = gate(dir.path(), Arc::new(RecordingApprover::approving()));
    let extra = StubPreHook::block(PolicyCode::HookError);
    let calls = extra.calls();
    let id = gate.engine().register_pre_hook(extra);

    let outcome = gate.pre(&call("read_file", json!({}), "s")).await;
    assert_eq!(outcome.block_code(), Some(PolicyCode::HookError));
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    assert!(gate.engine().unregister_pre_hook(id));
    assert!(gate.pre(&call("read_file", json!({}), "s")).await.is_allow());
}

#[tokio::test]
async fn test_sessions_are_independent_under_concurrency() {
    let dir = workspace();
    let gate = Arc::new(gate(dir.path(), Arc::new(RecordingApprover::approving())));

    let mut handles = Vec::new();
    for i in 0..16 {
        let gate = Arc::clone(&gate);
        handles.push(tokio::spawn(async move {
            let session = format!("s{}", i);
            let intent = if i % 2 == 0 { "I-1" } else { "I-9" };
            gate.pre(&call("select_active_intent", json!({"intent_id": intent}), &session))
                .await;
            let path = if i % 2 == 0 { "src/feature/a.ts" } else { "docs/a.md" };
            gate.pre(&call("write_to_file", json!({"path": path}), &session))
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_allow());
    }
}
