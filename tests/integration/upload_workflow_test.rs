//! Document upload workflow tests
//!
//! Covers registration, index-build dispatch, completion, failure and retry
//! against the mock RAG service.

mod common;

use std::sync::Arc;

use common::TestWorkspace;
use kanun_documents::{DocumentStatus, UploadFile};
use kanun_rag::mock::MockOutcome;

#[tokio::test]
async fn test_contract_upload_end_to_end() {
    let mut test = TestWorkspace::new();

    let ids = test.workspace.submit(["contract.pdf"]);
    assert_eq!(ids.len(), 1);
    let id = ids[0];

    // Visible before the index build finishes
    let document = test.workspace.document(id).unwrap();
    assert_eq!(document.title, "contract.pdf");
    assert!(document.status.is_in_flight());
    assert!(!test.workspace.conversations().has_conversations(id));

    test.workspace.settle().await;

    assert_eq!(test.status(id), DocumentStatus::Completed);
    assert_eq!(test.workspace.selected_document_id(), Some(id));

    let conversations = test.workspace.conversations().conversations(id);
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].title, "Chat about contract.pdf");
    assert_eq!(
        test.rendered(id, conversations[0].id),
        vec!["Document \"contract.pdf\" has been processed. What would you like to know?"]
    );

    let requests = test.mock.recorded_index_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].act_name, "contract.pdf");
    assert_eq!(requests[0].collection_name, test.config.collection_name);
    assert_eq!(requests[0].context_documents, vec!["contract.pdf".to_string()]);
}

#[tokio::test]
async fn test_failures_do_not_affect_other_documents() {
    let mut test = TestWorkspace::new();
    test.behavior().fail_index_for("b.pdf");

    let ids = test.workspace.submit(["a.pdf", "b.pdf", "c.pdf"]);
    test.workspace.settle().await;

    assert_eq!(test.status(ids[0]), DocumentStatus::Completed);
    assert_eq!(test.status(ids[1]), DocumentStatus::Error);
    assert_eq!(test.status(ids[2]), DocumentStatus::Completed);

    assert!(test.workspace.conversations().has_conversations(ids[0]));
    assert!(!test.workspace.conversations().has_conversations(ids[1]));
    assert!(test.workspace.conversations().has_conversations(ids[2]));

    let titles: Vec<_> = test
        .workspace
        .documents()
        .list()
        .iter()
        .map(|d| d.title.as_str())
        .collect();
    assert_eq!(titles, vec!["a.pdf", "b.pdf", "c.pdf"]);
}

#[tokio::test]
async fn test_failed_upload_is_not_retried_automatically() {
    let mut test = TestWorkspace::new();
    test.behavior().set_index_outcome(MockOutcome::Fail);

    let id = test.workspace.submit(["a.pdf"])[0];
    test.workspace.settle().await;

    assert_eq!(test.status(id), DocumentStatus::Error);
    assert_eq!(test.mock.recorded_index_requests().len(), 1);
    assert!(test.workspace.is_idle());
}

#[tokio::test]
async fn test_user_retry_recovers_failed_upload() {
    let mut test = TestWorkspace::new();
    test.behavior().set_index_outcome(MockOutcome::Fail);
    let id = test.workspace.submit(["a.pdf"])[0];
    test.workspace.settle().await;

    test.behavior().set_index_outcome(MockOutcome::Succeed);
    tokio_test::assert_ok!(test.workspace.retry_upload(id));
    assert_eq!(test.status(id), DocumentStatus::Processing);

    test.workspace.settle().await;

    assert_eq!(test.status(id), DocumentStatus::Completed);
    assert_eq!(test.workspace.document(id).unwrap().attempts, 2);
    assert_eq!(test.active(id).title, "Chat about a.pdf");
}

#[tokio::test]
async fn test_processing_status_while_service_hangs() {
    let mut test = TestWorkspace::new();
    test.behavior().set_index_outcome(MockOutcome::Hang);

    let ids = test.workspace.submit(["a.pdf", "b.pdf"]);
    tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
    assert_eq!(test.workspace.drain(), 0);

    for id in &ids {
        assert_eq!(test.status(*id), DocumentStatus::Processing);
    }
    assert_eq!(test.workspace.in_flight(), 2);
    assert!(test.workspace.retry_upload(ids[0]).is_err());
    assert_eq!(test.mock.recorded_index_requests().len(), 2);
}

#[tokio::test]
async fn test_empty_submit_is_noop() {
    let mut test = TestWorkspace::new();
    let before = test.workspace.snapshot();

    let ids = test.workspace.submit(Vec::<UploadFile>::new());

    assert!(ids.is_empty());
    assert!(test.workspace.documents().is_empty());
    assert_eq!(test.workspace.snapshot().revision, before.revision);
    assert!(test.mock.recorded_requests().is_empty());
}

#[tokio::test]
async fn test_unusable_file_names_are_skipped() {
    let mut test = TestWorkspace::new();

    let ids = test.workspace.submit(["   ", "ok.pdf"]);
    test.workspace.settle().await;

    assert_eq!(ids.len(), 1);
    assert_eq!(test.workspace.documents().len(), 1);
    assert_eq!(test.status(ids[0]), DocumentStatus::Completed);
}

#[tokio::test]
async fn test_old_snapshots_are_never_mutated() {
    let mut test = TestWorkspace::new();
    let id = test.workspace.submit(["a.pdf"])[0];
    let during = test.workspace.snapshot();

    test.workspace.settle().await;
    let after = test.workspace.snapshot();

    assert!(!Arc::ptr_eq(&during.documents, &after.documents));
    assert_eq!(during.documents[0].status, DocumentStatus::Processing);
    assert!(!during.conversations.contains_key(&id));
    assert_eq!(after.documents[0].status, DocumentStatus::Completed);
    assert!(after.revision > during.revision);
}

#[tokio::test]
async fn test_selecting_unknown_document_keeps_selection() {
    let (mut test, id) = TestWorkspace::with_ready_document("a.pdf").await;

    assert!(!test.workspace.select_document(uuid::Uuid::new_v4()));
    assert_eq!(test.workspace.selected_document_id(), Some(id));
}
