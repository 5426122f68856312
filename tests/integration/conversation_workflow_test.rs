//! Conversation workflow tests
//!
//! Covers creating and selecting conversations, sending messages and how
//! answers of every shape end up in the thread.

mod common;

use common::TestWorkspace;
use kanun_app::QUERY_ERROR_REPLY;
use kanun_conversations::MessageRole;
use kanun_rag::mock::MockOutcome;
use kanun_rag::UNRECOGNIZED_ANSWER;
use serde_json::json;
use uuid::Uuid;

const GREETING: &str = "Document \"contract.pdf\" has been processed. What would you like to know?";

#[tokio::test]
async fn test_question_and_text_answer() {
    let (mut test, doc) = TestWorkspace::with_ready_document("contract.pdf").await;
    test.behavior()
        .set_answer_for("What is clause 4?", json!("Clause 4 covers payment terms."));

    let conv = test.active(doc).id;
    let message_id = test
        .workspace
        .send_message(doc, conv, "What is clause 4?")
        .unwrap();

    // Optimistic append before the answer arrives
    let pending = test.conversation(doc, conv);
    assert_eq!(pending.len(), 2);
    assert_eq!(pending.messages[1].id, message_id);
    assert_eq!(pending.messages[1].role, MessageRole::User);

    test.workspace.settle().await;

    assert_eq!(
        test.rendered(doc, conv),
        vec![GREETING, "What is clause 4?", "Clause 4 covers payment terms."]
    );
    let reply = &test.conversation(doc, conv).messages[2];
    assert_eq!(reply.role, MessageRole::Assistant);
    assert_eq!(reply.in_reply_to, Some(message_id));

    let query = &test.mock.recorded_queries()[0];
    assert_eq!(query.question, "What is clause 4?");
    assert_eq!(query.act_name, "contract.pdf");
    assert_eq!(query.context_documents, vec!["contract.pdf".to_string()]);
}

#[tokio::test]
async fn test_section_answer_rendering() {
    let (mut test, doc) = TestWorkspace::with_ready_document("contract.pdf").await;
    test.behavior().set_answer(json!([
        {"section_num": 3, "content": "Termination requires notice."},
        {"section_num": 7, "content": ""},
        {"section_num": "12A"}
    ]));

    test.workspace.send_to_active(doc, "How do I terminate?").unwrap();
    test.workspace.settle().await;

    let reply = test.active(doc).last_message().unwrap().content.render();
    assert_eq!(
        reply,
        "Section 3: Termination requires notice.\n\
         Section 7: No content available\n\
         Section 12A: No content available"
    );
}

#[tokio::test]
async fn test_unrecognized_answer_shapes() {
    for answer in [json!({"text": "nested"}), json!(42), json!(null)] {
        let (mut test, doc) = TestWorkspace::with_ready_document("contract.pdf").await;
        test.behavior().set_answer(answer);

        test.workspace.send_to_active(doc, "Anything?").unwrap();
        test.workspace.settle().await;

        let reply = test.active(doc).last_message().unwrap().content.render();
        assert_eq!(reply, UNRECOGNIZED_ANSWER);
    }
}

#[tokio::test]
async fn test_query_failure_injects_fallback_reply() {
    let (mut test, doc) = TestWorkspace::with_ready_document("contract.pdf").await;
    test.behavior().set_query_outcome(MockOutcome::Fail);

    test.workspace.send_to_active(doc, "What is clause 4?").unwrap();
    test.workspace.settle().await;

    let conv = test.active(doc).id;
    assert_eq!(
        test.rendered(doc, conv),
        vec![GREETING, "What is clause 4?", QUERY_ERROR_REPLY]
    );
}

#[tokio::test]
async fn test_create_conversation_twice() {
    let (mut test, doc) = TestWorkspace::with_ready_document("contract.pdf").await;

    let first_new = test.workspace.create_conversation(doc).unwrap();
    let second_new = test.workspace.create_conversation(doc).unwrap();

    let conversations = test.workspace.conversations().conversations(doc);
    assert_eq!(conversations.len(), 3);
    assert_eq!(conversations[1].id, first_new);
    assert_eq!(conversations[2].id, second_new);
    for conversation in &conversations[1..] {
        assert_eq!(conversation.title, "New Chat contract.pdf");
        assert_eq!(conversation.len(), 1);
        assert_eq!(
            conversation.messages[0].content.render(),
            "Start a new conversation about this document."
        );
    }

    assert_eq!(test.active(doc).id, second_new);
    assert_eq!(test.workspace.selected_document_id(), Some(doc));
    assert!(test.mock.recorded_queries().is_empty());
}

#[tokio::test]
async fn test_create_conversation_selects_document() {
    let mut test = TestWorkspace::new();
    let a = test.upload_ready("a.pdf").await;
    let b = test.upload_ready("b.pdf").await;
    assert_eq!(test.workspace.selected_document_id(), Some(b));

    test.workspace.create_conversation(a).unwrap();
    assert_eq!(test.workspace.selected_document_id(), Some(a));
}

#[tokio::test]
async fn test_create_conversation_unknown_document_is_noop() {
    let (mut test, doc) = TestWorkspace::with_ready_document("contract.pdf").await;
    let before = test.workspace.snapshot();

    assert!(test.workspace.create_conversation(Uuid::new_v4()).is_none());

    let after = test.workspace.snapshot();
    assert_eq!(after.revision, before.revision);
    assert_eq!(after.selected_document_id, Some(doc));
}

#[tokio::test]
async fn test_send_to_unknown_targets_is_noop() {
    let (mut test, doc) = TestWorkspace::with_ready_document("contract.pdf").await;
    let conv = test.active(doc).id;
    let other_doc = test.upload_ready("other.pdf").await;
    let before = test.workspace.snapshot();

    assert!(test.workspace.send_message(Uuid::new_v4(), conv, "hi").is_none());
    assert!(test.workspace.send_message(doc, Uuid::new_v4(), "hi").is_none());
    // Conversation exists but belongs to another document
    assert!(test.workspace.send_message(other_doc, conv, "hi").is_none());

    assert_eq!(test.workspace.snapshot().revision, before.revision);
    assert!(test.mock.recorded_queries().is_empty());
}

#[tokio::test]
async fn test_out_of_order_replies_stay_paired() {
    let (mut test, doc) = TestWorkspace::with_ready_document("contract.pdf").await;
    test.behavior().set_answer_for("first", json!("answer to first"));
    test.behavior().set_answer_for("second", json!("answer to second"));
    test.behavior().set_delay_for("first", 100);

    let conv = test.active(doc).id;
    test.workspace.send_message(doc, conv, "first").unwrap();
    test.workspace.send_message(doc, conv, "second").unwrap();

    // The second answer arrives first
    let event = test.workspace.next_event().await.unwrap();
    test.workspace.apply(event);
    assert_eq!(
        test.rendered(doc, conv),
        vec![GREETING, "first", "second", "answer to second"]
    );

    test.workspace.settle().await;
    assert_eq!(
        test.rendered(doc, conv),
        vec![GREETING, "first", "answer to first", "second", "answer to second"]
    );
}

#[tokio::test]
async fn test_late_reply_lands_in_original_conversation() {
    let (mut test, doc) = TestWorkspace::with_ready_document("contract.pdf").await;
    test.behavior().set_delay_ms(50);

    let original = test.active(doc).id;
    test.workspace.send_to_active(doc, "slow question").unwrap();

    let fresh = test.workspace.create_conversation(doc).unwrap();
    test.workspace.settle().await;

    assert_eq!(test.conversation(doc, original).len(), 3);
    assert_eq!(test.conversation(doc, fresh).len(), 1);
    assert_eq!(test.active(doc).id, fresh);
}

#[tokio::test]
async fn test_select_conversation_routes_messages() {
    let (mut test, doc) = TestWorkspace::with_ready_document("contract.pdf").await;
    let original = test.active(doc).id;
    let fresh = test.workspace.create_conversation(doc).unwrap();

    assert!(test.workspace.select_conversation(doc, original));
    test.workspace.send_to_active(doc, "back to the first thread").unwrap();
    test.workspace.settle().await;

    assert_eq!(test.conversation(doc, original).len(), 3);
    assert_eq!(test.conversation(doc, fresh).len(), 1);

    assert!(!test.workspace.select_conversation(doc, Uuid::new_v4()));
    assert_eq!(test.active(doc).id, original);
}

#[tokio::test]
async fn test_documents_keep_separate_threads() {
    let mut test = TestWorkspace::new();
    let a = test.upload_ready("a.pdf").await;
    let b = test.upload_ready("b.pdf").await;

    test.workspace.send_to_active(a, "question about a").unwrap();
    test.workspace.settle().await;

    assert_eq!(test.active(a).len(), 3);
    assert_eq!(test.active(b).len(), 1);
    assert_eq!(test.mock.recorded_queries()[0].act_name, "a.pdf");
}
