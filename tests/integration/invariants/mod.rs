//! Business invariant validation tests
//!
//! Document identity, conversation ownership, message accounting and the
//! indexing state machine, checked through the public workspace API.

use std::collections::HashSet;

use kanun_documents::DocumentStatus;
use kanun_rag::mock::MockOutcome;
use serde_json::json;

use crate::common::TestWorkspace;

mod test_document_invariants {
    use super::*;

    #[tokio::test]
    async fn test_one_entry_per_upload_with_unique_ids() {
        let mut test = TestWorkspace::new();

        // Same name twice is still two documents
        let ids = test.workspace.submit(["same.pdf", "same.pdf", "other.pdf"]);
        test.workspace.settle().await;

        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 3);
        assert_eq!(test.workspace.documents().len(), 3);
        for id in &ids {
            assert_eq!(
                test.workspace
                    .documents()
                    .list()
                    .iter()
                    .filter(|d| d.id == *id)
                    .count(),
                1
            );
        }
    }

    #[tokio::test]
    async fn test_completed_is_terminal() {
        let (mut test, doc) = TestWorkspace::with_ready_document("a.pdf").await;

        assert!(test.workspace.retry_upload(doc).is_err());
        assert_eq!(test.status(doc), DocumentStatus::Completed);
        assert_eq!(test.mock.recorded_index_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_no_duplicate_index_requests_in_flight() {
        let mut test = TestWorkspace::new();
        test.behavior().set_index_outcome(MockOutcome::Hang);
        let doc = test.workspace.submit(["a.pdf"])[0];

        // Retrying an in-flight document is rejected
        assert!(test.workspace.retry_upload(doc).is_err());
        assert_eq!(test.workspace.in_flight(), 1);
        assert_eq!(test.workspace.document(doc).unwrap().attempts, 1);
    }

    #[tokio::test]
    async fn test_conversations_only_for_completed_documents() {
        let mut test = TestWorkspace::new();
        test.behavior().fail_index_for("bad.pdf");
        let ids = test.workspace.submit(["good.pdf", "bad.pdf"]);
        test.workspace.settle().await;

        for document in test.workspace.documents().list() {
            let has_conversations = test.workspace.conversations().has_conversations(document.id);
            assert_eq!(has_conversations, document.status == DocumentStatus::Completed);
        }
        assert_eq!(ids.len(), 2);
    }
}

mod test_conversation_invariants {
    use super::*;

    #[tokio::test]
    async fn test_conversations_belong_to_their_document() {
        let mut test = TestWorkspace::new();
        let a = test.upload_ready("a.pdf").await;
        let b = test.upload_ready("b.pdf").await;
        test.workspace.create_conversation(a);
        test.workspace.create_conversation(b);

        for doc in [a, b] {
            for conversation in test.workspace.conversations().conversations(doc) {
                assert_eq!(conversation.document_id, doc);
            }
        }
    }

    #[tokio::test]
    async fn test_every_exchange_adds_exactly_two_messages() {
        let (mut test, doc) = TestWorkspace::with_ready_document("contract.pdf").await;
        let conv = test.active(doc).id;

        let outcomes = [MockOutcome::Succeed, MockOutcome::Fail, MockOutcome::Succeed];
        for (round, outcome) in outcomes.into_iter().enumerate() {
            test.behavior().set_query_outcome(outcome);
            let before = test.conversation(doc, conv).len();

            test.workspace
                .send_message(doc, conv, &format!("question {}", round))
                .unwrap();
            test.workspace.settle().await;

            assert_eq!(test.conversation(doc, conv).len(), before + 2);
        }
    }

    #[tokio::test]
    async fn test_overlapping_exchanges_keep_pairs_adjacent() {
        let (mut test, doc) = TestWorkspace::with_ready_document("contract.pdf").await;
        let conv = test.active(doc).id;
        for (i, delay) in [60u64, 0, 30].iter().enumerate() {
            let question = format!("q{}", i);
            test.behavior().set_delay_for(&question, *delay);
            test.behavior().set_answer_for(&question, json!(format!("a{}", i)));
        }

        let mut sent = Vec::new();
        for i in 0..3 {
            sent.push(
                test.workspace
                    .send_message(doc, conv, &format!("q{}", i))
                    .unwrap(),
            );
        }
        test.workspace.settle().await;

        let messages = &test.conversation(doc, conv).messages;
        assert_eq!(messages.len(), 7);
        for question_id in sent {
            let position = messages.iter().position(|m| m.id == question_id).unwrap();
            assert_eq!(messages[position + 1].in_reply_to, Some(question_id));
        }
    }

    #[tokio::test]
    async fn test_messages_are_never_rewritten() {
        let (mut test, doc) = TestWorkspace::with_ready_document("contract.pdf").await;
        let conv = test.active(doc).id;
        let greeting = test.conversation(doc, conv).messages[0].clone();

        test.workspace.send_message(doc, conv, "q").unwrap();
        let question = test.conversation(doc, conv).messages[1].clone();
        test.workspace.settle().await;

        let messages = &test.conversation(doc, conv).messages;
        assert_eq!(messages[0], greeting);
        assert_eq!(messages[1], question);
    }
}
