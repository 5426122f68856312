//! Mock RAG Service Implementation
//!
//! Programmable mock for testing document and conversation workflows:
//! - `MockRagService`: configurable mock with request recording
//! - `MockRagBehavior`: controls outcomes, canned answers and delays
//! - `MockOutcome`: Succeed, Fail, or Hang

use crate::{
    AvailableFile, FileQuery, FileQueryResponse, IndexRequest, QueryRequest, QueryResponse,
    RagError, RagService,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

/// What outcome the mock should produce
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MockOutcome {
    /// Respond successfully
    #[default]
    Succeed,
    /// Respond with a server error
    Fail,
    /// Never respond (simulates an unresponsive service)
    Hang,
}

/// Programmable behavior for the mock RAG service
#[derive(Debug, Clone)]
pub struct MockRagBehavior {
    pub index_outcome: Arc<RwLock<MockOutcome>>,
    pub query_outcome: Arc<RwLock<MockOutcome>>,
    pub failing_titles: Arc<RwLock<HashSet<String>>>,
    pub default_answer: Arc<RwLock<Value>>,
    pub answers_by_question: Arc<RwLock<HashMap<String, Value>>>,
    pub delays_by_question: Arc<RwLock<HashMap<String, u64>>>,
    pub file_query_body: Arc<RwLock<Option<Value>>>,
    pub available_files: Arc<RwLock<Vec<AvailableFile>>>,
    pub delay_ms: Arc<RwLock<u64>>,
}

impl Default for MockRagBehavior {
    fn default() -> Self {
        Self {
            index_outcome: Arc::new(RwLock::new(MockOutcome::Succeed)),
            query_outcome: Arc::new(RwLock::new(MockOutcome::Succeed)),
            failing_titles: Arc::new(RwLock::new(HashSet::new())),
            default_answer: Arc::new(RwLock::new(json!("Mock answer"))),
            answers_by_question: Arc::new(RwLock::new(HashMap::new())),
            delays_by_question: Arc::new(RwLock::new(HashMap::new())),
            file_query_body: Arc::new(RwLock::new(None)),
            available_files: Arc::new(RwLock::new(Vec::new())),
            delay_ms: Arc::new(RwLock::new(0)),
        }
    }
}

impl MockRagBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the outcome of every index-build call
    pub fn set_index_outcome(&self, outcome: MockOutcome) {
        *self.index_outcome.write().unwrap() = outcome;
    }

    /// Configure the outcome of every query call (both query flavors)
    pub fn set_query_outcome(&self, outcome: MockOutcome) {
        *self.query_outcome.write().unwrap() = outcome;
    }

    /// Make index-build fail for one document title only
    pub fn fail_index_for(&self, title: &str) {
        self.failing_titles.write().unwrap().insert(title.to_string());
    }

    /// Configure the `answer` value returned for any question
    pub fn set_answer(&self, answer: Value) {
        *self.default_answer.write().unwrap() = answer;
    }

    /// Configure the `answer` value returned for one question
    pub fn set_answer_for(&self, question: &str, answer: Value) {
        self.answers_by_question
            .write()
            .unwrap()
            .insert(question.to_string(), answer);
    }

    /// Delay the response to one question
    pub fn set_delay_for(&self, question: &str, delay_ms: u64) {
        self.delays_by_question
            .write()
            .unwrap()
            .insert(question.to_string(), delay_ms);
    }

    /// Configure the full body returned by the file-scoped query
    pub fn set_file_query_body(&self, body: Value) {
        *self.file_query_body.write().unwrap() = Some(body);
    }

    /// Configure the available-files listing
    pub fn set_available_files(&self, files: Vec<AvailableFile>) {
        *self.available_files.write().unwrap() = files;
    }

    /// Configure delay applied before every response
    pub fn set_delay_ms(&self, delay: u64) {
        *self.delay_ms.write().unwrap() = delay;
    }

    /// Reset to default behavior
    pub fn reset(&self) {
        *self.index_outcome.write().unwrap() = MockOutcome::Succeed;
        *self.query_outcome.write().unwrap() = MockOutcome::Succeed;
        self.failing_titles.write().unwrap().clear();
        *self.default_answer.write().unwrap() = json!("Mock answer");
        self.answers_by_question.write().unwrap().clear();
        self.delays_by_question.write().unwrap().clear();
        *self.file_query_body.write().unwrap() = None;
        self.available_files.write().unwrap().clear();
        *self.delay_ms.write().unwrap() = 0;
    }

    pub fn get_index_outcome(&self) -> MockOutcome {
        self.index_outcome.read().unwrap().clone()
    }

    pub fn get_query_outcome(&self) -> MockOutcome {
        self.query_outcome.read().unwrap().clone()
    }

    pub fn get_delay_ms(&self) -> u64 {
        *self.delay_ms.read().unwrap()
    }

    fn answer_for(&self, question: &str) -> Value {
        self.answers_by_question
            .read()
            .unwrap()
            .get(question)
            .cloned()
            .unwrap_or_else(|| self.default_answer.read().unwrap().clone())
    }

    fn delay_for(&self, question: &str) -> u64 {
        self.delays_by_question
            .read()
            .unwrap()
            .get(question)
            .copied()
            .unwrap_or_else(|| self.get_delay_ms())
    }
}

/// A recorded call for test assertions
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedRagRequest {
    Index(IndexRequest),
    Query(QueryRequest),
    FileQuery(FileQuery),
    AvailableFiles,
}

/// Mock RAG service with programmable behavior
#[derive(Debug, Clone)]
pub struct MockRagService {
    behavior: Arc<MockRagBehavior>,
    history: Arc<Mutex<Vec<RecordedRagRequest>>>,
}

impl MockRagService {
    pub fn new() -> Self {
        Self::with_behavior(Arc::new(MockRagBehavior::new()))
    }

    pub fn with_behavior(behavior: Arc<MockRagBehavior>) -> Self {
        Self {
            behavior,
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get the shared behavior for configuration
    pub fn behavior(&self) -> &Arc<MockRagBehavior> {
        &self.behavior
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<RecordedRagRequest> {
        self.history.lock().unwrap().clone()
    }

    /// Recorded index-build requests only
    pub fn recorded_index_requests(&self) -> Vec<IndexRequest> {
        self.recorded_requests()
            .into_iter()
            .filter_map(|r| match r {
                RecordedRagRequest::Index(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Recorded document queries only
    pub fn recorded_queries(&self) -> Vec<QueryRequest> {
        self.recorded_requests()
            .into_iter()
            .filter_map(|r| match r {
                RecordedRagRequest::Query(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Clear history
    pub fn reset_history(&self) {
        self.history.lock().unwrap().clear();
    }

    fn record(&self, request: RecordedRagRequest) {
        self.history.lock().unwrap().push(request);
    }

    /// Apply delay and outcome; `Ok(())` means the caller should answer successfully
    async fn settle(outcome: MockOutcome, delay_ms: u64, what: &str) -> Result<(), RagError> {
        if delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
        }

        match outcome {
            MockOutcome::Succeed => Ok(()),
            MockOutcome::Fail => Err(RagError::Status {
                status: 500,
                body: format!("Mock {} failure", what),
            }),
            MockOutcome::Hang => {
                tracing::info!(call = %what, "Mock RAG: simulating unresponsive service");
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

impl Default for MockRagService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RagService for MockRagService {
    async fn build_index(&self, request: IndexRequest) -> Result<(), RagError> {
        tracing::info!(act_name = %request.act_name, "Mock RAG: received index-build request");

        let title_fails = self
            .behavior
            .failing_titles
            .read()
            .unwrap()
            .contains(&request.act_name);
        let outcome = if title_fails {
            MockOutcome::Fail
        } else {
            self.behavior.get_index_outcome()
        };
        let delay_ms = self.behavior.get_delay_ms();

        self.record(RecordedRagRequest::Index(request));
        Self::settle(outcome, delay_ms, "index-build").await
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, RagError> {
        tracing::info!(act_name = %request.act_name, "Mock RAG: received query");

        let outcome = self.behavior.get_query_outcome();
        let delay_ms = self.behavior.delay_for(&request.question);
        let answer = self.behavior.answer_for(&request.question);

        self.record(RecordedRagRequest::Query(request));
        Self::settle(outcome, delay_ms, "query").await?;

        Ok(QueryResponse::from_body(&json!({ "answer": answer })))
    }

    async fn query_file(&self, request: FileQuery) -> Result<FileQueryResponse, RagError> {
        tracing::info!(file_name = %request.file_name, "Mock RAG: received file-scoped query");

        let outcome = self.behavior.get_query_outcome();
        let delay_ms = self.behavior.delay_for(&request.question);
        let body = self
            .behavior
            .file_query_body
            .read()
            .unwrap()
            .clone()
            .unwrap_or_else(|| json!({ "answer": self.behavior.answer_for(&request.question) }));

        self.record(RecordedRagRequest::FileQuery(request));
        Self::settle(outcome, delay_ms, "file query").await?;

        Ok(FileQueryResponse::from_body(&body))
    }

    async fn available_files(&self) -> Result<Vec<AvailableFile>, RagError> {
        self.record(RecordedRagRequest::AvailableFiles);
        Ok(self.behavior.available_files.read().unwrap().clone())
    }
}
