//! Kanun RAG Service
//!
//! Client side of the remote retrieval-augmented-generation API:
//! - HTTP client for the index-build, query, file-scoped query and file listing calls
//! - Request payload builders and tolerant parsing of the heterogeneous answer shapes
//! - Programmable mock service for testing and offline development

pub mod answer;
pub mod client;
pub mod mock;

pub use answer::{Answer, SectionFragment, SectionNumber, UNRECOGNIZED_ANSWER};

use kanun_common::Config;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("RAG configuration error: {0}")]
    Configuration(String),

    #[error("RAG request error: {0}")]
    Request(String),

    #[error("RAG service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("RAG response error: {0}")]
    Response(String),
}

/// Index-build request for one uploaded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRequest {
    pub act_name: String,
    pub collection_name: String,
    pub context_documents: Vec<String>,
}

impl IndexRequest {
    /// Scope the request to a single document title
    pub fn for_document(title: &str, collection_name: &str) -> Self {
        Self {
            act_name: title.to_string(),
            collection_name: collection_name.to_string(),
            context_documents: vec![title.to_string()],
        }
    }
}

/// Question scoped to a single indexed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub act_name: String,
    pub collection_name: String,
    pub context_documents: Vec<String>,
}

impl QueryRequest {
    pub fn for_document(question: &str, title: &str, collection_name: &str) -> Self {
        Self {
            question: question.to_string(),
            act_name: title.to_string(),
            collection_name: collection_name.to_string(),
            context_documents: vec![title.to_string()],
        }
    }
}

/// Response of the document query endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub answer: Answer,
}

impl QueryResponse {
    /// Build from any JSON body; never fails
    pub fn from_body(body: &Value) -> Self {
        Self {
            answer: Answer::from_body(body),
        }
    }
}

/// File-scoped query, sent entirely as query-string parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileQuery {
    pub collection_name: String,
    pub file_name: String,
    pub question: String,
}

impl FileQuery {
    /// The file name (without its `.json` marker) doubles as the collection name
    pub fn for_file(file_name: &str, question: &str) -> Self {
        let clean = file_name.replacen(".json", "", 1);
        Self {
            collection_name: clean.clone(),
            file_name: clean,
            question: question.to_string(),
        }
    }
}

/// Chunk the service cites as the source of an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencedChunk {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub section_num: SectionNumber,
}

impl std::fmt::Display for ReferencedChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: Section {}", self.title, self.section_num)
    }
}

/// Response of the file-scoped query endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileQueryResponse {
    #[serde(default)]
    pub answer: Answer,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_chunks: Option<Vec<ReferencedChunk>>,
}

impl FileQueryResponse {
    /// Build from any JSON body. Optional fields with an unexpected shape are dropped.
    pub fn from_body(body: &Value) -> Self {
        let confidence_score = body.get("confidence_score").and_then(Value::as_f64);
        let referenced_chunks = body
            .get("referenced_chunks")
            .cloned()
            .and_then(|chunks| serde_json::from_value(chunks).ok());

        Self {
            answer: Answer::from_body(body),
            confidence_score,
            referenced_chunks,
        }
    }
}

/// Entry of the available-files listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailableFile {
    pub file_name: String,
    #[serde(default)]
    pub file_description: String,
}

/// RAG service configuration
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// RAG provider (http, mock)
    pub provider: String,
    /// Base URL of the remote service
    pub base_url: String,
}

impl RagConfig {
    /// Create RAG config from environment variables
    pub fn from_env() -> Result<Self, RagError> {
        let config = Config::from_env().map_err(|e| RagError::Configuration(e.to_string()))?;
        Ok(Self::from_app_config(&config))
    }

    pub fn from_app_config(config: &Config) -> Self {
        Self {
            provider: config.rag_provider.clone(),
            base_url: config.api_base_url.clone(),
        }
    }
}

/// RAG service trait for different backends
#[async_trait::async_trait]
pub trait RagService: Send + Sync {
    /// Ask the service to build the index for one document.
    async fn build_index(&self, request: IndexRequest) -> Result<(), RagError>;

    /// Ask a question scoped to an indexed document.
    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, RagError>;

    /// Ask a question scoped to a pre-indexed file.
    async fn query_file(&self, request: FileQuery) -> Result<FileQueryResponse, RagError>;

    /// List the files the service has already indexed.
    async fn available_files(&self) -> Result<Vec<AvailableFile>, RagError>;
}

/// Factory for creating RagService implementations
pub struct RagServiceFactory;

impl RagServiceFactory {
    pub fn create(config: RagConfig) -> Result<Box<dyn RagService>, RagError> {
        match config.provider.as_str() {
            "http" => {
                tracing::info!(base_url = %config.base_url, "Creating HTTP RAG client");
                if config.base_url.is_empty() {
                    return Err(RagError::Configuration(
                        "KANUN_API_BASE_URL is required for the http provider".to_string(),
                    ));
                }
                Ok(Box::new(client::RagClient::new(config)))
            }
            "mock" => {
                tracing::info!("Creating mock RAG service");
                Ok(Box::new(mock::MockRagService::new()))
            }
            provider => Err(RagError::Configuration(format!(
                "Unknown RAG provider: {}. Supported providers: http, mock",
                provider
            ))),
        }
    }
}
