//! RAG HTTP Client Implementation
//!
//! Calls the remote retrieval API under `{base_url}/api/v1` using reqwest.
//! Any transport error or non-2xx status is reported as a failure.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use serde_json::Value;

use crate::{
    AvailableFile, FileQuery, FileQueryResponse, IndexRequest, QueryRequest, QueryResponse,
    RagConfig, RagError, RagService,
};

const INDEX_PATH: &str = "/api/v1/test";
const QUERY_PATH: &str = "/api/v1/query";
const AVAILABLE_FILES_PATH: &str = "/api/v1/available-files";

/// HTTP client for the remote RAG service
pub struct RagClient {
    http: Client,
    base_url: String,
}

impl RagClient {
    /// Create a new RAG client from configuration
    pub fn new(config: RagConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn non-2xx statuses into `RagError::Status`
    async fn ensure_success(response: Response) -> Result<Response, RagError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response body".to_string());
        Err(RagError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn read_json(response: Response) -> Result<Value, RagError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| RagError::Response(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait::async_trait]
impl RagService for RagClient {
    async fn build_index(&self, request: IndexRequest) -> Result<(), RagError> {
        tracing::debug!(
            act_name = %request.act_name,
            collection = %request.collection_name,
            "Sending index-build request"
        );

        let response = self
            .http
            .post(self.endpoint(INDEX_PATH))
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Request(format!("HTTP request failed: {}", e)))?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn query(&self, request: QueryRequest) -> Result<QueryResponse, RagError> {
        tracing::debug!(
            act_name = %request.act_name,
            collection = %request.collection_name,
            "Sending query request"
        );

        let response = self
            .http
            .post(self.endpoint(QUERY_PATH))
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Request(format!("HTTP request failed: {}", e)))?;

        let body = Self::read_json(Self::ensure_success(response).await?).await?;
        Ok(QueryResponse::from_body(&body))
    }

    async fn query_file(&self, request: FileQuery) -> Result<FileQueryResponse, RagError> {
        tracing::debug!(file_name = %request.file_name, "Sending file-scoped query");

        let response = self
            .http
            .post(self.endpoint(QUERY_PATH))
            .header(CONTENT_TYPE, "application/json")
            .query(&request)
            .send()
            .await
            .map_err(|e| RagError::Request(format!("HTTP request failed: {}", e)))?;

        let body = Self::read_json(Self::ensure_success(response).await?).await?;
        Ok(FileQueryResponse::from_body(&body))
    }

    async fn available_files(&self) -> Result<Vec<AvailableFile>, RagError> {
        let response = self
            .http
            .get(self.endpoint(AVAILABLE_FILES_PATH))
            .send()
            .await
            .map_err(|e| RagError::Request(format!("HTTP request failed: {}", e)))?;

        let files = Self::ensure_success(response)
            .await?
            .json::<Vec<AvailableFile>>()
            .await
            .map_err(|e| RagError::Response(format!("Failed to parse file list: {}", e)))?;

        tracing::debug!(count = files.len(), "Fetched available files");
        Ok(files)
    }
}
