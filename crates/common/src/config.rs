//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Default base URL of the RAG service
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

/// Default collection that uploaded documents are indexed into
pub const DEFAULT_COLLECTION_NAME: &str = "legal_docs";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the remote RAG service
    pub api_base_url: String,

    /// Collection used for every index-build and query in multi-document mode
    pub collection_name: String,

    /// RAG service provider (http, mock)
    pub rag_provider: String,

    /// Runtime configuration
    pub log_level: String,
    pub rust_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            rag_provider: "http".to_string(),
            log_level: "info".to_string(),
            rust_log: "kanun=debug".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let defaults = Self::default();

        let config = Self {
            api_base_url: env::var("KANUN_API_BASE_URL").unwrap_or(defaults.api_base_url),
            collection_name: env::var("KANUN_COLLECTION_NAME")
                .unwrap_or(defaults.collection_name),
            rag_provider: env::var("RAG_PROVIDER").unwrap_or(defaults.rag_provider),
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            rust_log: env::var("RUST_LOG").unwrap_or(defaults.rust_log),
        };

        config.validate()?;
        tracing::debug!(
            api_base_url = %config.api_base_url,
            collection = %config.collection_name,
            provider = %config.rag_provider,
            "Configuration loaded from environment"
        );
        Ok(config)
    }

    /// Reject configurations the client cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.collection_name.trim().is_empty() {
            return Err(anyhow::anyhow!("KANUN_COLLECTION_NAME must not be empty"));
        }
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "KANUN_API_BASE_URL must be an http(s) URL, got {}",
                self.api_base_url
            ));
        }
        Ok(())
    }
}
