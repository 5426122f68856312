//! Single-file chat
//!
//! Chat against one of the files the service has already indexed. There is no
//! registry: the session keeps the chosen file, a flat message list and the
//! pending input.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kanun_conversations::{MessageRole, Reference};
use kanun_rag::{AvailableFile, FileQuery, FileQueryResponse, RagError, RagService};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::events::{spawn_reporting, FileChatEvent};

/// Prefix of the reply shown when a file query fails
pub const FILE_QUERY_ERROR_PREFIX: &str = "Sorry, there was an error processing your request";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    #[serde(default)]
    pub is_error: bool,
}

impl FileChatMessage {
    fn new(role: MessageRole, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: Utc::now(),
            confidence_score: None,
            references: None,
            is_error: false,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content.into())
    }

    pub fn answer(response: FileQueryResponse) -> Self {
        let mut message = Self::new(MessageRole::Assistant, response.answer.render());
        message.confidence_score = response.confidence_score;
        message.references = response
            .referenced_chunks
            .map(|chunks| chunks.into_iter().map(Reference::Chunk).collect());
        message
    }

    pub fn failure(error: &RagError) -> Self {
        let mut message = Self::new(
            MessageRole::Assistant,
            format!("{}: {}", FILE_QUERY_ERROR_PREFIX, error),
        );
        message.is_error = true;
        message
    }
}

pub struct FileChatSession {
    rag: Arc<dyn RagService>,
    selected_file: Option<String>,
    messages: Vec<FileChatMessage>,
    input: String,
    // Bumped on every selection change; replies from an older one are dropped
    generation: u64,
    // Queries not yet received back, across all generations
    outstanding: usize,
    // Queries of the current generation still awaiting a reply
    pending_replies: usize,
    events_tx: mpsc::UnboundedSender<FileChatEvent>,
    events_rx: mpsc::UnboundedReceiver<FileChatEvent>,
}

impl FileChatSession {
    pub fn new(rag: Arc<dyn RagService>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            rag,
            selected_file: None,
            messages: Vec::new(),
            input: String::new(),
            generation: 0,
            outstanding: 0,
            pending_replies: 0,
            events_tx,
            events_rx,
        }
    }

    /// Files the service can answer questions about
    pub async fn available_files(&self) -> Result<Vec<AvailableFile>, RagError> {
        let files = self.rag.available_files().await?;
        tracing::debug!(count = files.len(), "Fetched available files");
        Ok(files)
    }

    pub fn selected_file(&self) -> Option<&str> {
        self.selected_file.as_deref()
    }

    pub fn messages(&self) -> &[FileChatMessage] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Whether the current file still waits for a reply
    pub fn is_loading(&self) -> bool {
        self.pending_replies > 0
    }

    /// Choose a file; a different file starts an empty chat
    pub fn select_file(&mut self, file_name: impl Into<String>) {
        let file_name = file_name.into();
        if self.selected_file.as_deref() == Some(file_name.as_str()) {
            return;
        }

        tracing::info!(file_name = %file_name, "File selected for chat");
        self.selected_file = Some(file_name);
        self.reset_chat();
    }

    pub fn clear_selection(&mut self) {
        if self.selected_file.take().is_some() {
            self.reset_chat();
        }
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Send the current input about the selected file.
    ///
    /// Returns the id of the user message, or `None` when there is no file or
    /// the input is blank.
    pub fn submit(&mut self) -> Option<Uuid> {
        let file_name = self.selected_file.as_deref()?;
        if self.input.trim().is_empty() {
            return None;
        }

        let question = std::mem::take(&mut self.input);
        let request = FileQuery::for_file(file_name, &question);
        let message = FileChatMessage::user(question);
        let message_id = message.id;
        self.messages.push(message);

        let rag = Arc::clone(&self.rag);
        let events = self.events_tx.clone();
        let generation = self.generation;
        self.outstanding += 1;
        self.pending_replies += 1;

        tracing::debug!(file_name = %request.file_name, "Dispatching file query");
        spawn_reporting(async move { rag.query_file(request).await }, move |result| {
            let _ = events.send(FileChatEvent { generation, result });
        });

        Some(message_id)
    }

    /// Wait for the next finished query; `None` when nothing is outstanding
    pub async fn next_event(&mut self) -> Option<FileChatEvent> {
        if self.outstanding == 0 {
            return None;
        }
        let event = self.events_rx.recv().await?;
        self.outstanding -= 1;
        Some(event)
    }

    /// Apply every outstanding reply, waiting for the ones still running
    pub async fn settle(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.next_event().await {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    pub fn apply(&mut self, event: FileChatEvent) {
        if event.generation != self.generation {
            tracing::debug!("Dropping reply for a previous file selection");
            return;
        }
        self.pending_replies = self.pending_replies.saturating_sub(1);

        let message = match event.result {
            Ok(response) => FileChatMessage::answer(response),
            Err(error) => {
                tracing::warn!(error = %error, "File query failed");
                FileChatMessage::failure(&error)
            }
        };
        self.messages.push(message);
    }

    fn reset_chat(&mut self) {
        self.messages.clear();
        self.generation += 1;
        self.pending_replies = 0;
    }
}
