//! Workspace: the single owner of documents, conversations and selection
//!
//! Every mutation goes through `&mut self`. Remote calls run on spawned tasks
//! that only hold their request and a handle to the service; their outcome
//! comes back as a [`WorkspaceEvent`] which the owner applies with
//! [`Workspace::apply`], usually through [`Workspace::settle`] or
//! [`Workspace::drain`].

use std::collections::HashMap;
use std::sync::Arc;

use kanun_common::{Config, Error, Result};
use kanun_conversations::{
    Conversation, ConversationStore, DocumentThreads, Message, MessageContent,
};
use kanun_documents::{Document, DocumentRegistry, UploadFile};
use kanun_rag::{
    Answer, QueryRequest, QueryResponse, RagConfig, RagError, RagService, RagServiceFactory,
    UNRECOGNIZED_ANSWER,
};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::events::{spawn_reporting, WorkspaceEvent};

/// Reply placed in the conversation when a query fails
pub const QUERY_ERROR_REPLY: &str = "Sorry, I encountered an error processing your request.";

/// Immutable view of the workspace at one revision
#[derive(Debug, Clone)]
pub struct WorkspaceSnapshot {
    pub documents: Arc<Vec<Document>>,
    pub conversations: Arc<HashMap<Uuid, DocumentThreads>>,
    pub selected_document_id: Option<Uuid>,
    pub revision: u64,
}

pub struct Workspace {
    collection_name: String,
    rag: Arc<dyn RagService>,
    documents: DocumentRegistry,
    conversations: ConversationStore,
    selected_document_id: Option<Uuid>,
    events_tx: mpsc::UnboundedSender<WorkspaceEvent>,
    events_rx: mpsc::UnboundedReceiver<WorkspaceEvent>,
    in_flight: usize,
    revision: watch::Sender<u64>,
}

impl Workspace {
    /// Create an empty workspace indexing into `collection_name`
    pub fn new(collection_name: impl Into<String>, rag: Arc<dyn RagService>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (revision, _) = watch::channel(0);

        Self {
            collection_name: collection_name.into(),
            rag,
            documents: DocumentRegistry::new(),
            conversations: ConversationStore::new(),
            selected_document_id: None,
            events_tx,
            events_rx,
            in_flight: 0,
            revision,
        }
    }

    /// Create a workspace with the RAG provider named in the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let rag = RagServiceFactory::create(RagConfig::from_app_config(config))
            .map_err(|e| Error::Unexpected(e.into()))?;
        Ok(Self::new(config.collection_name.clone(), Arc::from(rag)))
    }

    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    pub fn rag(&self) -> &Arc<dyn RagService> {
        &self.rag
    }

    pub fn documents(&self) -> &DocumentRegistry {
        &self.documents
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn document(&self, document_id: Uuid) -> Option<&Document> {
        self.documents.get(document_id)
    }

    pub fn selected_document_id(&self) -> Option<Uuid> {
        self.selected_document_id
    }

    pub fn selected_document(&self) -> Option<&Document> {
        self.selected_document_id
            .and_then(|id| self.documents.get(id))
    }

    /// Remote calls dispatched but not yet received back
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight == 0
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Watch the revision counter; it moves on every state change
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            documents: self.documents.snapshot(),
            conversations: self.conversations.snapshot(),
            selected_document_id: self.selected_document_id,
            revision: self.revision(),
        }
    }

    /// Register uploaded files and start indexing each of them.
    ///
    /// Every accepted file is registered and already `processing` when this
    /// returns; `pending` is only held between the two steps. The revision
    /// moves once for the whole batch. Files with an unusable name are
    /// skipped.
    pub fn submit<I, F>(&mut self, files: I) -> Vec<Uuid>
    where
        I: IntoIterator<Item = F>,
        F: Into<UploadFile>,
    {
        let mut registered = Vec::new();
        for file in files {
            let file = file.into();
            match self.documents.register(&file) {
                Ok(document) => registered.push(document.id),
                Err(e) => {
                    tracing::warn!(file_name = %file.name, error = %e, "Skipping uploaded file");
                }
            }
        }

        if registered.is_empty() {
            return registered;
        }

        for &document_id in &registered {
            if let Err(e) = self.dispatch_index(document_id) {
                tracing::warn!(document_id = %document_id, error = %e, "Failed to dispatch index build");
            }
        }
        self.touch();
        registered
    }

    /// Try indexing a failed document again
    pub fn retry_upload(&mut self, document_id: Uuid) -> Result<()> {
        self.documents.retry(document_id)?;
        let dispatched = self.dispatch_index(document_id);
        self.touch();
        dispatched
    }

    /// Move the selection cursor; unknown ids leave it where it is
    pub fn select_document(&mut self, document_id: Uuid) -> bool {
        if !self.documents.contains(document_id) {
            tracing::debug!(document_id = %document_id, "Ignoring selection of unknown document");
            return false;
        }
        if self.selected_document_id != Some(document_id) {
            self.selected_document_id = Some(document_id);
            self.touch();
        }
        true
    }

    /// Start a new conversation for a document and make it active
    pub fn create_conversation(&mut self, document_id: Uuid) -> Option<Uuid> {
        let title = self.documents.get(document_id)?.title.clone();

        let conversation_id = self
            .conversations
            .add_conversation(Conversation::started_by_user(document_id, &title));
        self.selected_document_id = Some(document_id);
        self.touch();
        Some(conversation_id)
    }

    pub fn select_conversation(&mut self, document_id: Uuid, conversation_id: Uuid) -> bool {
        match self
            .conversations
            .select_conversation(document_id, conversation_id)
        {
            Ok(()) => {
                self.touch();
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring conversation selection");
                false
            }
        }
    }

    /// Append a user message and ask the service about it.
    ///
    /// Returns the id of the appended message, or `None` when the target does
    /// not exist or the text is blank; nothing changes in that case.
    pub fn send_message(
        &mut self,
        document_id: Uuid,
        conversation_id: Uuid,
        text: &str,
    ) -> Option<Uuid> {
        let title = match (
            self.documents.get(document_id),
            self.conversations.get(document_id, conversation_id),
        ) {
            (Some(document), Some(_)) => document.title.clone(),
            _ => {
                tracing::debug!(
                    document_id = %document_id,
                    conversation_id = %conversation_id,
                    "Ignoring message for unknown conversation"
                );
                return None;
            }
        };

        let message = match Message::new_user(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring message");
                return None;
            }
        };

        let message_id = match self
            .conversations
            .append_message(document_id, conversation_id, message)
        {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to append message");
                return None;
            }
        };
        self.touch();

        let request = QueryRequest::for_document(text, &title, &self.collection_name);
        let rag = Arc::clone(&self.rag);
        let events = self.events_tx.clone();
        self.in_flight += 1;

        tracing::debug!(
            document_id = %document_id,
            conversation_id = %conversation_id,
            message_id = %message_id,
            "Dispatching query"
        );
        spawn_reporting(async move { rag.query(request).await }, move |result| {
            let _ = events.send(WorkspaceEvent::QueryCompleted {
                document_id,
                conversation_id,
                message_id,
                result,
            });
        });

        Some(message_id)
    }

    /// Send to the document's active conversation
    pub fn send_to_active(&mut self, document_id: Uuid, text: &str) -> Option<Uuid> {
        let conversation_id = self.conversations.active_conversation_id(document_id)?;
        self.send_message(document_id, conversation_id, text)
    }

    /// Wait for the next finished remote call.
    ///
    /// Returns `None` immediately when nothing is in flight.
    pub async fn next_event(&mut self) -> Option<WorkspaceEvent> {
        if self.in_flight == 0 {
            return None;
        }
        let event = self.events_rx.recv().await?;
        self.in_flight -= 1;
        Some(event)
    }

    /// Apply every outstanding completion, waiting for the ones still running
    pub async fn settle(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.next_event().await {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Apply the completions that have already arrived without waiting
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while self.in_flight > 0 {
            match self.events_rx.try_recv() {
                Ok(event) => {
                    self.in_flight -= 1;
                    self.apply(event);
                    applied += 1;
                }
                Err(_) => break,
            }
        }
        applied
    }

    /// Fold a remote-call outcome into the workspace state
    pub fn apply(&mut self, event: WorkspaceEvent) {
        match event {
            WorkspaceEvent::IndexCompleted {
                document_id,
                result: Ok(()),
            } => self.complete_indexing(document_id),
            WorkspaceEvent::IndexCompleted {
                document_id,
                result: Err(error),
            } => self.fail_indexing(document_id, &error),
            WorkspaceEvent::QueryCompleted {
                document_id,
                conversation_id,
                message_id,
                result,
            } => self.place_answer(document_id, conversation_id, message_id, result),
        }
        self.touch();
    }

    fn dispatch_index(&mut self, document_id: Uuid) -> Result<()> {
        let request = self
            .documents
            .begin_indexing(document_id, &self.collection_name)?;
        let rag = Arc::clone(&self.rag);
        let events = self.events_tx.clone();
        self.in_flight += 1;

        tracing::debug!(
            document_id = %document_id,
            act_name = %request.act_name,
            collection = %request.collection_name,
            "Dispatching index build"
        );
        spawn_reporting(async move { rag.build_index(request).await }, move |result| {
            let _ = events.send(WorkspaceEvent::IndexCompleted { document_id, result });
        });
        Ok(())
    }

    fn complete_indexing(&mut self, document_id: Uuid) {
        if let Err(e) = self.documents.mark_completed(document_id) {
            tracing::warn!(document_id = %document_id, error = %e, "Dropping index completion");
            return;
        }

        let Some(title) = self.documents.get(document_id).map(|d| d.title.clone()) else {
            return;
        };
        self.conversations
            .add_conversation(Conversation::first_for_document(document_id, &title));
        self.selected_document_id = Some(document_id);

        tracing::info!(document_id = %document_id, title = %title, "Document ready");
    }

    fn fail_indexing(&mut self, document_id: Uuid, error: &RagError) {
        tracing::warn!(document_id = %document_id, error = %error, "Index build failed");

        if let Err(e) = self.documents.mark_failed(document_id) {
            tracing::warn!(document_id = %document_id, error = %e, "Dropping index failure");
        }
    }

    fn place_answer(
        &mut self,
        document_id: Uuid,
        conversation_id: Uuid,
        message_id: Uuid,
        result: std::result::Result<QueryResponse, RagError>,
    ) {
        let content = match result {
            Ok(response) => reply_content(response.answer),
            Err(error) => {
                tracing::warn!(
                    document_id = %document_id,
                    message_id = %message_id,
                    error = %error,
                    "Query failed"
                );
                MessageContent::from(QUERY_ERROR_REPLY)
            }
        };

        let reply = Message::reply_to(message_id, content);
        if let Err(e) = self
            .conversations
            .insert_reply(document_id, conversation_id, reply)
        {
            tracing::warn!(message_id = %message_id, error = %e, "Dropping reply");
        }
    }

    fn touch(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

/// Message content for a parsed answer
fn reply_content(answer: Answer) -> MessageContent {
    match answer {
        Answer::Sections(sections) => MessageContent::Sections(sections),
        Answer::Text(text) => MessageContent::Text(text),
        Answer::Unrecognized(value) => {
            tracing::warn!(answer = %value, "Unrecognized answer shape");
            MessageContent::from(UNRECOGNIZED_ANSWER)
        }
    }
}
