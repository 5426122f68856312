//! Conversation store
//!
//! Conversations are grouped per document, newest last, together with the
//! document's active-conversation cursor. The map sits behind an `Arc` and is
//! only changed through `Arc::make_mut`, so previously taken snapshots stay
//! valid and unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use kanun_common::{Error, Result};
use uuid::Uuid;

use crate::domain::entities::{Conversation, Message};

/// Conversations of one document plus its active-conversation cursor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentThreads {
    pub conversations: Vec<Conversation>,
    pub active_conversation_id: Option<Uuid>,
}

impl DocumentThreads {
    pub fn get(&self, conversation_id: Uuid) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == conversation_id)
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.active_conversation_id.and_then(|id| self.get(id))
    }

    fn get_mut(&mut self, conversation_id: Uuid) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == conversation_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    threads: Arc<HashMap<Uuid, DocumentThreads>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a conversation to its document's list and make it active
    pub fn add_conversation(&mut self, conversation: Conversation) -> Uuid {
        let conversation_id = conversation.id;
        let document_id = conversation.document_id;

        let threads = Arc::make_mut(&mut self.threads)
            .entry(document_id)
            .or_default();
        threads.conversations.push(conversation);
        threads.active_conversation_id = Some(conversation_id);

        tracing::info!(
            document_id = %document_id,
            conversation_id = %conversation_id,
            total = threads.conversations.len(),
            "Conversation created"
        );
        conversation_id
    }

    /// Conversations for a document in creation order; empty if it has none
    pub fn conversations(&self, document_id: Uuid) -> &[Conversation] {
        self.threads
            .get(&document_id)
            .map(|t| t.conversations.as_slice())
            .unwrap_or(&[])
    }

    pub fn threads(&self, document_id: Uuid) -> Option<&DocumentThreads> {
        self.threads.get(&document_id)
    }

    pub fn get(&self, document_id: Uuid, conversation_id: Uuid) -> Option<&Conversation> {
        self.threads
            .get(&document_id)
            .and_then(|t| t.get(conversation_id))
    }

    pub fn active_conversation_id(&self, document_id: Uuid) -> Option<Uuid> {
        self.threads
            .get(&document_id)
            .and_then(|t| t.active_conversation_id)
    }

    pub fn active_conversation(&self, document_id: Uuid) -> Option<&Conversation> {
        self.threads.get(&document_id).and_then(DocumentThreads::active)
    }

    pub fn has_conversations(&self, document_id: Uuid) -> bool {
        !self.conversations(document_id).is_empty()
    }

    /// Point the document's cursor at one of its own conversations
    pub fn select_conversation(&mut self, document_id: Uuid, conversation_id: Uuid) -> Result<()> {
        if self.get(document_id, conversation_id).is_none() {
            return Err(Self::missing(document_id, conversation_id));
        }
        if self.active_conversation_id(document_id) == Some(conversation_id) {
            return Ok(());
        }

        if let Some(threads) = Arc::make_mut(&mut self.threads).get_mut(&document_id) {
            threads.active_conversation_id = Some(conversation_id);
        }
        tracing::debug!(document_id = %document_id, conversation_id = %conversation_id, "Active conversation changed");
        Ok(())
    }

    /// Append a user message to the end of a conversation
    pub fn append_message(
        &mut self,
        document_id: Uuid,
        conversation_id: Uuid,
        message: Message,
    ) -> Result<Uuid> {
        let message_id = message.id;
        self.conversation_mut(document_id, conversation_id)?.push(message);
        Ok(message_id)
    }

    /// Place an assistant reply after the question it answers.
    ///
    /// Whatever else was appended in the meantime stays where it is.
    pub fn insert_reply(
        &mut self,
        document_id: Uuid,
        conversation_id: Uuid,
        reply: Message,
    ) -> Result<usize> {
        let conversation = self.conversation_mut(document_id, conversation_id)?;
        let position = conversation.place_reply(reply);

        tracing::debug!(
            document_id = %document_id,
            conversation_id = %conversation_id,
            position,
            "Reply stored"
        );
        Ok(position)
    }

    /// Cheap, immutable view of every document's conversations
    pub fn snapshot(&self) -> Arc<HashMap<Uuid, DocumentThreads>> {
        Arc::clone(&self.threads)
    }

    fn conversation_mut(
        &mut self,
        document_id: Uuid,
        conversation_id: Uuid,
    ) -> Result<&mut Conversation> {
        if self.get(document_id, conversation_id).is_none() {
            return Err(Self::missing(document_id, conversation_id));
        }

        Arc::make_mut(&mut self.threads)
            .get_mut(&document_id)
            .and_then(|t| t.get_mut(conversation_id))
            .ok_or_else(|| Self::missing(document_id, conversation_id))
    }

    fn missing(document_id: Uuid, conversation_id: Uuid) -> Error {
        Error::NotFound(format!(
            "Conversation {} not found for document {}",
            conversation_id, document_id
        ))
    }
}
