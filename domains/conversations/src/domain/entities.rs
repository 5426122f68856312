//! Domain entities for Conversations domain
//!
//! A conversation is a thread of messages owned by exactly one document.
//! Messages are immutable once created; assistant replies produced by a query
//! remember which user message they answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kanun_common::{Error, Result};
use kanun_rag::{ReferencedChunk, SectionFragment};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// Message body: plain text or structured section fragments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Sections(Vec<SectionFragment>),
}

impl MessageContent {
    /// Display text; sections render one per line
    pub fn render(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Sections(sections) => sections
                .iter()
                .map(SectionFragment::render)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Sections(_) => None,
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        MessageContent::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

impl From<Vec<SectionFragment>> for MessageContent {
    fn from(sections: Vec<SectionFragment>) -> Self {
        MessageContent::Sections(sections)
    }
}

/// Citation attached to a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Citation(String),
    Chunk(ReferencedChunk),
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reference::Citation(text) => write!(f, "{}", text),
            Reference::Chunk(chunk) => write!(f, "{}", chunk),
        }
    }
}

/// Message entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: MessageContent,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    /// User message this assistant reply answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<Uuid>,
}

impl Message {
    /// Create a new user message
    pub fn new_user(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(Error::Validation(
                "Message content cannot be empty or whitespace-only".to_string(),
            ));
        }

        Ok(Self::build(MessageRole::User, text.into(), None))
    }

    /// Create an assistant message that is not a reply (greetings, notices)
    pub fn new_assistant(content: impl Into<MessageContent>) -> Self {
        Self::build(MessageRole::Assistant, content.into(), None)
    }

    /// Create the assistant reply to a user message
    pub fn reply_to(user_message_id: Uuid, content: impl Into<MessageContent>) -> Self {
        Self::build(MessageRole::Assistant, content.into(), Some(user_message_id))
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }

    fn build(role: MessageRole, content: MessageContent, in_reply_to: Option<Uuid>) -> Self {
        Message {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: Utc::now(),
            references: None,
            in_reply_to,
        }
    }
}

/// Conversation entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub document_id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a conversation seeded with a single assistant greeting
    pub fn new(document_id: Uuid, title: String, greeting: impl Into<MessageContent>) -> Self {
        Conversation {
            id: Uuid::new_v4(),
            document_id,
            title,
            messages: vec![Message::new_assistant(greeting)],
            created_at: Utc::now(),
        }
    }

    /// First conversation, created once the document has been indexed
    pub fn first_for_document(document_id: Uuid, document_title: &str) -> Self {
        Self::new(
            document_id,
            format!("Chat about {}", document_title),
            format!(
                "Document \"{}\" has been processed. What would you like to know?",
                document_title
            ),
        )
    }

    /// Conversation started explicitly by the user
    pub fn started_by_user(document_id: Uuid, document_title: &str) -> Self {
        Self::new(
            document_id,
            format!("New Chat {}", document_title),
            "Start a new conversation about this document.",
        )
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn position_of(&self, message_id: Uuid) -> Option<usize> {
        self.messages.iter().position(|m| m.id == message_id)
    }

    /// Append a message at the end of the thread
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Place an assistant reply directly after the user message it answers.
    ///
    /// Replies that answer nothing, or whose question is not in this thread,
    /// go to the end. Returns the index the reply landed at.
    pub fn place_reply(&mut self, reply: Message) -> usize {
        let slot = reply
            .in_reply_to
            .and_then(|question| self.position_of(question))
            .map(|position| position + 1)
            .unwrap_or(self.messages.len());
        self.messages.insert(slot, reply);
        slot
    }
}
