//! UI-agnostic conversation state types
//!
//! This module contains the data structures shared by the store, the delivery
//! pipeline and any frontend. None of them depend on a UI framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Greeting seeded into the conversation that exists at process start
pub const WELCOME_GREETING: &str = "Hey there 👋 I’m your CatGPT bot. Ask me about SFWE classes, clubs, scholarships, or anything else!";

/// Greeting seeded into every conversation created with "new chat"
pub const NEW_CHAT_GREETING: &str = "New conversation started. How can I help?";

pub const WELCOME_TITLE: &str = "Welcome";
pub const NEW_CHAT_TITLE: &str = "New chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(Uuid);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// A single message in a conversation transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub role: ChatRole,
    pub content: String,
    pub time: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            time: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }
}

/// A conversation and its ordered transcript.
///
/// `messages` is never empty: every constructor seeds one assistant greeting.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
    /// Set while an assistant reply is being filled in
    pub streaming: bool,
    /// Backend session handle returned by the remote endpoint
    pub session_id: Option<String>,
}

impl Conversation {
    pub fn new(title: impl Into<String>, greeting: impl Into<String>) -> Self {
        Self {
            id: ConversationId::new(),
            title: title.into(),
            updated_at: Utc::now(),
            messages: vec![ChatMessage::assistant(greeting)],
            streaming: false,
            session_id: None,
        }
    }

    /// The conversation present when the application starts
    pub fn welcome() -> Self {
        Self::new(WELCOME_TITLE, WELCOME_GREETING)
    }

    /// A conversation created by the "new chat" action
    pub fn fresh() -> Self {
        Self::new(NEW_CHAT_TITLE, NEW_CHAT_GREETING)
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn message(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }
}
