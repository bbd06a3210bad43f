//! Message types for conversations.

use chrono::{DateTime, Utc};
use oryjin_core::MessageId;
use serde::{Deserialize, Serialize};

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User/human message.
    User,
    /// Assistant message.
    Assistant,
}

/// A message in a conversation.
///
/// Messages are append-only within a thread: once recorded they are never
/// edited or removed, so the transcript doubles as an audit trail of what
/// each workflow step did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier.
    pub id: MessageId,
    /// Message role.
    pub role: MessageRole,
    /// Message content.
    pub content: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Creates a new message.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Returns true if this message was written by the assistant.
    #[must_use]
    pub fn is_assistant(&self) -> bool {
        self.role == MessageRole::Assistant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_creation() {
        let msg = Message::user("Hello!");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.content, "Hello!");
    }

    #[test]
    fn assistant_role_check() {
        assert!(Message::assistant("Done.").is_assistant());
        assert!(!Message::user("hi").is_assistant());
    }

    #[test]
    fn message_serde_roundtrip() {
        let msg = Message::assistant("Here's the result:");

        let json = serde_json::to_string(&msg).expect("serialize");
        let parsed: Message = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(msg.id, parsed.id);
        assert_eq!(msg.content, parsed.content);
        assert_eq!(msg.role, parsed.role);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&MessageRole::Assistant).expect("serialize");
        assert_eq!(json, "\"assistant\"");
    }
}
