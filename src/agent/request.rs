//! Agent request body.

use serde::Serialize;

use crate::core::{ChatMessage, Role};

/// A text content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
}

/// One message of the conversation sent to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    /// Author role.
    pub role: Role,
    /// Content items.
    pub content: Vec<ContentItem>,
}

impl Message {
    /// Creates a single-text message.
    #[must_use]
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: vec![ContentItem::Text { text: text.into() }],
        }
    }
}

impl From<&ChatMessage> for Message {
    fn from(message: &ChatMessage) -> Self {
        Self::text(message.role, message.content.clone())
    }
}

/// Tool selection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolChoice {
    /// Mode name.
    #[serde(rename = "type")]
    pub kind: ToolChoiceKind,
}

/// Tool selection modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoiceKind {
    /// The agent decides which tools to call.
    #[default]
    Auto,
}

/// Body of an agent run request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentRequest {
    /// Full conversation, oldest first.
    pub messages: Vec<Message>,
    /// Tool selection mode.
    pub tool_choice: ToolChoice,
}

impl AgentRequest {
    /// Builds a request from stored chat history.
    #[must_use]
    pub fn from_history(history: &[ChatMessage]) -> Self {
        Self {
            messages: history.iter().map(Message::from).collect(),
            tool_choice: ToolChoice {
                kind: ToolChoiceKind::Auto,
            },
        }
    }
}
