//! Typed agent event payloads.
//!
//! Every protocol event is classified by name and its data validated
//! against the shape for that name. Unknown names are not an error.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::ServiceError;
use crate::sse::ProtocolEvent;

/// Event name carrying an incremental text fragment.
pub const TEXT_DELTA_EVENT: &str = "response.text.delta";

/// Event name carrying the aggregate final response.
pub const RESPONSE_EVENT: &str = "response";

/// Payload of a [`TEXT_DELTA_EVENT`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextDelta {
    /// Fragment to append to the running answer.
    pub text: String,
}

/// Payload of a [`RESPONSE_EVENT`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AggregateResponse {
    /// The complete response message.
    #[serde(default)]
    pub response: ResponseMessage,
}

/// Message body inside an aggregate response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResponseMessage {
    /// Content entries in order.
    #[serde(default)]
    pub content: Vec<ResponseContent>,
}

/// One content entry of the aggregate response.
///
/// Only entries typed `"text"` contribute to the answer; tool calls,
/// tool results and untyped entries are carried but ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResponseContent {
    /// Entry type, e.g. `text`, `tool_use`, `thinking`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Text value for `text` entries.
    #[serde(default)]
    pub text: Option<String>,
}

impl ResponseContent {
    /// Returns the text of a `text` entry.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self.kind.as_deref() {
            Some("text") => Some(self.text.as_deref().unwrap_or_default()),
            _ => None,
        }
    }
}

impl AggregateResponse {
    /// Joins all text entries with `\n`, or `None` if there are none.
    #[must_use]
    pub fn final_text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .response
            .content
            .iter()
            .filter_map(ResponseContent::as_text)
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }
}

/// A classified agent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    /// Incremental text.
    TextDelta(TextDelta),
    /// Authoritative final response.
    Response(AggregateResponse),
    /// An event this protocol does not define.
    Unknown {
        /// The event name (`None` for unnamed events).
        name: Option<String>,
    },
}

impl AgentEvent {
    /// Classifies and validates a protocol event.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::MalformedPayload`] when a known event's data
    /// does not parse as its payload shape.
    pub fn parse(event: &ProtocolEvent) -> Result<Self, ServiceError> {
        match event.event_name.as_deref() {
            Some(TEXT_DELTA_EVENT) => parse_json(event).map(Self::TextDelta),
            Some(RESPONSE_EVENT) => parse_json(event).map(Self::Response),
            _ => Ok(Self::Unknown {
                name: event.event_name.clone(),
            }),
        }
    }
}

fn parse_json<T: DeserializeOwned>(event: &ProtocolEvent) -> Result<T, ServiceError> {
    serde_json::from_str(&event.data).map_err(|e| ServiceError::MalformedPayload {
        event: event.name().to_string(),
        reason: e.to_string(),
    })
}
