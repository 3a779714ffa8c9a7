//! Decoded protocol events.

use serde::Serialize;

/// Event name assumed when a block carries no `event:` line.
pub const DEFAULT_EVENT_NAME: &str = "message";

/// One blank-line-terminated block of the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolEvent {
    /// Value of the last `event:` line in the block, if any.
    pub event_name: Option<String>,
    /// All `data:` payloads of the block joined with `\n`.
    pub data: String,
}

impl ProtocolEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(event_name: Option<String>, data: impl Into<String>) -> Self {
        Self {
            event_name,
            data: data.into(),
        }
    }

    /// Creates a named event.
    #[must_use]
    pub fn named(event_name: impl Into<String>, data: impl Into<String>) -> Self {
        Self::new(Some(event_name.into()), data)
    }

    /// Returns the event name, falling back to [`DEFAULT_EVENT_NAME`].
    #[must_use]
    pub fn name(&self) -> &str {
        self.event_name.as_deref().unwrap_or(DEFAULT_EVENT_NAME)
    }
}
