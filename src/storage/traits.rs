//! Storage trait definition.
//!
//! Defines the interface for session persistence so the CLI does not
//! depend on a concrete backend.

use crate::core::{ChatMessage, SessionSummary};
use crate::error::Result;
use serde::Serialize;

/// Trait for persistent session storage.
///
/// A session is created implicitly by its first write. Messages are
/// returned in the order they were appended.
pub trait SessionStore {
    /// Initializes storage (creates schema).
    ///
    /// Should be idempotent - safe to call multiple times.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    fn init(&mut self) -> Result<()>;

    /// Checks if storage is initialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the check cannot be performed.
    fn is_initialized(&self) -> Result<bool>;

    /// Deletes all sessions and messages but keeps the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if deletion fails.
    fn reset(&mut self) -> Result<()>;

    /// Appends a message to a session, creating the session if needed.
    ///
    /// Returns the assigned message id.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be inserted.
    fn append_message(&mut self, session: &str, message: &ChatMessage) -> Result<i64>;

    /// Stores a question, its answer and the optional game reference as
    /// one atomic write.
    ///
    /// # Errors
    ///
    /// Returns an error if any part fails; nothing is stored in that case.
    fn record_exchange(
        &mut self,
        session: &str,
        question: &ChatMessage,
        answer: &ChatMessage,
        game_id: Option<&str>,
    ) -> Result<()>;

    /// Returns all messages of a session, oldest first.
    ///
    /// An unknown session has no messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn messages(&self, session: &str) -> Result<Vec<ChatMessage>>;

    /// Returns the game currently selected for a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn selected_game(&self, session: &str) -> Result<Option<String>>;

    /// Records the selected game, creating the session if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    fn set_selected_game(&mut self, session: &str, game_id: &str) -> Result<()>;

    /// Lists sessions, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn list_sessions(&self) -> Result<Vec<SessionSummary>>;

    /// Deletes a session and its messages.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::StorageError::SessionNotFound`] if the
    /// session does not exist.
    fn delete_session(&mut self, session: &str) -> Result<()>;

    /// Returns storage statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if statistics cannot be computed.
    fn stats(&self) -> Result<StorageStats>;
}

/// Storage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Number of sessions stored.
    pub session_count: usize,
    /// Total number of messages across all sessions.
    pub message_count: usize,
    /// Schema version.
    pub schema_version: u32,
    /// Database file size in bytes (if applicable).
    pub db_size: Option<u64>,
}
