//! Storage layer for chat sessions.
//!
//! Persists conversation history and the selected game per session in
//! `SQLite`, so the agent always receives the full history and the board
//! survives between invocations.

pub mod schema;
pub mod sqlite;
pub mod traits;

pub use schema::{CURRENT_SCHEMA_VERSION, SCHEMA_SQL};
pub use sqlite::SqliteStore;
pub use traits::{SessionStore, StorageStats};

/// Default database path relative to the working directory.
pub const DEFAULT_DB_PATH: &str = ".chess-copilot/sessions.db";
