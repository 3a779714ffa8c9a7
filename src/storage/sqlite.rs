//! `SQLite` session store.
//!
//! Provides persistent chat history with transactional writes.

// SQLite stores all integers as i64. Counts are non-negative.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use crate::core::message::current_timestamp;
use crate::core::{ChatMessage, Role, SessionSummary};
use crate::error::{Result, StorageError};
use crate::storage::schema::{
    CHECK_SCHEMA_SQL, CURRENT_SCHEMA_VERSION, GET_VERSION_SQL, SCHEMA_SQL, SET_VERSION_SQL,
    UPSERT_SESSION_SQL,
};
use crate::storage::traits::{SessionStore, StorageStats};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

/// SQLite-based session store.
///
/// # Examples
///
/// ```
/// use chess_copilot::core::ChatMessage;
/// use chess_copilot::storage::{SessionStore, SqliteStore};
///
/// let mut store = SqliteStore::in_memory().unwrap();
/// store.init().unwrap();
/// store.append_message("default", &ChatMessage::user("hi")).unwrap();
/// assert_eq!(store.messages("default").unwrap().len(), 1);
/// ```
pub struct SqliteStore {
    conn: Connection,
    /// Path to the database file (None for in-memory).
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens or creates a database at the given path.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Database(e.to_string()))?;
        }

        let conn = Connection::open(&path).map_err(StorageError::from)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])
            .map_err(StorageError::from)?;
        let _: String = conn
            .query_row("PRAGMA journal_mode = WAL;", [], |row| row.get(0))
            .map_err(StorageError::from)?;

        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Creates an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        conn.execute("PRAGMA foreign_keys = ON;", [])
            .map_err(StorageError::from)?;

        Ok(Self { conn, path: None })
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn get_schema_version(&self) -> Result<Option<u32>> {
        let version: Option<String> = self
            .conn
            .query_row(GET_VERSION_SQL, [], |row| row.get(0))
            .optional()
            .map_err(StorageError::from)?;

        Ok(version.and_then(|v| v.parse().ok()))
    }

    fn set_schema_version(&self, version: u32) -> Result<()> {
        self.conn
            .execute(SET_VERSION_SQL, params![version.to_string()])
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(StorageError::from)?;
        Ok(n as usize)
    }
}

impl SessionStore for SqliteStore {
    fn init(&mut self) -> Result<()> {
        let is_init: i64 = self
            .conn
            .query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))
            .map_err(StorageError::from)?;

        if is_init == 0 {
            self.conn
                .execute_batch(SCHEMA_SQL)
                .map_err(StorageError::from)?;
            self.set_schema_version(CURRENT_SCHEMA_VERSION)?;
        }

        Ok(())
    }

    fn is_initialized(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(CHECK_SCHEMA_SQL, [], |row| row.get(0))
            .map_err(StorageError::from)?;
        Ok(count > 0)
    }

    fn reset(&mut self) -> Result<()> {
        self.conn
            .execute_batch(
                r"
            DELETE FROM messages;
            DELETE FROM sessions;
            ",
            )
            .map_err(StorageError::from)?;
        Ok(())
    }

    fn append_message(&mut self, session: &str, message: &ChatMessage) -> Result<i64> {
        let now = current_timestamp();
        let tx = self.conn.transaction().map_err(StorageError::from)?;
        tx.execute(UPSERT_SESSION_SQL, params![session, now])
            .map_err(StorageError::from)?;
        let id = insert_message(&tx, session, message, now)?;
        tx.commit().map_err(StorageError::from)?;

        Ok(id)
    }

    fn record_exchange(
        &mut self,
        session: &str,
        question: &ChatMessage,
        answer: &ChatMessage,
        game_id: Option<&str>,
    ) -> Result<()> {
        let now = current_timestamp();
        let tx = self.conn.transaction().map_err(StorageError::from)?;
        tx.execute(UPSERT_SESSION_SQL, params![session, now])
            .map_err(StorageError::from)?;
        insert_message(&tx, session, question, now)?;
        insert_message(&tx, session, answer, now)?;
        if let Some(game_id) = game_id {
            tx.execute(
                "UPDATE sessions SET selected_game_id = ? WHERE id = ?",
                params![game_id, session],
            )
            .map_err(StorageError::from)?;
        }
        tx.commit().map_err(StorageError::from)?;
        Ok(())
    }

    fn messages(&self, session: &str) -> Result<Vec<ChatMessage>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT role, content, created_at FROM messages WHERE session_id = ? ORDER BY id",
            )
            .map_err(StorageError::from)?;

        let rows = stmt
            .query_map(params![session], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;

        rows.into_iter()
            .map(|(role, content, created_at)| -> Result<ChatMessage> {
                let role = role
                    .parse::<Role>()
                    .map_err(StorageError::Serialization)?;
                Ok(ChatMessage {
                    role,
                    content,
                    created_at,
                })
            })
            .collect()
    }

    fn selected_game(&self, session: &str) -> Result<Option<String>> {
        let game: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT selected_game_id FROM sessions WHERE id = ?",
                params![session],
                |row| row.get(0),
            )
            .optional()
            .map_err(StorageError::from)?;
        Ok(game.flatten())
    }

    fn set_selected_game(&mut self, session: &str, game_id: &str) -> Result<()> {
        let now = current_timestamp();
        let tx = self.conn.transaction().map_err(StorageError::from)?;
        tx.execute(UPSERT_SESSION_SQL, params![session, now])
            .map_err(StorageError::from)?;
        tx.execute(
            "UPDATE sessions SET selected_game_id = ? WHERE id = ?",
            params![game_id, session],
        )
        .map_err(StorageError::from)?;
        tx.commit().map_err(StorageError::from)?;
        Ok(())
    }

    fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut stmt = self
            .conn
            .prepare(
                r"
                SELECT s.id, COUNT(m.id), s.selected_game_id, s.updated_at
                FROM sessions s
                LEFT JOIN messages m ON m.session_id = s.id
                GROUP BY s.id
                ORDER BY s.updated_at DESC, s.id
            ",
            )
            .map_err(StorageError::from)?;

        let sessions = stmt
            .query_map([], |row| {
                Ok(SessionSummary {
                    id: row.get(0)?,
                    message_count: row.get::<_, i64>(1)? as usize,
                    selected_game_id: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            })
            .map_err(StorageError::from)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)?;

        Ok(sessions)
    }

    fn delete_session(&mut self, session: &str) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM sessions WHERE id = ?", params![session])
            .map_err(StorageError::from)?;
        if deleted == 0 {
            return Err(StorageError::SessionNotFound {
                id: session.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn stats(&self) -> Result<StorageStats> {
        let db_size = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok().map(|m| m.len()));

        Ok(StorageStats {
            session_count: self.count("SELECT COUNT(*) FROM sessions")?,
            message_count: self.count("SELECT COUNT(*) FROM messages")?,
            schema_version: self.get_schema_version()?.unwrap_or(0),
            db_size,
        })
    }
}

/// Inserts one message; a zero timestamp is replaced by `now`.
fn insert_message(conn: &Connection, session: &str, message: &ChatMessage, now: i64) -> Result<i64> {
    let created_at = if message.created_at > 0 {
        message.created_at
    } else {
        now
    };
    conn.execute(
        "INSERT INTO messages (session_id, role, content, created_at) VALUES (?, ?, ?, ?)",
        params![session, message.role.as_str(), message.content, created_at],
    )
    .map_err(StorageError::from)?;
    Ok(conn.last_insert_rowid())
}
