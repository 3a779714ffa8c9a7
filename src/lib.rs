//! # Chess Copilot
//!
//! Streaming client for a chess game-history copilot.
//!
//! The copilot asks a hosted agent about a player's games and shows the
//! answer as it streams in. Answers can reference a game with a
//! `GAME_ID: <id>` marker; the first reference selects the game shown on
//! the board.
//!
//! ## Features
//!
//! - **Stream assembly**: server-sent events decoded line by line, deltas
//!   accumulated, the aggregate answer authoritative
//! - **Sessions**: chat history and the selected game persisted in `SQLite`
//! - **Analyst**: natural-language questions translated into SQL, optionally
//!   executed with a result row selectable as the board game
//! - **Forecast**: daily rating history and a model forecast with bounds
//! - **Openings**: answers grounded on a searched document library
//!
//! ## Example
//!
//! ```
//! use chess_copilot::sse::events;
//! use chess_copilot::agent::drive_display;
//!
//! let body = "event: response.text.delta\ndata: {\"text\":\"See GAME_ID: g42\"}\n\n";
//! let lines = body.lines().map(Ok::<_, std::io::Error>);
//! let exchange = drive_display(events(lines), &mut |_: &str| {});
//! assert_eq!(exchange.game_id.as_deref(), Some("g42"));
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
pub mod service;
pub mod sse;
pub mod storage;

// Re-export commonly used types at crate root
pub use error::{Error, Result, ServiceError};

// Re-export core domain types
pub use core::{ChatMessage, Role, SessionSummary};

// Re-export stream assembly types
pub use agent::{Completion, DisplaySink, Exchange, board_embed_url, drive_display, extract_game_id};
pub use sse::{ProtocolEvent, event_stream, events};

// Re-export storage types
pub use storage::{DEFAULT_DB_PATH, SessionStore, SqliteStore};

// Re-export service types
pub use service::ServiceConfig;

// Re-export CLI types
pub use cli::{Cli, Commands, OutputFormat};
