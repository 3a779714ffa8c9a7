//! Core domain models for chess-copilot.
//!
//! Conversation messages and session summaries shared by the agent
//! client, the session store, and the CLI.

pub mod message;

pub use message::{ChatMessage, Role, SessionSummary};
