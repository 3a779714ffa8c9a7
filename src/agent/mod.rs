//! Conversational agent: streamed answers assembled for display.
//!
//! The agent answers over server-sent events. Deltas are appended to a
//! running answer and published as they arrive; the aggregate response
//! event replaces the running answer. The finished text is scanned for a
//! `GAME_ID` reference that selects the game shown on the board.

pub mod client;
pub mod display;
pub mod payload;
pub mod reference;
pub mod request;

pub use client::{AgentClient, converse};
pub use display::{
    Assembler, Completion, DisplaySink, Exchange, drive_display, drive_display_stream,
};
pub use payload::{AgentEvent, AggregateResponse, RESPONSE_EVENT, TEXT_DELTA_EVENT, TextDelta};
pub use reference::{board_embed_url, extract_game_id};
pub use request::{AgentRequest, Message};
