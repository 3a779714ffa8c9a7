//! Server-sent-event framing.
//!
//! Turns a raw streamed response body into discrete [`ProtocolEvent`]s.
//! The decoder consumes one line at a time; [`LineSplitter`] does the
//! buffering to line boundaries for transports that deliver arbitrary
//! chunks.

pub mod decoder;
pub mod event;
pub mod lines;
pub mod stream;

pub use decoder::{EventDecoder, Events, decode_line, events};
pub use event::ProtocolEvent;
pub use lines::LineSplitter;
pub use stream::event_stream;
