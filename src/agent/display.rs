//! Drive-display: protocol events in, running answer text out.
//!
//! The [`Assembler`] owns the running text. Deltas append and publish a
//! snapshot; an aggregate response replaces the text outright. Unknown and
//! malformed events leave the text untouched.

use std::fmt::Display;
use std::pin::pin;

use futures_util::stream::{Stream, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use super::payload::AgentEvent;
use super::reference::extract_game_id;
use crate::sse::ProtocolEvent;

/// Receives snapshots of the running answer.
///
/// Publication is synchronous and may repeat the same snapshot; an
/// implementation must treat a repeated value as a no-op redraw.
pub trait DisplaySink {
    /// Shows `text` as the current answer.
    fn publish(&mut self, text: &str);
}

impl<F: FnMut(&str)> DisplaySink for F {
    fn publish(&mut self, text: &str) {
        self(text);
    }
}

/// How the event sequence ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Completion {
    /// The transport ended cleanly.
    Complete,
    /// The transport failed mid-stream; the text may be partial.
    Interrupted {
        /// Transport error description.
        reason: String,
    },
}

/// Result of one agent exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    /// Final answer text.
    pub text: String,
    /// First `GAME_ID` reference found in the text.
    pub game_id: Option<String>,
    /// Clean end or interruption.
    pub completion: Completion,
    /// True if an aggregate response supplied the text.
    pub finalized: bool,
    /// Number of events skipped because their payload was malformed.
    pub skipped_events: usize,
}

impl Exchange {
    /// Returns true if the stream ended cleanly.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.completion, Completion::Complete)
    }
}

/// Incremental state for drive-display.
#[derive(Debug, Default)]
pub struct Assembler {
    running_text: String,
    finalized: bool,
    skipped: usize,
}

impl Assembler {
    /// Creates an assembler with empty text.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current running text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.running_text
    }

    /// Applies one event.
    pub fn apply<S: DisplaySink + ?Sized>(&mut self, event: &ProtocolEvent, sink: &mut S) {
        match AgentEvent::parse(event) {
            Ok(AgentEvent::TextDelta(delta)) => {
                self.running_text.push_str(&delta.text);
                sink.publish(&self.running_text);
            }
            Ok(AgentEvent::Response(response)) => {
                if let Some(text) = response.final_text() {
                    self.running_text = text;
                    self.finalized = true;
                }
            }
            Ok(AgentEvent::Unknown { name }) => {
                debug!(event = name.as_deref().unwrap_or("-"), "ignoring event");
            }
            Err(err) => {
                self.skipped += 1;
                debug!(error = %err, "skipping event");
            }
        }
    }

    /// Ends the exchange and extracts the game reference.
    #[must_use]
    pub fn finish(self, completion: Completion) -> Exchange {
        let game_id = extract_game_id(&self.running_text);
        Exchange {
            text: self.running_text,
            game_id,
            completion,
            finalized: self.finalized,
            skipped_events: self.skipped,
        }
    }
}

/// Drives a display sink from an event sequence.
///
/// A transport error ends the sequence and marks the exchange
/// [`Completion::Interrupted`]; text gathered so far is kept.
///
/// # Examples
///
/// ```
/// use chess_copilot::agent::drive_display;
/// use chess_copilot::sse::ProtocolEvent;
///
/// let events: Vec<Result<ProtocolEvent, String>> = vec![
///     Ok(ProtocolEvent::named("response.text.delta", r#"{"text":"GAME_ID: "}"#)),
///     Ok(ProtocolEvent::named("response.text.delta", r#"{"text":"k9"}"#)),
/// ];
/// let mut shown = Vec::new();
/// let exchange = drive_display(events, &mut |t: &str| shown.push(t.to_string()));
/// assert_eq!(exchange.text, "GAME_ID: k9");
/// assert_eq!(exchange.game_id.as_deref(), Some("k9"));
/// assert_eq!(shown.len(), 2);
/// ```
pub fn drive_display<I, E, S>(events: I, sink: &mut S) -> Exchange
where
    I: IntoIterator<Item = Result<ProtocolEvent, E>>,
    E: Display,
    S: DisplaySink + ?Sized,
{
    let mut assembler = Assembler::new();
    for item in events {
        match item {
            Ok(event) => assembler.apply(&event, sink),
            Err(err) => return interrupted(assembler, &err),
        }
    }
    assembler.finish(Completion::Complete)
}

/// Async form of [`drive_display`] for streamed responses.
///
/// The stream is dropped before returning, on every path.
pub async fn drive_display_stream<St, E, S>(events: St, sink: &mut S) -> Exchange
where
    St: Stream<Item = Result<ProtocolEvent, E>>,
    E: Display,
    S: DisplaySink + ?Sized,
{
    let mut events = pin!(events);
    let mut assembler = Assembler::new();
    while let Some(item) = events.next().await {
        match item {
            Ok(event) => assembler.apply(&event, sink),
            Err(err) => return interrupted(assembler, &err),
        }
    }
    assembler.finish(Completion::Complete)
}

fn interrupted(assembler: Assembler, err: &dyn Display) -> Exchange {
    warn!(error = %err, partial_len = assembler.text().len(), "exchange interrupted");
    assembler.finish(Completion::Interrupted {
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::payload::{RESPONSE_EVENT, TEXT_DELTA_EVENT};

    fn delta(text: &str) -> ProtocolEvent {
        ProtocolEvent::named(
            TEXT_DELTA_EVENT,
            serde_json::json!({ "text": text }).to_string(),
        )
    }

    fn aggregate(text: &str) -> ProtocolEvent {
        ProtocolEvent::named(
            RESPONSE_EVENT,
            serde_json::json!({
                "response": { "content": [ { "type": "text", "text": text } ] }
            })
            .to_string(),
        )
    }

    fn ok(events: Vec<ProtocolEvent>) -> Vec<Result<ProtocolEvent, String>> {
        events.into_iter().map(Ok).collect()
    }

    #[test]
    fn test_deltas_accumulate_and_publish() {
        let mut shown = Vec::new();
        let exchange = drive_display(ok(vec![delta("Hel"), delta("lo")]), &mut |t: &str| {
            shown.push(t.to_string());
        });
        assert_eq!(exchange.text, "Hello");
        assert_eq!(shown, vec!["Hel", "Hello"]);
        assert!(exchange.is_complete());
        assert!(!exchange.finalized);
    }

    #[test]
    fn test_final_overrides_accumulation() {
        let events = ok(vec![delta("Hel"), delta("lo"), aggregate("Goodbye")]);
        let exchange = drive_display(events, &mut |_: &str| {});
        assert_eq!(exchange.text, "Goodbye");
        assert!(exchange.finalized);
    }

    #[test]
    fn test_aggregate_without_text_keeps_deltas() {
        let empty = ProtocolEvent::named(RESPONSE_EVENT, r#"{"response":{"content":[]}}"#);
        let exchange = drive_display(ok(vec![delta("kept"), empty]), &mut |_: &str| {});
        assert_eq!(exchange.text, "kept");
        assert!(!exchange.finalized);
    }

    #[test]
    fn test_malformed_payload_is_skipped() {
        let broken = ProtocolEvent::named(TEXT_DELTA_EVENT, "{not json");
        let broken_final = ProtocolEvent::named(RESPONSE_EVENT, "42");
        let events = ok(vec![delta("a"), broken, broken_final, delta("b")]);
        let exchange = drive_display(events, &mut |_: &str| {});
        assert_eq!(exchange.text, "ab");
        assert_eq!(exchange.skipped_events, 2);
        assert!(exchange.is_complete());
    }

    #[test]
    fn test_unknown_events_are_ignored() {
        let events = ok(vec![
            ProtocolEvent::named("response.status", r#"{"status":"planning"}"#),
            ProtocolEvent::new(None, "whatever"),
            delta("x"),
        ]);
        let exchange = drive_display(events, &mut |_: &str| {});
        assert_eq!(exchange.text, "x");
        assert_eq!(exchange.skipped_events, 0);
    }

    #[test]
    fn test_interruption_keeps_partial_text() {
        let events: Vec<Result<ProtocolEvent, String>> = vec![
            Ok(delta("partial GAME_ID=abc")),
            Err("connection reset".to_string()),
            Ok(delta(" never seen")),
        ];
        let exchange = drive_display(events, &mut |_: &str| {});
        assert_eq!(exchange.text, "partial GAME_ID=abc");
        assert_eq!(
            exchange.completion,
            Completion::Interrupted {
                reason: "connection reset".to_string()
            }
        );
        assert_eq!(exchange.game_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_reference_extracted_from_final_text_only() {
        let events = ok(vec![delta("GAME_ID: early1"), aggregate("Replaced, no id")]);
        let exchange = drive_display(events, &mut |_: &str| {});
        assert_eq!(exchange.game_id, None);
    }

    #[test]
    fn test_repeated_publication_is_idempotent() {
        #[derive(Default)]
        struct Screen {
            shown: String,
        }
        impl DisplaySink for Screen {
            fn publish(&mut self, text: &str) {
                self.shown = text.to_string();
            }
        }

        let mut once = Screen::default();
        once.publish("Hello");
        let mut twice = Screen::default();
        twice.publish("Hello");
        twice.publish("Hello");
        assert_eq!(once.shown, twice.shown);
    }

    #[tokio::test]
    async fn test_drive_display_stream() {
        let events = futures_util::stream::iter(ok(vec![
            delta("Hel"),
            delta("lo"),
            aggregate("Goodbye GAME_ID: g1"),
        ]));
        let mut count = 0;
        let exchange = drive_display_stream(events, &mut |_: &str| count += 1).await;
        assert_eq!(exchange.text, "Goodbye GAME_ID: g1");
        assert_eq!(exchange.game_id.as_deref(), Some("g1"));
        assert_eq!(count, 2);
    }

    #[test]
    fn test_exchange_serializes_completion() {
        let exchange = drive_display(ok(vec![delta("x")]), &mut |_: &str| {});
        let json = serde_json::to_value(&exchange).unwrap();
        assert_eq!(json["completion"]["status"], "complete");
        assert_eq!(json["text"], "x");
    }
}
