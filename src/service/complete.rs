//! Streamed text completion.
//!
//! Completion chunks arrive as unnamed events whose data is a JSON chunk
//! with `choices[].delta.content`. A `[DONE]` data line ends the answer.

use std::fmt::Display;
use std::pin::pin;

use futures_util::stream::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::config::ServiceConfig;
use super::http::{EVENT_STREAM, build_client, default_headers, ensure_success};
use crate::agent::{Completion, DisplaySink};
use crate::core::Role;
use crate::error::ServiceError;
use crate::sse::{ProtocolEvent, event_stream};

const COMPLETE_PATH: &str = "api/v2/cortex/inference:complete";

/// Data line that terminates a completion stream.
pub const DONE_MARKER: &str = "[DONE]";

/// Default completion model.
pub const DEFAULT_MODEL: &str = "mistral-large2";

#[derive(Debug, Serialize)]
struct CompleteMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CompleteRequest<'a> {
    model: &'a str,
    messages: Vec<CompleteMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct Chunk {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

/// A finished completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionAnswer {
    /// Accumulated answer text.
    pub text: String,
    /// Clean end or interruption.
    pub completion: Completion,
    /// Chunks skipped because they were not valid JSON.
    pub skipped_events: usize,
}

/// Client for the completion endpoint.
#[derive(Debug, Clone)]
pub struct CompleteClient {
    http: Client,
    config: ServiceConfig,
}

impl CompleteClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            http: build_client(config)?,
            config: config.clone(),
        })
    }

    /// Starts a streamed completion of `prompt` with `model`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::TransportRejected`] for a status >= 400, or
    /// [`ServiceError::Request`] if no response was received.
    pub async fn stream(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<impl Stream<Item = Result<ProtocolEvent, ServiceError>> + use<>, ServiceError> {
        let body = CompleteRequest {
            model,
            messages: vec![CompleteMessage {
                role: Role::User,
                content: prompt,
            }],
            stream: true,
        };
        let url = self.config.url(COMPLETE_PATH);
        info!(url = %url, model, prompt_len = prompt.len(), "starting completion");

        let response = self
            .http
            .post(&url)
            .headers(default_headers(&self.config, EVENT_STREAM)?)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(event_stream(response.bytes_stream()))
    }
}

/// Accumulates completion chunks into `sink` until `[DONE]` or the end.
pub async fn drive_completion<St, E, S>(events: St, sink: &mut S) -> CompletionAnswer
where
    St: Stream<Item = Result<ProtocolEvent, E>>,
    E: Display,
    S: DisplaySink + ?Sized,
{
    let mut events = pin!(events);
    let mut text = String::new();
    let mut skipped = 0;

    while let Some(item) = events.next().await {
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                warn!(error = %err, partial_len = text.len(), "completion interrupted");
                return CompletionAnswer {
                    text,
                    completion: Completion::Interrupted {
                        reason: err.to_string(),
                    },
                    skipped_events: skipped,
                };
            }
        };

        if event.data == DONE_MARKER {
            break;
        }
        match serde_json::from_str::<Chunk>(&event.data) {
            Ok(chunk) => {
                let before = text.len();
                for piece in chunk.choices.into_iter().filter_map(|c| c.delta.content) {
                    text.push_str(&piece);
                }
                if text.len() > before {
                    sink.publish(&text);
                }
            }
            Err(err) => {
                skipped += 1;
                debug!(error = %err, "skipping completion chunk");
            }
        }
    }

    CompletionAnswer {
        text,
        completion: Completion::Complete,
        skipped_events: skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(content: &str) -> Result<ProtocolEvent, String> {
        Ok(ProtocolEvent::new(
            None,
            serde_json::json!({ "choices": [ { "delta": { "content": content } } ] }).to_string(),
        ))
    }

    #[tokio::test]
    async fn test_chunks_accumulate_until_done() {
        let events = futures_util::stream::iter(vec![
            chunk("The Najdorf"),
            chunk(" is sharp."),
            Ok(ProtocolEvent::new(None, DONE_MARKER)),
            chunk(" ignored"),
        ]);
        let mut shown = Vec::new();
        let answer = drive_completion(events, &mut |t: &str| shown.push(t.to_string())).await;
        assert_eq!(answer.text, "The Najdorf is sharp.");
        assert_eq!(shown, vec!["The Najdorf", "The Najdorf is sharp."]);
        assert_eq!(answer.completion, Completion::Complete);
    }

    #[tokio::test]
    async fn test_malformed_chunk_skipped() {
        let events = futures_util::stream::iter(vec![
            chunk("a"),
            Ok(ProtocolEvent::new(None, "{oops")),
            Ok(ProtocolEvent::new(None, r#"{"choices":[{"delta":{}}]}"#)),
            chunk("b"),
        ]);
        let mut count = 0;
        let answer = drive_completion(events, &mut |_: &str| count += 1).await;
        assert_eq!(answer.text, "ab");
        assert_eq!(answer.skipped_events, 1);
        assert_eq!(count, 2);
    }

    #[tokio::test]
    async fn test_interruption_keeps_partial() {
        let events = futures_util::stream::iter(vec![chunk("half"), Err("reset".to_string())]);
        let answer = drive_completion(events, &mut |_: &str| {}).await;
        assert_eq!(answer.text, "half");
        assert!(matches!(answer.completion, Completion::Interrupted { .. }));
    }

    #[test]
    fn test_request_shape() {
        let body = CompleteRequest {
            model: "m",
            messages: vec![CompleteMessage {
                role: Role::User,
                content: "p",
            }],
            stream: true,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "model": "m",
                "messages": [{"role": "user", "content": "p"}],
                "stream": true
            })
        );
    }
}
