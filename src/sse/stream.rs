//! Async decode-and-segment over a chunked response body.

use std::fmt::Display;
use std::pin::Pin;

use futures_util::stream::{self, Stream, StreamExt};
use tracing::warn;

use super::decoder::EventDecoder;
use super::event::ProtocolEvent;
use super::lines::LineSplitter;
use crate::error::ServiceError;

struct State<S> {
    body: Option<Pin<Box<S>>>,
    lines: LineSplitter,
    decoder: EventDecoder,
    failure: Option<String>,
    body_done: bool,
}

/// Adapts a chunked body into a stream of protocol events.
///
/// Chunks are buffered to line boundaries before decoding. When the body
/// yields an error, every complete line already received is still decoded;
/// then a single [`ServiceError::StreamInterrupted`] is yielded and the
/// stream ends. The body is dropped as soon as it is exhausted or fails.
pub fn event_stream<S, B, E>(body: S) -> impl Stream<Item = Result<ProtocolEvent, ServiceError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let state = State {
        body: Some(Box::pin(body)),
        lines: LineSplitter::new(),
        decoder: EventDecoder::new(),
        failure: None,
        body_done: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(line) = st.lines.next_line() {
                if let Some(event) = st.decoder.push_line(&line) {
                    return Some((Ok(event), st));
                }
                continue;
            }

            if st.body_done {
                st.decoder.finish();
                let reason = st.failure.take()?;
                return Some((Err(ServiceError::StreamInterrupted { reason }), st));
            }

            let next = match st.body.as_mut() {
                Some(body) => body.next().await,
                None => None,
            };
            match next {
                Some(Ok(chunk)) => st.lines.extend(chunk.as_ref()),
                Some(Err(err)) => {
                    warn!(error = %err, "response stream failed");
                    st.failure = Some(err.to_string());
                    st.body = None;
                    st.body_done = true;
                }
                None => {
                    st.body = None;
                    st.body_done = true;
                    let lines = std::mem::take(&mut st.lines);
                    if let Some(tail) = lines.finish()
                        && let Some(event) = st.decoder.push_line(&tail)
                    {
                        return Some((Ok(event), st));
                    }
                }
            }
        }
    })
}
