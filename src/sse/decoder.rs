//! Decode-and-segment: raw lines in, protocol events out.

use std::borrow::Cow;

use tracing::debug;

use super::event::ProtocolEvent;

const EVENT_PREFIX: &str = "event:";
const DATA_PREFIX: &str = "data:";

/// Decodes one raw line as UTF-8, substituting U+FFFD for invalid bytes.
///
/// Never fails. Replacements are reported at debug level only.
///
/// # Examples
///
/// ```
/// use chess_copilot::sse::decode_line;
///
/// assert_eq!(decode_line(b"data: ok"), "data: ok");
/// assert_eq!(decode_line(b"data: \xff"), "data: \u{fffd}");
/// ```
pub fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let text = String::from_utf8_lossy(raw);
    if let Cow::Owned(_) = text {
        debug!(len = raw.len(), "replaced invalid UTF-8 in stream line");
    }
    text
}

/// Incremental event-block decoder.
///
/// Feed it one line at a time (without the line terminator). A blank line
/// closes the current block; the block becomes an event only if it held at
/// least one `event:` or `data:` line.
#[derive(Debug, Default)]
pub struct EventDecoder {
    event_name: Option<String>,
    data: Vec<String>,
    pending: bool,
}

impl EventDecoder {
    /// Creates a decoder with an empty block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes one line, returning an event when the line closes a block.
    pub fn push_line(&mut self, raw: &[u8]) -> Option<ProtocolEvent> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        if raw.is_empty() {
            return self.emit();
        }

        let decoded = decode_line(raw);
        let line = decoded.trim();
        if let Some(name) = line.strip_prefix(EVENT_PREFIX) {
            self.event_name = Some(name.trim().to_string());
            self.pending = true;
        } else if let Some(payload) = line.strip_prefix(DATA_PREFIX) {
            self.data.push(payload.trim().to_string());
            self.pending = true;
        }
        None
    }

    /// Returns true if an unterminated block has accumulated content.
    #[must_use]
    pub const fn has_pending(&self) -> bool {
        self.pending
    }

    /// Ends input. A truncated block is dropped, never emitted.
    pub fn finish(&mut self) {
        if self.pending {
            debug!(
                event = self.event_name.as_deref().unwrap_or("-"),
                data_lines = self.data.len(),
                "discarding unterminated event block"
            );
        }
        self.reset();
    }

    fn emit(&mut self) -> Option<ProtocolEvent> {
        if !self.pending {
            return None;
        }
        let event = ProtocolEvent {
            event_name: self.event_name.take(),
            data: self.data.join("\n"),
        };
        self.reset();
        Some(event)
    }

    fn reset(&mut self) {
        self.event_name = None;
        self.data.clear();
        self.pending = false;
    }
}

/// Lazy event sequence over line-segmented transport input.
///
/// Created by [`events`]. The sequence ends when the input ends, or right
/// after yielding the first transport error. Not restartable.
#[derive(Debug)]
pub struct Events<I> {
    lines: I,
    decoder: EventDecoder,
    done: bool,
}

/// Decodes and segments a line iterator into protocol events.
///
/// Each item of `lines` is one line without its terminator, or a transport
/// error. Errors are passed through once and end the sequence.
///
/// # Examples
///
/// ```
/// use chess_copilot::sse::events;
///
/// let lines: Vec<Result<&[u8], std::io::Error>> =
///     vec![Ok(b"event: ping".as_slice()), Ok(b"data: 1".as_slice()), Ok(b"".as_slice())];
/// let out: Vec<_> = events(lines).collect::<Result<_, _>>().unwrap();
/// assert_eq!(out.len(), 1);
/// assert_eq!(out[0].event_name.as_deref(), Some("ping"));
/// ```
pub fn events<I, L, E>(lines: I) -> Events<I::IntoIter>
where
    I: IntoIterator<Item = Result<L, E>>,
    L: AsRef<[u8]>,
{
    Events {
        lines: lines.into_iter(),
        decoder: EventDecoder::new(),
        done: false,
    }
}

impl<I, L, E> Iterator for Events<I>
where
    I: Iterator<Item = Result<L, E>>,
    L: AsRef<[u8]>,
{
    type Item = Result<ProtocolEvent, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    if let Some(event) = self.decoder.push_line(line.as_ref()) {
                        return Some(Ok(event));
                    }
                }
                Some(Err(err)) => {
                    self.done = true;
                    self.decoder.finish();
                    return Some(Err(err));
                }
                None => {
                    self.done = true;
                    self.decoder.finish();
                    return None;
                }
            }
        }
    }
}

impl<I, L, E> std::iter::FusedIterator for Events<I>
where
    I: Iterator<Item = Result<L, E>>,
    L: AsRef<[u8]>,
{
}
