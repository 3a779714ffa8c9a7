//! Line buffering for chunked transports.

/// Buffers arbitrary byte chunks and hands out complete lines.
///
/// Lines end at `\r\n`, `\n` or a lone `\r`, so all three framings decode
/// the same. Bytes after the last terminator stay buffered until the next
/// chunk arrives, as does a trailing `\r` that may start a CRLF.
///
/// # Examples
///
/// ```
/// use chess_copilot::sse::LineSplitter;
///
/// let mut lines = LineSplitter::new();
/// lines.extend(b"event: a\r\nda");
/// assert_eq!(lines.next_line(), Some(b"event: a".to_vec()));
/// assert_eq!(lines.next_line(), None);
/// lines.extend(b"ta: 1\n");
/// assert_eq!(lines.next_line(), Some(b"data: 1".to_vec()));
/// ```
#[derive(Debug, Default)]
pub struct LineSplitter {
    buf: Vec<u8>,
    /// Offset of the first byte not yet handed out.
    start: usize,
}

impl LineSplitter {
    /// Creates an empty splitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transport chunk.
    pub fn extend(&mut self, chunk: &[u8]) {
        if self.start > 0 && self.start == self.buf.len() {
            self.buf.clear();
            self.start = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// Returns the next complete line without its terminator.
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        let rest = &self.buf[self.start..];
        let pos = rest.iter().position(|&b| b == b'\n' || b == b'\r')?;
        let consumed = if rest[pos] == b'\r' {
            // A CR may be the first half of a CRLF split across chunks.
            match rest.get(pos + 1) {
                Some(b'\n') => pos + 2,
                Some(_) => pos + 1,
                None => return None,
            }
        } else {
            pos + 1
        };
        let line = rest[..pos].to_vec();
        self.start += consumed;
        if self.start > 4096 && self.start * 2 > self.buf.len() {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        Some(line)
    }

    /// Returns true if unterminated bytes are buffered.
    #[must_use]
    pub fn has_partial(&self) -> bool {
        self.start < self.buf.len()
    }

    /// Consumes the splitter, returning any unterminated trailing line.
    #[must_use]
    pub fn finish(mut self) -> Option<Vec<u8>> {
        if !self.has_partial() {
            return None;
        }
        let mut tail = self.buf.split_off(self.start);
        if tail.last() == Some(&b'\r') {
            tail.pop();
        }
        Some(tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(lines: &mut LineSplitter) -> Vec<Vec<u8>> {
        std::iter::from_fn(|| lines.next_line()).collect()
    }

    #[test]
    fn test_split_single_chunk() {
        let mut lines = LineSplitter::new();
        lines.extend(b"event: a\ndata: 1\n\n");
        assert_eq!(
            drain(&mut lines),
            vec![b"event: a".to_vec(), b"data: 1".to_vec(), Vec::new()]
        );
        assert!(!lines.has_partial());
    }

    #[test]
    fn test_split_across_chunks() {
        let mut lines = LineSplitter::new();
        lines.extend(b"dat");
        assert!(drain(&mut lines).is_empty());
        assert!(lines.has_partial());
        lines.extend(b"a: x");
        lines.extend(b"y\n");
        assert_eq!(drain(&mut lines), vec![b"data: xy".to_vec()]);
    }

    #[test]
    fn test_crlf_is_stripped() {
        let mut lines = LineSplitter::new();
        lines.extend(b"data: 1\r\n\r\n");
        assert_eq!(drain(&mut lines), vec![b"data: 1".to_vec(), Vec::new()]);
    }

    #[test]
    fn test_crlf_split_between_chunks() {
        let mut lines = LineSplitter::new();
        lines.extend(b"data: 1\r");
        assert!(drain(&mut lines).is_empty());
        lines.extend(b"\n");
        assert_eq!(drain(&mut lines), vec![b"data: 1".to_vec()]);
    }

    #[test]
    fn test_lone_cr_ends_line() {
        let mut lines = LineSplitter::new();
        lines.extend(b"event: a\rdata: 1\r\r");
        assert_eq!(
            drain(&mut lines),
            vec![b"event: a".to_vec(), b"data: 1".to_vec()]
        );
        lines.extend(b"x");
        assert_eq!(drain(&mut lines), vec![Vec::<u8>::new()]);
        assert_eq!(lines.finish(), Some(b"x".to_vec()));
    }

    #[test]
    fn test_trailing_cr_at_end_of_body() {
        let mut lines = LineSplitter::new();
        lines.extend(b"data: 1\r");
        assert!(drain(&mut lines).is_empty());
        assert_eq!(lines.finish(), Some(b"data: 1".to_vec()));
    }

    #[test]
    fn test_finish_returns_tail() {
        let mut lines = LineSplitter::new();
        lines.extend(b"data: 1\ndata: 2");
        assert_eq!(drain(&mut lines), vec![b"data: 1".to_vec()]);
        assert_eq!(lines.finish(), Some(b"data: 2".to_vec()));
    }

    #[test]
    fn test_finish_without_tail() {
        let mut lines = LineSplitter::new();
        lines.extend(b"data: 1\n");
        let _ = drain(&mut lines);
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn test_large_stream_compacts() {
        let mut lines = LineSplitter::new();
        for i in 0..2000 {
            lines.extend(format!("data: {i}\n").as_bytes());
            assert_eq!(lines.next_line(), Some(format!("data: {i}").into_bytes()));
        }
        assert!(lines.buf.len() < 8192);
    }
}
