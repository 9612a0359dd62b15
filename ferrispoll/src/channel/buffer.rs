//! Transcript buffer with ANSI stripping and tail search.
//!
//! Device output is accumulated here between a command being sent and its
//! response being considered complete. Escape sequences are removed on the
//! way in so parsers and stored transcripts only ever see printable text.
//!
//! Prompt detection only looks at the last `search_depth` bytes, which keeps
//! it cheap for large outputs such as full BGP tables.

use bytes::BytesMut;
use regex::bytes::Regex;
use vte::{Parser, Perform};

/// Buffer for accumulating terminal output.
pub struct TranscriptBuffer {
    /// The accumulated, escape-free output.
    buffer: BytesMut,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,

    /// Escape-sequence parser; keeps state across chunk boundaries.
    parser: Parser,
}

impl TranscriptBuffer {
    /// Create a new buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
            parser: Parser::new(),
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let mut sink = Printable {
            out: &mut self.buffer,
        };
        self.parser.advance(&mut sink, data);
    }

    /// Search only the tail of the buffer for the pattern.
    pub fn search_tail(&self, pattern: &Regex) -> Option<regex::bytes::Match<'_>> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        pattern.find(&self.buffer[start..])
    }

    /// Check if the tail contains a pattern match.
    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        self.search_tail(pattern).is_some()
    }

    /// Take the buffer contents as text and reset.
    pub fn take_text(&mut self) -> String {
        let bytes = self.buffer.split();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for TranscriptBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// `vte` performer that keeps printable text and line control characters.
struct Printable<'a> {
    out: &'a mut BytesMut,
}

impl Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.extend_from_slice(&[byte]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_extend() {
        let mut buffer = TranscriptBuffer::new(100);
        buffer.extend(b"Hello, world!");
        assert_eq!(buffer.as_slice(), b"Hello, world!");
    }

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = TranscriptBuffer::new(100);
        buffer.extend(b"\x1b[32mFULL/PTOP\x1b[0m\r\n");
        assert_eq!(buffer.as_slice(), b"FULL/PTOP\r\n");
    }

    #[test]
    fn test_escape_split_across_chunks() {
        let mut buffer = TranscriptBuffer::new(100);
        buffer.extend(b"up\x1b[3");
        buffer.extend(b"1mdown\x1b[0m");
        assert_eq!(buffer.as_slice(), b"updown");
    }

    #[test]
    fn test_tail_search() {
        let mut buffer = TranscriptBuffer::new(20);
        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\nrouter#");

        let pattern = Regex::new(r"router#").unwrap();
        assert!(buffer.tail_contains(&pattern));
    }

    #[test]
    fn test_tail_search_not_in_tail() {
        let mut buffer = TranscriptBuffer::new(10);
        buffer.extend(b"router#");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"router#").unwrap();
        assert!(!buffer.tail_contains(&pattern));
    }

    #[test]
    fn test_take_clears_buffer() {
        let mut buffer = TranscriptBuffer::new(100);
        buffer.extend(b"test data");
        assert_eq!(buffer.take_text(), "test data");
        assert!(buffer.is_empty());
    }
}
