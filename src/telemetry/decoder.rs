//! # Line Decoder
//!
//! Splits raw serial chunks into complete lines, holding back an
//! unterminated trailing fragment until the next chunk arrives.

use bytes::{Buf, BytesMut};
use tracing::warn;

/// Longest line accepted, in bytes. Telemetry lines are well under 100.
pub const MAX_LINE_LEN: usize = 4096;

/// Newline-delimited line splitter.
///
/// Lines are split at the byte level so a multi-byte character cut in half by
/// the transport is reassembled before decoding. A line longer than the limit
/// is dropped whole, however it was chunked.
#[derive(Debug)]
pub struct LineDecoder {
    pending: BytesMut,
    /// Bytes of `pending` already known to hold no newline
    scanned: usize,
    max_line: usize,
    /// Dropping the rest of an overlong line
    overflowed: bool,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_LEN)
    }
}

impl LineDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that drops lines longer than `max_line` bytes.
    #[must_use]
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            pending: BytesMut::new(),
            scanned: 0,
            max_line: max_line.max(1),
            overflowed: false,
        }
    }

    /// Append a chunk and return every line it completes
    ///
    /// # Arguments
    ///
    /// * `chunk` - Raw bytes as delivered by the transport
    ///
    /// # Returns
    ///
    /// * `Vec<String>` - Complete lines in arrival order, without the `\n`
    ///
    /// # Examples
    ///
    /// ```
    /// use ground_station::telemetry::decoder::LineDecoder;
    ///
    /// let mut decoder = LineDecoder::new();
    /// assert_eq!(decoder.push(b"I 1 10"), Vec::<String>::new());
    /// assert_eq!(decoder.push(b"0\nT=2"), vec!["I 1 100".to_string()]);
    /// assert_eq!(decoder.pending(), b"T=2");
    /// ```
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending[self.scanned..].iter().position(|&b| b == b'\n') {
            let line = self.pending.split_to(self.scanned + pos);
            self.pending.advance(1);
            self.scanned = 0;

            if self.overflowed || line.len() > self.max_line {
                warn!("Dropped a line longer than {} bytes", self.max_line);
                self.overflowed = false;
                continue;
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        self.scanned = self.pending.len();

        if self.pending.len() > self.max_line {
            self.pending.clear();
            self.scanned = 0;
            self.overflowed = true;
        }

        lines
    }

    /// Bytes received after the last newline.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Drop the held fragment (connection closed mid-line).
    pub fn discard(&mut self) {
        self.pending.clear();
        self.scanned = 0;
        self.overflowed = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &[u8] = b"I 5 3001\nT=-1.00\nT2=379\nS=0,0,0,0\nP=365,355,356,386\nBMP=0\nI 6 3";

    #[test]
    fn test_single_chunk() {
        let mut decoder = LineDecoder::new();
        let lines = decoder.push(STREAM);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "I 5 3001");
        assert_eq!(lines[5], "BMP=0");
        assert_eq!(decoder.pending(), b"I 6 3");
    }

    #[test]
    fn test_split_at_every_boundary_yields_same_lines() {
        let mut whole = LineDecoder::new();
        let expected = whole.push(STREAM);

        for split in 0..=STREAM.len() {
            let mut decoder = LineDecoder::new();
            let mut lines = decoder.push(&STREAM[..split]);
            lines.extend(decoder.push(&STREAM[split..]));
            assert_eq!(lines, expected, "Split at byte {} changed the output", split);
            assert_eq!(decoder.pending(), whole.pending());
        }
    }

    #[test]
    fn test_unterminated_input_emits_nothing() {
        let mut decoder = LineDecoder::new();
        assert!(decoder.push(b"PRS=1013.2").is_empty());
        assert!(decoder.push(b"5").is_empty());
        assert_eq!(decoder.push(b"\n"), vec!["PRS=1013.25".to_string()]);
        assert!(decoder.pending().is_empty());
    }

    #[test]
    fn test_empty_lines_are_preserved() {
        let mut decoder = LineDecoder::new();
        assert_eq!(decoder.push(b"\n\nA\n"), vec!["", "", "A"]);
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let text = "T=20°\n".as_bytes();
        let degree = text.iter().position(|&b| b == 0xC2).unwrap();

        let mut decoder = LineDecoder::new();
        assert!(decoder.push(&text[..degree + 1]).is_empty());
        assert_eq!(decoder.push(&text[degree + 1..]), vec!["T=20°".to_string()]);
    }

    #[test]
    fn test_fragment_is_scanned_once() {
        let mut decoder = LineDecoder::new();
        for _ in 0..100 {
            assert!(decoder.push(b"ab").is_empty());
        }
        assert_eq!(decoder.scanned, 200);
        assert_eq!(decoder.push(b"c\nd").len(), 1);
        assert_eq!(decoder.scanned, 1);
    }

    #[test]
    fn test_overlong_line_dropped_regardless_of_chunking() {
        let stream = b"T=1\n0123456789ABCDEF\nT=2\n";

        for size in 1..=stream.len() {
            let mut decoder = LineDecoder::with_max_line(8);
            let lines: Vec<String> = stream.chunks(size).flat_map(|c| decoder.push(c)).collect();
            assert_eq!(lines, vec!["T=1", "T=2"], "Chunk size {}", size);
            assert!(decoder.pending().is_empty());
        }
    }

    #[test]
    fn test_endless_fragment_is_bounded() {
        let mut decoder = LineDecoder::with_max_line(16);
        for _ in 0..1000 {
            decoder.push(b"xxxxxxxxxx");
            assert!(decoder.pending().len() <= 16);
        }
        assert_eq!(decoder.push(b"\nPING=1\n"), vec!["PING=1".to_string()]);
    }

    #[test]
    fn test_discard_drops_fragment() {
        let mut decoder = LineDecoder::new();
        decoder.push(b"ALT=12");
        decoder.discard();
        assert_eq!(decoder.push(b"3\n"), vec!["3".to_string()]);
    }
}
