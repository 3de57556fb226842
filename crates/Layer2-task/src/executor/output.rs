//! Capped output capture

/// Per-stream capture limit
pub const DEFAULT_OUTPUT_LIMIT: usize = 128 * 1024;

/// Appended when anything past the limit was dropped
pub const TRUNCATION_MARKER: &str = "\n[truncated]";

/// Byte buffer that keeps the first `limit` bytes and drops the rest.
///
/// A cut never splits a UTF-8 sequence: the kept prefix backs off to the
/// last character boundary at or below the limit.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    data: Vec<u8>,
    limit: usize,
    truncated: bool,
}

impl OutputBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            limit,
            truncated: false,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        if self.truncated {
            return;
        }
        let room = self.limit.saturating_sub(self.data.len());
        if chunk.len() > room {
            self.data.extend_from_slice(&chunk[..room]);
            let keep = self.data.len() - incomplete_tail(&self.data);
            self.data.truncate(keep);
            self.truncated = true;
        } else {
            self.data.extend_from_slice(chunk);
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Lossy UTF-8, with the truncation marker when applicable
    pub fn to_text(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.data).into_owned();
        if self.truncated {
            text.push_str(TRUNCATION_MARKER);
        }
        text
    }
}

/// Length of a trailing UTF-8 sequence missing its continuation bytes
fn incomplete_tail(data: &[u8]) -> usize {
    for back in 1..=data.len().min(4) {
        let byte = data[data.len() - back];
        if byte & 0b1100_0000 == 0b1000_0000 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exactly_at_limit_is_not_truncated() {
        let mut buf = OutputBuffer::new(DEFAULT_OUTPUT_LIMIT);
        buf.push(&vec![b'a'; DEFAULT_OUTPUT_LIMIT]);

        assert!(!buf.is_truncated());
        let text = buf.to_text();
        assert_eq!(text.len(), DEFAULT_OUTPUT_LIMIT);
        assert!(!text.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_one_byte_over_limit_is_truncated() {
        let mut buf = OutputBuffer::new(DEFAULT_OUTPUT_LIMIT);
        buf.push(&vec![b'a'; DEFAULT_OUTPUT_LIMIT - 1]);
        buf.push(b"bc");

        assert!(buf.is_truncated());
        assert_eq!(buf.len(), DEFAULT_OUTPUT_LIMIT);
        let text = buf.to_text();
        assert!(text.ends_with(&format!("b{}", TRUNCATION_MARKER)));
        assert_eq!(text.len(), DEFAULT_OUTPUT_LIMIT + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_chunks_after_full_are_dropped() {
        let mut buf = OutputBuffer::new(4);
        buf.push(b"abcd");
        assert!(!buf.is_truncated());
        buf.push(b"e");
        buf.push(b"f");
        assert_eq!(buf.to_text(), format!("abcd{}", TRUNCATION_MARKER));
    }

    #[test]
    fn test_cut_backs_off_to_char_boundary() {
        let mut buf = OutputBuffer::new(4);
        buf.push("abcé".as_bytes());

        assert!(buf.is_truncated());
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.to_text(), format!("abc{}", TRUNCATION_MARKER));
        assert!(!buf.to_text().contains('\u{FFFD}'));

        buf.push(b"d");
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_cut_drops_sequence_started_in_earlier_chunk() {
        let euro = "€".as_bytes();
        let mut buf = OutputBuffer::new(5);
        buf.push(b"abc");
        buf.push(&euro[..1]);
        buf.push(&euro[1..]);

        assert_eq!(buf.to_text(), format!("abc{}", TRUNCATION_MARKER));
    }

    #[test]
    fn test_multibyte_split_across_chunks_within_limit() {
        let text = "한글 출력";
        let bytes = text.as_bytes();
        let mut buf = OutputBuffer::new(DEFAULT_OUTPUT_LIMIT);
        buf.push(&bytes[..4]);
        buf.push(&bytes[4..]);

        assert!(!buf.is_truncated());
        assert_eq!(buf.to_text(), text);
    }
}
