use super::error::{PdfError, PdfResult};
use std::sync::Arc;

/// An in-memory byte window with a cursor.
///
/// The underlying buffer is shared through an `Arc`, so clones are cheap
/// and can be seeked independently. The cross-reference layer keeps one
/// stream over the whole file and hands out repositioned clones to the
/// lexer whenever an object needs to be parsed at a known offset.
///
/// Positions are absolute indices into the underlying buffer, matching
/// the byte offsets recorded in cross-reference entries.
#[derive(Debug, Clone)]
pub struct ByteStream {
    bytes: Arc<Vec<u8>>,
    start: usize,
    end: usize,
    pos: usize,
}

impl ByteStream {
    pub fn new(bytes: Vec<u8>) -> Self {
        let end = bytes.len();
        ByteStream {
            bytes: Arc::new(bytes),
            start: 0,
            end,
            pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    /// Current absolute position of the cursor.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// First position past the accessible window.
    pub fn end_pos(&self) -> usize {
        self.end
    }

    pub fn seek(&mut self, pos: usize) -> PdfResult<()> {
        if pos < self.start || pos > self.end {
            return Err(PdfError::InvalidPosition {
                pos,
                length: self.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Reads the byte under the cursor and advances, or `None` at the end.
    pub fn next_byte(&mut self) -> Option<u8> {
        if self.pos >= self.end {
            return None;
        }
        let b = self.bytes[self.pos];
        self.pos += 1;
        Some(b)
    }

    pub fn peek_byte(&self) -> Option<u8> {
        if self.pos >= self.end {
            None
        } else {
            Some(self.bytes[self.pos])
        }
    }

    /// Byte at an absolute position, without moving the cursor.
    pub fn byte_at(&self, pos: usize) -> Option<u8> {
        if pos < self.start || pos >= self.end {
            None
        } else {
            Some(self.bytes[pos])
        }
    }

    /// Borrow of an absolute byte range.
    pub fn slice(&self, begin: usize, end: usize) -> PdfResult<&[u8]> {
        if begin > end || begin < self.start || end > self.end {
            return Err(PdfError::InvalidByteRange { begin, end });
        }
        Ok(&self.bytes[begin..end])
    }

    /// The whole accessible window.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[self.start..self.end]
    }

    /// First occurrence of `needle` at or after `from`, as an absolute
    /// position.
    pub fn find(&self, needle: &[u8], from: usize) -> Option<usize> {
        if needle.is_empty() || from >= self.end {
            return None;
        }
        let from = from.max(self.start);
        let hay = &self.bytes[from..self.end];
        hay.windows(needle.len())
            .position(|w| w == needle)
            .map(|i| i + from)
    }

    /// Last occurrence of `needle` within `begin..end`, as an absolute
    /// position.
    pub fn rfind_in(&self, needle: &[u8], begin: usize, end: usize) -> Option<usize> {
        let begin = begin.max(self.start);
        let end = end.min(self.end);
        if needle.is_empty() || begin >= end {
            return None;
        }
        let hay = &self.bytes[begin..end];
        hay.windows(needle.len())
            .rposition(|w| w == needle)
            .map(|i| i + begin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_reads_and_seeks() {
        let mut s = ByteStream::new(vec![10, 20, 30]);
        assert_eq!(s.len(), 3);
        assert_eq!(s.next_byte(), Some(10));
        assert_eq!(s.peek_byte(), Some(20));
        assert_eq!(s.pos(), 1);
        s.seek(0).unwrap();
        assert_eq!(s.next_byte(), Some(10));
        assert!(s.seek(4).is_err());
    }

    #[test]
    fn end_of_data() {
        let mut s = ByteStream::new(vec![1]);
        assert_eq!(s.next_byte(), Some(1));
        assert_eq!(s.next_byte(), None);
        assert_eq!(s.peek_byte(), None);
    }

    #[test]
    fn slices_and_ranges() {
        let s = ByteStream::new(vec![1, 2, 3, 4, 5]);
        assert_eq!(s.slice(1, 4).unwrap(), &[2, 3, 4]);
        assert!(s.slice(3, 6).is_err());
        assert_eq!(s.byte_at(4), Some(5));
        assert_eq!(s.byte_at(5), None);
    }

    #[test]
    fn find_forward_and_backward() {
        let s = ByteStream::new(b"abc needle abc needle end".to_vec());
        assert_eq!(s.find(b"needle", 0), Some(4));
        assert_eq!(s.find(b"needle", 5), Some(15));
        assert_eq!(s.rfind_in(b"needle", 0, s.end_pos()), Some(15));
        assert_eq!(s.find(b"missing", 0), None);
    }

    #[test]
    fn clones_share_data_but_not_cursor() {
        let mut a = ByteStream::new(vec![7, 8, 9]);
        let mut b = a.clone();
        a.next_byte();
        assert_eq!(a.pos(), 1);
        assert_eq!(b.pos(), 0);
        assert_eq!(b.next_byte(), Some(7));
    }
}
