//! Bounded Response Buffer
//!
//! A response line never grows past the configured capacity. The buffer
//! reserves one byte of the capacity for the line terminator slot, so a
//! 256-byte buffer holds at most 255 bytes of text. Text past the limit is
//! dropped at a character boundary.

use std::fmt;

/// Default response capacity in bytes.
pub const DEFAULT_RESPONSE_CAPACITY: usize = 256;

/// Smallest capacity accepted by the shell.
pub const MIN_RESPONSE_CAPACITY: usize = 8;

/// A single response line with a hard size limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBuffer {
    text: String,
    capacity: usize,
}

impl ResponseBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of text bytes the buffer holds.
    pub fn limit(&self) -> usize {
        self.capacity.saturating_sub(1)
    }

    /// Appends as much of `s` as fits.
    pub fn push_str(&mut self, s: &str) {
        let room = self.limit().saturating_sub(self.text.len());
        if s.len() <= room {
            self.text.push_str(s);
            return;
        }

        let mut end = room;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.text.push_str(&s[..end]);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Write for ResponseBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn test_fits() {
        let mut buffer = ResponseBuffer::with_capacity(16);
        write!(buffer, "{} + {}", 1, 2).unwrap();
        assert_eq!(buffer.as_str(), "1 + 2");
    }

    #[test]
    fn test_truncates_to_capacity_minus_one() {
        let mut buffer = ResponseBuffer::with_capacity(8);
        buffer.push_str("abcdefghij");
        assert_eq!(buffer.as_str(), "abcdefg");

        buffer.push_str("more");
        assert_eq!(buffer.as_str(), "abcdefg");
    }

    #[test]
    fn test_truncates_at_char_boundary() {
        let mut buffer = ResponseBuffer::with_capacity(5);
        // "aé" is 3 bytes, the second "é" would straddle the limit
        buffer.push_str("aéé");
        assert_eq!(buffer.as_str(), "aé");
    }
}
