//! Hex Codec for Byte Blobs
//!
//! Blobs cross the text shell as uppercase hex pairs. Decoding never fails:
//! characters that are not hex digits decode as zero and a trailing odd
//! character is dropped.

/// Converts a nibble to its uppercase hex digit. Values of 16 or more
/// become a space.
pub fn hex_char(nibble: u8) -> char {
    match nibble {
        0..=9 => (b'0' + nibble) as char,
        10..=15 => (b'A' + nibble - 10) as char,
        _ => ' ',
    }
}

/// Converts a hex digit to its value. Anything else decodes as zero.
pub fn parse_hex_char(c: char) -> u8 {
    match c {
        '0'..='9' => c as u8 - b'0',
        'A'..='F' => c as u8 - b'A' + 10,
        'a'..='f' => c as u8 - b'a' + 10,
        _ => 0,
    }
}

/// Encodes at most `max_bytes` leading bytes as uppercase hex.
pub fn encode(data: &[u8], max_bytes: usize) -> String {
    let mut text = String::with_capacity(data.len().min(max_bytes) * 2);
    for &byte in data.iter().take(max_bytes) {
        text.push(hex_char(byte >> 4));
        text.push(hex_char(byte & 0x0f));
    }
    text
}

/// Decodes hex pairs into bytes.
pub fn decode(text: &str) -> Vec<u8> {
    let digits: Vec<char> = text.chars().collect();
    digits
        .chunks_exact(2)
        .map(|pair| parse_hex_char(pair[0]) << 4 | parse_hex_char(pair[1]))
        .collect()
}
