//! Lenient Text-to-Number Conversion
//!
//! Values arrive as free text from a serial terminal. Conversion reads the
//! longest numeric prefix and ignores the rest, and text without one
//! converts to zero. Nothing here fails.

/// Parses a leading decimal integer: optional whitespace, an optional sign,
/// then digits. Overflow wraps.
///
/// ```
/// use prefcli::commands::convert::parse_integer;
///
/// assert_eq!(parse_integer("  -42abc"), -42);
/// assert_eq!(parse_integer("abc"), 0);
/// ```
pub fn parse_integer(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.wrapping_mul(10).wrapping_add(i64::from(b - b'0'));
    }

    if negative {
        value.wrapping_neg()
    } else {
        value
    }
}

/// Parses a leading decimal floating-point number, including an optional
/// fraction and exponent.
///
/// ```
/// use prefcli::commands::convert::parse_float;
///
/// assert_eq!(parse_float("3.25V"), 3.25);
/// assert_eq!(parse_float("-1e3"), -1000.0);
/// assert_eq!(parse_float("volts"), 0.0);
/// ```
pub fn parse_float(text: &str) -> f64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end += 1;
    }

    let int_start = end;
    end += count_digits(&bytes[end..]);
    let mut mantissa_digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let fraction = count_digits(&bytes[end + 1..]);
        mantissa_digits += fraction;
        if mantissa_digits > 0 {
            end += 1 + fraction;
        }
    }

    if mantissa_digits == 0 {
        return 0.0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'-' | b'+')) {
            exp_end += 1;
        }
        let exp_digits = count_digits(&bytes[exp_end.min(bytes.len())..]);
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }

    text[..end].parse().unwrap_or(0.0)
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| b.is_ascii_digit()).count()
}
