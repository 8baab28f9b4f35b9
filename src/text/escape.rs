//! Non-ASCII escaping
//!
//! Some stores cannot round-trip arbitrary non-ASCII bytes, so assembled
//! text can be reduced to printable 7-bit ASCII. Everything outside
//! `0x20..=0x7E` becomes `\uXXXX` (BMP) or `\UXXXXXXXX`.

use std::borrow::Cow;
use std::fmt::Write;

pub fn is_printable_ascii(c: char) -> bool {
    matches!(c, ' '..='~')
}

/// Escape characters outside the printable ASCII range
pub fn escape_non_ascii(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_printable_ascii) {
        return Cow::Borrowed(text);
    }

    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        push_escaped(&mut escaped, c);
    }
    Cow::Owned(escaped)
}

/// Append `c`, escaped when outside printable ASCII
pub fn push_escaped(out: &mut String, c: char) {
    if is_printable_ascii(c) {
        out.push(c);
    } else if (c as u32) <= 0xFFFF {
        // Writing to a String cannot fail
        let _ = write!(out, "\\u{:04x}", c as u32);
    } else {
        let _ = write!(out, "\\U{:08x}", c as u32);
    }
}

/// Decode an escape sequence at the start of `chars`
///
/// Returns the character and the sequence length in chars.
pub fn decode_escape(chars: &[char]) -> Option<(char, usize)> {
    let digits = match chars {
        ['\\', 'u', ..] => 4,
        ['\\', 'U', ..] => 8,
        _ => return None,
    };
    let hex = chars.get(2..2 + digits)?;
    let mut value = 0u32;
    for c in hex {
        value = value * 16 + c.to_digit(16)?;
    }
    char::from_u32(value).map(|c| (c, 2 + digits))
}

/// Apply escaping only when enabled
pub fn maybe_escape(text: &str, escape_non_ascii_chars: bool) -> Cow<'_, str> {
    if escape_non_ascii_chars {
        escape_non_ascii(text)
    } else {
        Cow::Borrowed(text)
    }
}
