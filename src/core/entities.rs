//! HTML Character Reference Handling
//!
//! Decoding of the character references that commonly appear in attribute
//! values, and the escaping needed to write a value back out safely:
//! - Named references: &lt; &gt; &amp; &quot; &apos; and common HTML5 names
//! - Numeric references: &#123; &#x7B;
//!
//! Uses Cow for zero-copy when nothing needs rewriting.

use memchr::{memchr, memchr2};
use std::borrow::Cow;

/// Decode character references in an attribute value
///
/// Returns Borrowed if no references present (zero-copy).
/// Unknown or unterminated references are kept as written.
#[inline]
pub fn decode_text(input: &str) -> Cow<'_, str> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    Cow::Owned(decode_entities(input))
}

/// Decode all entity references in the input
pub fn decode_entities(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut result = String::with_capacity(input.len());
    let mut pos = 0;

    while pos < bytes.len() {
        if let Some(amp_pos) = memchr(b'&', &bytes[pos..]) {
            // Copy everything before the entity
            result.push_str(&input[pos..pos + amp_pos]);
            pos += amp_pos;

            // References longer than this are not worth a lookup
            let window_end = (pos + 12).min(bytes.len());
            if let Some(semi_offset) = memchr(b';', &bytes[pos..window_end]) {
                let entity = &input[pos + 1..pos + semi_offset];
                if let Some(decoded) = decode_entity(entity) {
                    result.push(decoded);
                    pos += semi_offset + 1;
                    continue;
                }
            }
            result.push('&');
            pos += 1;
        } else {
            result.push_str(&input[pos..]);
            break;
        }
    }

    result
}

/// Decode a single entity (without & and ;)
fn decode_entity(entity: &str) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix('#') {
        return decode_numeric_entity(numeric);
    }

    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        "copy" => Some('\u{00A9}'),
        "reg" => Some('\u{00AE}'),
        "trade" => Some('\u{2122}'),
        "mdash" => Some('\u{2014}'),
        "ndash" => Some('\u{2013}'),
        "lsquo" => Some('\u{2018}'),
        "rsquo" => Some('\u{2019}'),
        "ldquo" => Some('\u{201C}'),
        "rdquo" => Some('\u{201D}'),
        "hellip" => Some('\u{2026}'),
        _ => None,
    }
}

/// Decode a numeric character reference
fn decode_numeric_entity(entity: &str) -> Option<char> {
    let codepoint = if let Some(hex) = entity.strip_prefix(['x', 'X']) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.parse::<u32>().ok()?
    };

    // NUL and surrogates never decode to themselves
    if codepoint == 0 {
        return None;
    }
    char::from_u32(codepoint)
}

/// Re-escape '&' where the decoded text would otherwise read as a reference
///
/// `&` followed by an ASCII alphanumeric or '#' becomes `&amp;`.
pub fn escape_ambiguous_ampersands(input: &str) -> Cow<'_, str> {
    let bytes = input.as_bytes();
    let ambiguous = |i: usize| {
        bytes
            .get(i + 1)
            .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'#')
    };
    if !(0..bytes.len()).any(|i| bytes[i] == b'&' && ambiguous(i)) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + 8);
    let mut last = 0;
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'&' && ambiguous(i) {
            out.push_str(&input[last..i]);
            out.push_str("&amp;");
            last = i + 1;
        }
    }
    out.push_str(&input[last..]);
    Cow::Owned(out)
}

/// Numeric reference used for a quote character inside a value
#[inline]
pub fn quote_reference(quote: u8) -> &'static str {
    if quote == b'\'' {
        "&#39;"
    } else {
        "&#34;"
    }
}

/// Escape every occurrence of `quote` in `value` with a numeric reference
pub fn escape_quote(value: &str, quote: u8) -> Cow<'_, str> {
    if memchr(quote, value.as_bytes()).is_none() {
        return Cow::Borrowed(value);
    }
    Cow::Owned(value.replace(quote as char, quote_reference(quote)))
}

/// Count double and single quotes in a value
#[inline]
pub fn count_quotes(value: &str) -> (usize, usize) {
    let bytes = value.as_bytes();
    let mut doubles = 0;
    let mut singles = 0;
    let mut pos = 0;
    while let Some(i) = memchr2(b'"', b'\'', &bytes[pos..]) {
        if bytes[pos + i] == b'"' {
            doubles += 1;
        } else {
            singles += 1;
        }
        pos += i + 1;
    }
    (doubles, singles)
}
