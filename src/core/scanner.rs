//! SIMD-accelerated markup scanning using memchr
//!
//! Uses memchr crate for fast byte searching with SIMD acceleration:
//! - SSE2 (default x86_64)
//! - AVX2 (runtime detection)
//! - NEON (aarch64)
//!
//! Every position the scanner stops at is an ASCII delimiter, so slices
//! handed out are always on UTF-8 character boundaries.

use memchr::{memchr, memmem};

/// Scanner for markup delimiter detection
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner for the given input
    #[inline]
    pub fn new(input: &'a str) -> Self {
        Scanner { input, pos: 0 }
    }

    /// The whole input
    #[inline]
    pub fn input(&self) -> &'a str {
        self.input
    }

    /// Get the current position
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Set the current position
    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Check if we've reached the end
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    /// Get a slice from start to end positions
    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.input[start..end]
    }

    /// Peek at current byte without advancing
    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    /// Peek at byte at offset from current position
    #[inline]
    pub fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes().get(self.pos + offset).copied()
    }

    /// Advance by n bytes
    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    /// Skip HTML whitespace (space, tab, newline, carriage return, form feed)
    #[inline]
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if is_html_space(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Find next occurrence of a specific byte
    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, &self.bytes()[self.pos..]).map(|i| self.pos + i)
    }

    /// Find next occurrence of a byte sequence
    #[inline]
    pub fn find_str(&self, needle: &str) -> Option<usize> {
        memmem::find(&self.bytes()[self.pos..], needle.as_bytes()).map(|i| self.pos + i)
    }

    /// Find the next '<' that opens markup (tag, end tag, comment or declaration)
    ///
    /// A '<' followed by anything else is literal text, as in `a < b`.
    pub fn find_markup_start(&self) -> Option<usize> {
        let bytes = self.bytes();
        let mut from = self.pos;
        while let Some(i) = memchr(b'<', &bytes[from..]) {
            let at = from + i;
            match bytes.get(at + 1) {
                Some(b) if b.is_ascii_alphabetic() || *b == b'!' || *b == b'?' => return Some(at),
                Some(b'/') => {
                    if bytes.get(at + 2).is_some_and(|b| b.is_ascii_alphabetic()) {
                        return Some(at);
                    }
                }
                _ => {}
            }
            from = at + 1;
        }
        None
    }

    /// Find the end tag `</name` (ASCII case-insensitive) that terminates a raw text element
    pub fn find_raw_text_end(&self, name: &str) -> Option<usize> {
        let bytes = self.bytes();
        let name = name.as_bytes();
        let mut from = self.pos;
        while let Some(i) = memmem::find(&bytes[from..], b"</") {
            let at = from + i;
            let name_end = at + 2 + name.len();
            if name_end <= bytes.len()
                && bytes[at + 2..name_end].eq_ignore_ascii_case(name)
                && bytes
                    .get(name_end)
                    .map_or(true, |&b| is_html_space(b) || b == b'/' || b == b'>')
            {
                return Some(at);
            }
            from = at + 2;
        }
        None
    }

    /// Check if input starts with a byte sequence at current position
    #[inline]
    pub fn starts_with(&self, needle: &[u8]) -> bool {
        self.bytes()[self.pos..].starts_with(needle)
    }

    /// Check if input starts with an ASCII sequence, ignoring case
    #[inline]
    pub fn starts_with_ignore_case(&self, needle: &[u8]) -> bool {
        let rest = &self.bytes()[self.pos..];
        rest.len() >= needle.len() && rest[..needle.len()].eq_ignore_ascii_case(needle)
    }

    /// Read a tag name: everything up to whitespace, '/' or '>'
    pub fn read_tag_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() => {}
            _ => return None,
        }
        while let Some(b) = self.peek() {
            if is_html_space(b) || b == b'/' || b == b'>' {
                break;
            }
            self.pos += 1;
        }
        Some(&self.input[start..self.pos])
    }

    /// Read an attribute name: everything up to whitespace, '/', '>' or '='
    ///
    /// A leading '=' is part of the name, matching how browsers recover.
    pub fn read_attr_name(&mut self) -> Option<&'a str> {
        let start = self.pos;
        if self.peek() == Some(b'=') {
            self.pos += 1;
        }
        while let Some(b) = self.peek() {
            if is_html_space(b) || b == b'/' || b == b'>' || b == b'=' {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            None
        } else {
            Some(&self.input[start..self.pos])
        }
    }
}

/// Check if byte is HTML whitespace
#[inline]
pub fn is_html_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C')
}
