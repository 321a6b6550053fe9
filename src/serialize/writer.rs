//! Output buffer with optional line wrapping
//!
//! The serializer pushes output in indivisible pieces (a tag name, an
//! attribute with its value, a text run) and marks the boundaries where a
//! newline is allowed. When a line grows past the limit, a newline goes in at
//! the last allowed boundary on that line. A piece longer than the limit is
//! never split.

/// How a newline is placed at a break point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Break {
    /// Insert a newline before the byte at this offset
    Insert(usize),
    /// Replace the separating space at this offset with a newline
    Replace(usize),
}

impl Break {
    #[inline]
    fn offset(self) -> usize {
        match self {
            Break::Insert(at) | Break::Replace(at) => at,
        }
    }
}

/// String builder that wraps lines at marked boundaries
#[derive(Debug)]
pub struct LineWriter {
    out: String,
    max: Option<usize>,
    /// Byte offset where the current line starts
    line_start: usize,
    /// Characters on the current line
    line_chars: usize,
    last_break: Option<Break>,
}

impl LineWriter {
    pub fn new(capacity: usize, max_line_length: Option<usize>) -> Self {
        LineWriter {
            out: String::with_capacity(capacity),
            max: max_line_length,
            line_start: 0,
            line_chars: 0,
            last_break: None,
        }
    }

    /// A newline may go right here
    #[inline]
    pub fn mark_break(&mut self) {
        if self.max.is_some() && self.out.len() > self.line_start {
            self.last_break = Some(Break::Insert(self.out.len()));
        }
    }

    /// Write a separating space that may become a newline
    pub fn push_separator(&mut self) {
        if self.max.is_some() && self.out.len() > self.line_start {
            self.last_break = Some(Break::Replace(self.out.len()));
        }
        self.push_str(" ");
    }

    pub fn push(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.push_str(c.encode_utf8(&mut buf));
    }

    pub fn push_str(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        self.out.push_str(s);
        if self.max.is_none() {
            return;
        }
        match s.rfind('\n') {
            Some(nl) => {
                self.line_start = self.out.len() - s.len() + nl + 1;
                self.line_chars = self.out[self.line_start..].chars().count();
                self.last_break = None;
            }
            None => self.line_chars += s.chars().count(),
        }
        self.wrap();
    }

    fn wrap(&mut self) {
        let Some(max) = self.max else {
            return;
        };
        while self.line_chars > max {
            let Some(brk) = self.last_break.take() else {
                return;
            };
            if brk.offset() <= self.line_start {
                return;
            }
            let next_line = match brk {
                Break::Insert(at) => {
                    self.out.insert(at, '\n');
                    at + 1
                }
                Break::Replace(at) => {
                    self.out.replace_range(at..at + 1, "\n");
                    at + 1
                }
            };
            self.line_start = next_line;
            self.line_chars = self.out[next_line..].chars().count();
        }
    }

    pub fn finish(self) -> String {
        self.out
    }
}
