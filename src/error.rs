//! Error taxonomy for the minification pipeline
//!
//! Every failure the pipeline can surface is one of four classes:
//! - ParseError: markup the tokenizer cannot make sense of
//! - DelegateMinifyError: a script/style/JSON/URL delegate failed
//! - ConfigError: an option value cannot be interpreted
//! - InputLimitExceeded: the input is longer than `max_input_length`

use std::fmt::Display;

use memchr::{memchr_iter, memrchr};

/// Number of bytes of offending input quoted in a parse error
pub(crate) const SNIPPET_LEN: usize = 48;

/// Malformed markup, with the 1-based position of the offending span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    message: String,
    line: usize,
    column: usize,
    snippet: String,
}

impl ParseError {
    /// Build an error from a byte offset into `source`
    pub fn new(message: impl Into<String>, source: &str, byte_idx: usize) -> Self {
        let byte_idx = floor_char_boundary(source, byte_idx.min(source.len()));
        let (line, column) = advance_position((1, 1), &source[..byte_idx]);
        Self::at(message, (line, column), &source[byte_idx..])
    }

    /// Build an error at a known line and column; `rest` is the input from there on
    pub(crate) fn at(message: impl Into<String>, (line, column): (usize, usize), rest: &str) -> Self {
        let snippet_end = floor_char_boundary(rest, SNIPPET_LEN.min(rest.len()));
        ParseError {
            message: message.into(),
            line,
            column,
            snippet: rest[..snippet_end].to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Line and column of the offending span, both 1-based
    pub fn line_and_column(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    /// The first few characters of the offending span
    pub fn snippet(&self) -> &str {
        &self.snippet
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {} near {:?}", self.line, self.column, self.message, self.snippet)
    }
}

impl std::error::Error for ParseError {}

/// Failure reported by an external minifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateMinifyError {
    /// Which delegate failed ("js", "css", "json", "url" or "html")
    pub delegate: &'static str,
    /// Where the content came from, e.g. `<script>` or `style` attribute of `<div>`
    pub site: String,
    pub message: String,
}

impl Display for DelegateMinifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} minifier failed on {}: {}", self.delegate, self.site, self.message)
    }
}

impl std::error::Error for DelegateMinifyError {}

/// An option value that cannot be interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub option: &'static str,
    pub message: String,
}

impl ConfigError {
    pub fn new(option: &'static str, message: impl Into<String>) -> Self {
        ConfigError {
            option,
            message: message.into(),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid option `{}`: {}", self.option, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Any error surfaced by `minify`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MinifyError {
    Parse(ParseError),
    Delegate(DelegateMinifyError),
    Config(ConfigError),
    InputLimitExceeded { limit: usize, actual: usize },
}

impl Display for MinifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MinifyError::Parse(e) => write!(f, "parse error: {}", e),
            MinifyError::Delegate(e) => write!(f, "{}", e),
            MinifyError::Config(e) => write!(f, "{}", e),
            MinifyError::InputLimitExceeded { limit, actual } => {
                write!(f, "input length {} exceeds the limit of {}", actual, limit)
            }
        }
    }
}

impl std::error::Error for MinifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MinifyError::Parse(e) => Some(e),
            MinifyError::Delegate(e) => Some(e),
            MinifyError::Config(e) => Some(e),
            MinifyError::InputLimitExceeded { .. } => None,
        }
    }
}

impl From<ParseError> for MinifyError {
    fn from(e: ParseError) -> Self {
        MinifyError::Parse(e)
    }
}

impl From<DelegateMinifyError> for MinifyError {
    fn from(e: DelegateMinifyError) -> Self {
        MinifyError::Delegate(e)
    }
}

impl From<ConfigError> for MinifyError {
    fn from(e: ConfigError) -> Self {
        MinifyError::Config(e)
    }
}

/// Line and column reached after reading `text` from `(line, column)`
pub(crate) fn advance_position((line, column): (usize, usize), text: &str) -> (usize, usize) {
    match memrchr(b'\n', text.as_bytes()) {
        Some(last) => {
            let newlines = memchr_iter(b'\n', text.as_bytes()).count();
            (line + newlines, text[last + 1..].chars().count() + 1)
        }
        None => (line, column + text.chars().count()),
    }
}

#[inline]
pub(crate) fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
