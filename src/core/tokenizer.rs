//! HTML Tokenizer - State machine for markup token extraction
//!
//! Implements a pull-parser style tokenizer that extracts HTML tokens:
//! - Element start/end tags (attributes kept as written)
//! - Text content (never entity-decoded; the minifier writes it back verbatim)
//! - Raw text bodies of script/style/textarea/title and friends
//! - Comments, CDATA sections, DOCTYPE and other declarations
//!
//! Malformed spans are reported as `TokenError`; the caller decides whether
//! to abort or to continue with `recover`, which re-reads the offending '<'
//! as literal text. A terminator (`-->`, `]]>`, `>`) found missing once is
//! remembered, so recovering from a run of unterminated constructs stays
//! linear.

use super::attributes::{read_attributes, RawAttribute};
use super::scanner::Scanner;

/// Elements whose content is not markup, up to the matching end tag
const RAW_TEXT_ELEMENTS: [&str; 9] = [
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

/// Closing sequences searched for with no upper bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    CommentEnd,
    CDataEnd,
    TagEnd,
}

impl Terminator {
    const COUNT: usize = 3;

    #[inline]
    fn needle(self) -> &'static str {
        match self {
            Terminator::CommentEnd => "-->",
            Terminator::CDataEnd => "]]>",
            Terminator::TagEnd => ">",
        }
    }
}

/// Type of HTML token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind<'a> {
    /// `<name attr=value>` or `<name/>`
    StartTag {
        name: &'a str,
        attributes: Vec<RawAttribute<'a>>,
        self_closing: bool,
    },
    /// `</name>`
    EndTag { name: &'a str },
    /// Text between tags
    Text(&'a str),
    /// Body of a raw text element
    RawText(&'a str),
    /// Comment body, without `<!--` and `-->`
    Comment(&'a str),
    /// Full `<!DOCTYPE ...>` declaration
    Doctype(&'a str),
    /// Full `<![CDATA[...]]>` section
    CData(&'a str),
    /// Any other `<!...>` or `<?...>` construct, kept verbatim
    Declaration(&'a str),
}

/// A parsed token with its byte span in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    /// Raw span in input (start, end)
    pub span: (usize, usize),
}

/// A span the tokenizer cannot read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenError {
    pub message: &'static str,
    /// Byte offset of the '<' that opened the malformed construct
    pub position: usize,
}

/// HTML tokenizer implementing a pull-parser pattern
pub struct Tokenizer<'a> {
    scanner: Scanner<'a>,
    /// Name of the raw text element whose body comes next
    raw_text_of: Option<&'a str>,
    /// Per terminator, an offset from which it is known not to occur
    missing_from: [Option<usize>; Terminator::COUNT],
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer for the given input
    pub fn new(input: &'a str) -> Self {
        Tokenizer {
            scanner: Scanner::new(input),
            raw_text_of: None,
            missing_from: [None; Terminator::COUNT],
        }
    }

    /// Get the next token, or None at end of input
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, TokenError> {
        if self.scanner.is_eof() {
            return Ok(None);
        }

        if let Some(name) = self.raw_text_of.take() {
            if let Some(token) = self.parse_raw_text(name) {
                return Ok(Some(token));
            }
            if self.scanner.is_eof() {
                return Ok(None);
            }
        }

        if self.scanner.peek() == Some(b'<') {
            if let Some(token) = self.parse_markup()? {
                return Ok(Some(token));
            }
        }
        Ok(Some(self.parse_text()))
    }

    /// Continue after a `TokenError`: the '<' that started the bad span becomes text
    pub fn recover(&mut self, error: &TokenError) -> Token<'a> {
        let start = error.position;
        self.scanner.set_position(start + 1);
        self.raw_text_of = None;
        Token {
            kind: TokenKind::Text(self.scanner.slice(start, start + 1)),
            span: (start, start + 1),
        }
    }

    /// Parse markup starting with '<'; Ok(None) means the '<' is literal text
    fn parse_markup(&mut self) -> Result<Option<Token<'a>>, TokenError> {
        let start = self.scanner.position();
        match self.scanner.peek_at(1) {
            Some(b'/') if self.scanner.peek_at(2).is_some_and(|b| b.is_ascii_alphabetic()) => {
                self.parse_end_tag(start).map(Some)
            }
            Some(b'!') => self.parse_bang_markup(start).map(Some),
            Some(b'?') => self.parse_declaration(start, 2).map(Some),
            Some(b) if b.is_ascii_alphabetic() => self.parse_start_tag(start).map(Some),
            _ => Ok(None),
        }
    }

    fn error(&mut self, message: &'static str, position: usize) -> TokenError {
        self.scanner.set_position(position);
        TokenError { message, position }
    }

    /// Next occurrence of `terminator` at or after the current position
    fn find_terminator(&mut self, terminator: Terminator) -> Option<usize> {
        let from = self.scanner.position();
        let slot = terminator as usize;
        if self.missing_from[slot].is_some_and(|missing| from >= missing) {
            return None;
        }
        let found = match terminator {
            Terminator::TagEnd => self.scanner.find_byte(b'>'),
            _ => self.scanner.find_str(terminator.needle()),
        };
        if found.is_none() {
            self.missing_from[slot] = Some(from);
        }
        found
    }

    /// Parse a start tag or self-closing tag
    fn parse_start_tag(&mut self, start: usize) -> Result<Token<'a>, TokenError> {
        self.scanner.advance(1); // Skip '<'
        let name = match self.scanner.read_tag_name() {
            Some(name) => name,
            None => return Err(self.error("Invalid tag name", start)),
        };

        let tag = match read_attributes(&mut self.scanner) {
            Ok(tag) => tag,
            Err(msg) => return Err(self.error(msg, start)),
        };

        if !tag.self_closing
            && RAW_TEXT_ELEMENTS.iter().any(|raw| raw.eq_ignore_ascii_case(name))
        {
            self.raw_text_of = Some(name);
        }

        Ok(Token {
            kind: TokenKind::StartTag {
                name,
                attributes: tag.attributes,
                self_closing: tag.self_closing,
            },
            span: (start, self.scanner.position()),
        })
    }

    /// Parse an end tag
    fn parse_end_tag(&mut self, start: usize) -> Result<Token<'a>, TokenError> {
        self.scanner.advance(2); // Skip '</'
        let name = match self.scanner.read_tag_name() {
            Some(name) => name,
            None => return Err(self.error("Invalid end tag name", start)),
        };

        // Anything between the name and '>' is ignored, as browsers do
        let end = match self.find_terminator(Terminator::TagEnd) {
            Some(end) => end,
            None => return Err(self.error("Unterminated end tag", start)),
        };
        self.scanner.set_position(end + 1);

        Ok(Token {
            kind: TokenKind::EndTag { name },
            span: (start, end + 1),
        })
    }

    /// Parse markup starting with '<!' (comment, CDATA, DOCTYPE, other declarations)
    fn parse_bang_markup(&mut self, start: usize) -> Result<Token<'a>, TokenError> {
        self.scanner.advance(2); // Skip '<!'

        if self.scanner.starts_with(b"--") {
            self.parse_comment(start)
        } else if self.scanner.starts_with(b"[CDATA[") {
            self.parse_cdata(start)
        } else if self.scanner.starts_with_ignore_case(b"doctype") {
            let token = self.parse_declaration(start, 0)?;
            let raw = self.scanner.slice(token.span.0, token.span.1);
            Ok(Token { kind: TokenKind::Doctype(raw), span: token.span })
        } else {
            self.parse_declaration(start, 0)
        }
    }

    /// Parse a comment <!--...-->
    fn parse_comment(&mut self, start: usize) -> Result<Token<'a>, TokenError> {
        self.scanner.advance(2); // Skip '--'
        let content_start = self.scanner.position();

        let end = match self.find_terminator(Terminator::CommentEnd) {
            Some(end) => end,
            None => return Err(self.error("Unterminated comment", start)),
        };
        let content = self.scanner.slice(content_start, end);
        self.scanner.set_position(end + 3);

        Ok(Token {
            kind: TokenKind::Comment(content),
            span: (start, end + 3),
        })
    }

    /// Parse a CDATA section <![CDATA[...]]>
    fn parse_cdata(&mut self, start: usize) -> Result<Token<'a>, TokenError> {
        let end = match self.find_terminator(Terminator::CDataEnd) {
            Some(end) => end,
            None => return Err(self.error("Unterminated CDATA section", start)),
        };
        self.scanner.set_position(end + 3);

        Ok(Token {
            kind: TokenKind::CData(self.scanner.slice(start, end + 3)),
            span: (start, end + 3),
        })
    }

    /// Parse `<?...>` or `<!...>` up to the next '>'
    fn parse_declaration(&mut self, start: usize, skip: usize) -> Result<Token<'a>, TokenError> {
        self.scanner.advance(skip);
        let end = match self.find_terminator(Terminator::TagEnd) {
            Some(end) => end,
            None => return Err(self.error("Unterminated declaration", start)),
        };
        self.scanner.set_position(end + 1);

        Ok(Token {
            kind: TokenKind::Declaration(self.scanner.slice(start, end + 1)),
            span: (start, end + 1),
        })
    }

    /// Parse the body of a raw text element, up to but excluding its end tag
    fn parse_raw_text(&mut self, name: &'a str) -> Option<Token<'a>> {
        let start = self.scanner.position();
        let end = if name.eq_ignore_ascii_case("plaintext") {
            self.scanner.input().len()
        } else {
            self.scanner
                .find_raw_text_end(name)
                .unwrap_or(self.scanner.input().len())
        };
        if end == start {
            return None;
        }
        self.scanner.set_position(end);

        Some(Token {
            kind: TokenKind::RawText(self.scanner.slice(start, end)),
            span: (start, end),
        })
    }

    /// Parse text content up to the next markup
    fn parse_text(&mut self) -> Token<'a> {
        let start = self.scanner.position();

        // Skip a leading '<' that turned out to be literal
        self.scanner.advance(1);
        let end = self
            .scanner
            .find_markup_start()
            .unwrap_or(self.scanner.input().len());
        self.scanner.set_position(end);

        Token {
            kind: TokenKind::Text(self.scanner.slice(start, end)),
            span: (start, end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<TokenKind<'_>> {
        let mut tokenizer = Tokenizer::new(input);
        let mut out = Vec::new();
        while let Some(token) = tokenizer.next_token().unwrap() {
            out.push(token.kind);
        }
        out
    }

    #[test]
    fn test_simple_element() {
        let toks = tokens("<p class=\"a\">Hi</p>");
        assert_eq!(toks.len(), 3);
        assert!(matches!(&toks[0], TokenKind::StartTag { name: "p", attributes, self_closing: false } if attributes.len() == 1));
        assert_eq!(toks[1], TokenKind::Text("Hi"));
        assert_eq!(toks[2], TokenKind::EndTag { name: "p" });
    }

    #[test]
    fn test_literal_lt_in_text() {
        let toks = tokens("a < b<br>");
        assert_eq!(toks[0], TokenKind::Text("a < b"));
        assert!(matches!(toks[1], TokenKind::StartTag { name: "br", .. }));
    }

    #[test]
    fn test_text_starting_with_literal_lt() {
        let toks = tokens("<3 you");
        assert_eq!(toks, vec![TokenKind::Text("<3 you")]);
    }

    #[test]
    fn test_raw_text() {
        let toks = tokens("<script>if (a<b) { x = '</p>'; }</script>");
        assert_eq!(toks[1], TokenKind::RawText("if (a<b) { x = '</p>'; }"));
        assert_eq!(toks[2], TokenKind::EndTag { name: "script" });
    }

    #[test]
    fn test_empty_raw_text() {
        let toks = tokens("<textarea></textarea>");
        assert_eq!(toks.len(), 2);
    }

    #[test]
    fn test_comment_doctype_cdata() {
        let toks = tokens("<!DOCTYPE html><!-- hi --><![CDATA[x]]><?php echo 1 ?>");
        assert_eq!(toks[0], TokenKind::Doctype("<!DOCTYPE html>"));
        assert_eq!(toks[1], TokenKind::Comment(" hi "));
        assert_eq!(toks[2], TokenKind::CData("<![CDATA[x]]>"));
        assert_eq!(toks[3], TokenKind::Declaration("<?php echo 1 ?>"));
    }

    #[test]
    fn test_unterminated_start_tag() {
        let mut tokenizer = Tokenizer::new("ok <div class=\"x");
        assert!(matches!(tokenizer.next_token(), Ok(Some(_))));
        let err = tokenizer.next_token().unwrap_err();
        assert_eq!(err.position, 3);
        assert_eq!(err.message, "Unterminated attribute value");
    }

    #[test]
    fn test_missing_terminator_remembered() {
        let input = "<!-- ".repeat(3);
        let mut tokenizer = Tokenizer::new(&input);
        let mut errors = 0;
        loop {
            match tokenizer.next_token() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(err) => {
                    errors += 1;
                    tokenizer.recover(&err);
                }
            }
        }
        assert_eq!(errors, 3);
        assert_eq!(tokenizer.missing_from[Terminator::CommentEnd as usize], Some(4));
    }

    #[test]
    fn test_recover() {
        let mut tokenizer = Tokenizer::new("<div");
        let err = tokenizer.next_token().unwrap_err();
        let token = tokenizer.recover(&err);
        assert_eq!(token.kind, TokenKind::Text("<"));
        let rest = tokenizer.next_token().unwrap().unwrap();
        assert_eq!(rest.kind, TokenKind::Text("div"));
        assert!(tokenizer.next_token().unwrap().is_none());
    }
}
