//! HTML Attribute Lexing
//!
//! Reads the attributes of a start tag straight off the scanner, keeping
//! values exactly as written (no entity decoding) and remembering which
//! quote character delimited each value.

use super::scanner::{is_html_space, Scanner};

/// A lexed attribute, borrowed from the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute<'a> {
    /// Attribute name as written
    pub name: &'a str,
    /// Value as written, without delimiters; None for `<input disabled>`
    pub value: Option<&'a str>,
    /// Delimiting quote character, if the value was quoted
    pub quote: Option<u8>,
}

/// Result of lexing the rest of a start tag
#[derive(Debug)]
pub struct TagAttributes<'a> {
    pub attributes: Vec<RawAttribute<'a>>,
    /// Tag ended with `/>`
    pub self_closing: bool,
}

/// Lex attributes up to and including the closing '>' of a start tag
///
/// The scanner must sit right after the tag name. On success it is left
/// just past the '>'.
pub fn read_attributes<'a>(scanner: &mut Scanner<'a>) -> Result<TagAttributes<'a>, &'static str> {
    let mut attributes = Vec::new();

    loop {
        scanner.skip_whitespace();

        match scanner.peek() {
            None => return Err("Unterminated start tag"),
            Some(b'>') => {
                scanner.advance(1);
                return Ok(TagAttributes { attributes, self_closing: false });
            }
            Some(b'/') => {
                if scanner.peek_at(1) == Some(b'>') {
                    scanner.advance(2);
                    return Ok(TagAttributes { attributes, self_closing: true });
                }
                // Stray slash between attributes
                scanner.advance(1);
                continue;
            }
            Some(_) => {}
        }

        let name = match scanner.read_attr_name() {
            Some(name) => name,
            None => {
                scanner.advance(1);
                continue;
            }
        };

        // Look past whitespace for '='
        let after_name = scanner.position();
        scanner.skip_whitespace();
        if scanner.peek() != Some(b'=') {
            scanner.set_position(after_name);
            attributes.push(RawAttribute { name, value: None, quote: None });
            continue;
        }
        scanner.advance(1); // Skip '='
        scanner.skip_whitespace();

        match scanner.peek() {
            None => return Err("Unterminated start tag"),
            Some(quote @ (b'"' | b'\'')) => {
                scanner.advance(1);
                let value_start = scanner.position();
                let value_end = scanner
                    .find_byte(quote)
                    .ok_or("Unterminated attribute value")?;
                attributes.push(RawAttribute {
                    name,
                    value: Some(scanner.slice(value_start, value_end)),
                    quote: Some(quote),
                });
                scanner.set_position(value_end + 1);
            }
            Some(b'>') => {
                // `<a href=>`: empty unquoted value
                attributes.push(RawAttribute { name, value: Some(""), quote: None });
            }
            Some(_) => {
                // Unquoted values run to whitespace or '>', so `href=a/` keeps its slash
                let value_start = scanner.position();
                while let Some(b) = scanner.peek() {
                    if is_html_space(b) || b == b'>' {
                        break;
                    }
                    scanner.advance(1);
                }
                attributes.push(RawAttribute {
                    name,
                    value: Some(scanner.slice(value_start, scanner.position())),
                    quote: None,
                });
            }
        }
    }
}
