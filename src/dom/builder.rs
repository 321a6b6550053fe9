//! Tree builder - Structural Parser
//!
//! Reads tokens from the tokenizer and builds the arena tree:
//! - Start tags close the current element while the policy table says the
//!   new tag closes it (`<li>` after `<li>`, `<tr>` after `<td>`, ...)
//! - End tags close the nearest open element of the same name; anything
//!   opened inside it is closed implicitly
//! - Stray end tags are kept as markup in partial mode, otherwise dropped
//!   (`</p>` and `</br>` become elements, as browsers do)
//! - Placeholder tokens in text and ignore-block comments become
//!   `Placeholder` nodes
//!
//! Malformed markup either aborts with a positioned `ParseError` or, with
//! `continue_on_parse_error`, is read back as literal text and reported as a
//! diagnostic.

use crate::core::tokenizer::{Token, TokenError, TokenKind, Tokenizer};
use crate::error::{advance_position, floor_char_boundary, MinifyError, ParseError, SNIPPET_LEN};
use crate::guard::{restore, RestorationMap};
use crate::options::Options;
use crate::policy::{self, ElementPolicy, Mode};

use super::document::Document;
use super::node::{Attribute, Closure, Comment, Element, NodeId, NodeKind};

/// Parse guarded markup into a document
///
/// Returns the tree and the diagnostics of recovered parse errors.
pub fn parse(
    guarded: &str,
    options: &Options,
    map: &RestorationMap,
) -> Result<(Document, Vec<ParseError>), MinifyError> {
    let mut builder = TreeBuilder::new(options, map);
    let mut tokenizer = Tokenizer::new(guarded);
    let mut locator = Locator::new(guarded, map);

    loop {
        let token = match tokenizer.next_token() {
            Ok(Some(token)) => token,
            Ok(None) => break,
            Err(err) => {
                let error = locator.locate(&err);
                if !options.continue_on_parse_error {
                    return Err(MinifyError::Parse(error));
                }
                log::warn!("recovered from parse error: {}", error);
                builder.diagnostics.push(error);
                tokenizer.recover(&err)
            }
        };
        builder.process(guarded, token);
    }

    Ok(builder.finish())
}

/// Positions tokenizer errors in the caller's text, not the guarded one
///
/// Errors arrive in input order, so line and column are carried forward
/// from the previous error instead of being recounted from the start.
struct Locator<'a> {
    guarded: &'a str,
    map: &'a RestorationMap,
    /// Guarded offset the position below belongs to
    offset: usize,
    position: (usize, usize),
}

impl<'a> Locator<'a> {
    fn new(guarded: &'a str, map: &'a RestorationMap) -> Self {
        Locator {
            guarded,
            map,
            offset: 0,
            position: (1, 1),
        }
    }

    fn locate(&mut self, err: &TokenError) -> ParseError {
        let at = floor_char_boundary(self.guarded, err.position.clamp(self.offset, self.guarded.len()));
        let passed = restore(&self.guarded[self.offset..at], self.map);
        self.position = advance_position(self.position, &passed);
        self.offset = at;

        // end the snippet on a word boundary so no token is cut in half
        let bytes = self.guarded.as_bytes();
        let mut end = floor_char_boundary(self.guarded, (at + SNIPPET_LEN).min(bytes.len()));
        while end < bytes.len() && bytes[end].is_ascii_alphanumeric() {
            end += 1;
        }
        ParseError::at(err.message, self.position, &restore(&self.guarded[at..end], self.map))
    }
}

struct TreeBuilder<'o> {
    doc: Document,
    /// Open elements, innermost last
    open: Vec<NodeId>,
    options: &'o Options,
    map: &'o RestorationMap,
    mode: Mode,
    diagnostics: Vec<ParseError>,
}

impl<'o> TreeBuilder<'o> {
    fn new(options: &'o Options, map: &'o RestorationMap) -> Self {
        TreeBuilder {
            doc: Document::new(),
            open: Vec::new(),
            options,
            map,
            mode: Mode {
                case_sensitive: options.case_sensitive,
                html5: options.html5,
            },
            diagnostics: Vec::new(),
        }
    }

    #[inline]
    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or_else(|| self.doc.root())
    }

    fn current_is_foreign(&self) -> bool {
        self.open
            .last()
            .and_then(|&id| self.doc.element(id))
            .is_some_and(|e| e.is_foreign)
    }

    fn policy_of(&self, id: NodeId) -> ElementPolicy {
        match self.doc.element(id) {
            Some(e) if e.is_foreign => policy::foreign_policy(),
            Some(e) => policy::lookup(&e.name, self.mode),
            None => policy::DEFAULT_POLICY,
        }
    }

    /// Names the table can match in the current case mode
    #[inline]
    fn is_table_name(&self, name: &str) -> bool {
        !(self.mode.case_sensitive && name.bytes().any(|b| b.is_ascii_uppercase()))
    }

    fn names_match(&self, a: &str, b: &str) -> bool {
        if self.options.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }

    fn process(&mut self, source: &str, token: Token<'_>) {
        match token.kind {
            TokenKind::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let attrs = attributes
                    .into_iter()
                    .map(|raw| Attribute {
                        name: raw.name.to_string(),
                        value: raw.value.map(str::to_string),
                        original_quote: raw.quote,
                    })
                    .collect();
                self.start_tag(name, attrs, self_closing);
            }
            TokenKind::EndTag { name } => {
                let raw = &source[token.span.0..token.span.1];
                self.end_tag(name, raw);
            }
            TokenKind::Text(text) => self.text(text),
            TokenKind::RawText(text) => self.append_text(text),
            TokenKind::Comment(body) => self.comment(body),
            TokenKind::Doctype(raw) => {
                let parent = self.current();
                self.doc.append(parent, NodeKind::Doctype(raw.to_string()));
            }
            TokenKind::CData(raw) | TokenKind::Declaration(raw) => {
                let parent = self.current();
                self.doc.append(parent, NodeKind::Markup(raw.to_string()));
            }
        }
    }

    fn start_tag(&mut self, raw_name: &str, mut attrs: Vec<Attribute>, self_closing: bool) {
        let is_foreign = self.current_is_foreign() || policy::is_foreign_root(raw_name);
        let keep_case = is_foreign || self.options.case_sensitive;
        let name = if keep_case {
            raw_name.to_string()
        } else {
            raw_name.to_ascii_lowercase()
        };
        if !keep_case {
            for attr in &mut attrs {
                attr.name.make_ascii_lowercase();
            }
        }

        if !self.current_is_foreign() && self.is_table_name(&name) {
            while let Some(&top) = self.open.last() {
                if !self.policy_of(top).is_closed_by(&name) {
                    break;
                }
                self.close_top(Closure::Implied);
            }
        }

        if !is_foreign && name.eq_ignore_ascii_case("tr") {
            self.imply_table_body();
        }

        let is_void = !is_foreign && policy::is_void(&name);
        let closure = if is_void || self_closing {
            Closure::SelfContained
        } else {
            // Settled when the element is closed
            Closure::Unclosed
        };
        let parent = self.current();
        let id = self.doc.append(
            parent,
            NodeKind::Element(Element {
                name,
                attrs,
                is_foreign,
                is_void,
                self_closing_slash: self_closing,
                closure,
                implied_start: false,
            }),
        );
        if closure != Closure::SelfContained {
            self.open.push(id);
        }
    }

    /// A row directly inside a table gets the row group browsers create for it
    fn imply_table_body(&mut self) {
        let in_table = self
            .open
            .last()
            .and_then(|&id| self.doc.element(id))
            .is_some_and(|e| !e.is_foreign && self.names_match(&e.name, "table"));
        if !in_table {
            return;
        }
        let parent = self.current();
        let tbody = self.doc.append(
            parent,
            NodeKind::Element(Element {
                name: "tbody".to_string(),
                attrs: Vec::new(),
                is_foreign: false,
                is_void: false,
                self_closing_slash: false,
                closure: Closure::Unclosed,
                implied_start: true,
            }),
        );
        self.open.push(tbody);
    }

    fn close_top(&mut self, closure: Closure) {
        if let Some(id) = self.open.pop() {
            if let Some(element) = self.doc.element_mut(id) {
                element.closure = closure;
            }
        }
    }

    fn end_tag(&mut self, raw_name: &str, raw: &str) {
        let found = self.open.iter().rposition(|&id| {
            self.doc
                .element_name(id)
                .is_some_and(|name| self.names_match(name, raw_name))
        });

        match found {
            Some(index) => {
                while self.open.len() > index + 1 {
                    self.close_top(Closure::Implied);
                }
                self.close_top(Closure::Explicit);
            }
            None => self.stray_end_tag(raw_name, raw),
        }
    }

    /// End tag with no open element of that name
    fn stray_end_tag(&mut self, raw_name: &str, raw: &str) {
        let parent = self.current();
        if self.options.partial_markup {
            self.doc.append(parent, NodeKind::Markup(raw.to_string()));
            return;
        }
        let name = raw_name.to_ascii_lowercase();
        let closure = match name.as_str() {
            "p" => Closure::Explicit,
            "br" => Closure::SelfContained,
            _ => {
                log::debug!("dropping stray end tag {}", raw);
                return;
            }
        };
        self.doc.append(
            parent,
            NodeKind::Element(Element {
                is_void: closure == Closure::SelfContained,
                name,
                attrs: Vec::new(),
                is_foreign: false,
                self_closing_slash: false,
                closure,
                implied_start: false,
            }),
        );
    }

    /// Text between tags, split around placeholder tokens
    fn text(&mut self, text: &str) {
        let mut last = 0;
        for m in self.map.find_tokens(text) {
            if m.start > last {
                self.append_text(&text[last..m.start]);
            }
            if let Some(fragment) = self.map.fragment(m.index) {
                let parent = self.current();
                self.doc.append(
                    parent,
                    NodeKind::Placeholder {
                        token: text[m.start..m.end].to_string(),
                        trim_exempt: fragment.trim_exempt,
                        ignored_block: fragment.ignored_block,
                    },
                );
            }
            last = m.end;
        }
        if last < text.len() {
            self.append_text(&text[last..]);
        }
    }

    /// Append text, extending the previous text node when there is one
    fn append_text(&mut self, text: &str) {
        let parent = self.current();
        if let Some(last) = self.doc.get(parent).last_child {
            if let NodeKind::Text(existing) = &mut self.doc.get_mut(last).kind {
                existing.push_str(text);
                return;
            }
        }
        self.doc.append(parent, NodeKind::Text(text.to_string()));
    }

    fn comment(&mut self, body: &str) {
        let parent = self.current();
        if let Some(index) = self.map.lookup(body) {
            if let Some(fragment) = self.map.fragment(index).filter(|f| f.ignored_block) {
                self.doc.append(
                    parent,
                    NodeKind::Placeholder {
                        token: body.to_string(),
                        trim_exempt: fragment.trim_exempt,
                        ignored_block: true,
                    },
                );
                return;
            }
        }

        let is_conditional = body.starts_with("[if") || body.ends_with("[endif]");
        let is_ignorable = self
            .options
            .ignore_custom_comments
            .iter()
            .any(|prefix| !prefix.is_empty() && body.starts_with(prefix.as_str()));
        self.doc.append(
            parent,
            NodeKind::Comment(Comment {
                body: body.to_string(),
                is_conditional,
                is_ignorable,
            }),
        );
    }

    fn finish(mut self) -> (Document, Vec<ParseError>) {
        let closure = if self.options.partial_markup {
            Closure::Unclosed
        } else {
            Closure::Implied
        };
        while !self.open.is_empty() {
            self.close_top(closure);
        }
        (self.doc, self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::guard;
    use crate::options::FragmentPattern;

    fn build(input: &str, options: &Options) -> Document {
        parse(input, options, &RestorationMap::default()).unwrap().0
    }

    fn names(doc: &Document, parent: NodeId) -> Vec<String> {
        doc.children(parent)
            .map(|id| match &doc.get(id).kind {
                NodeKind::Element(e) => e.name.clone(),
                NodeKind::Text(t) => format!("#{}", t),
                NodeKind::Placeholder { .. } => "@".to_string(),
                NodeKind::Comment(c) => format!("!{}", c.body),
                _ => "?".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_list_items_closed_by_siblings() {
        let doc = build("<ul><li>a<li>b</ul>", &Options::default());
        let ul = doc.get(0).first_child.unwrap();
        assert_eq!(names(&doc, ul), vec!["li", "li"]);
        let first = doc.get(ul).first_child.unwrap();
        assert_eq!(doc.element(first).unwrap().closure, Closure::Implied);
        assert_eq!(doc.element(ul).unwrap().closure, Closure::Explicit);
    }

    #[test]
    fn test_names_lowercased_except_foreign() {
        let doc = build("<DIV ID=x><svg viewBox=\"0 0 1 1\"><linearGradient/></svg></DIV>", &Options::default());
        let div = doc.get(0).first_child.unwrap();
        let element = doc.element(div).unwrap();
        assert_eq!(element.name, "div");
        assert_eq!(element.attrs[0].name, "id");
        let svg = doc.get(div).first_child.unwrap();
        assert_eq!(doc.element(svg).unwrap().attrs[0].name, "viewBox");
        let gradient = doc.get(svg).first_child.unwrap();
        let gradient = doc.element(gradient).unwrap();
        assert_eq!(gradient.name, "linearGradient");
        assert!(gradient.is_foreign);
        assert_eq!(gradient.closure, Closure::SelfContained);
    }

    #[test]
    fn test_case_sensitive_keeps_names() {
        let options = Options { case_sensitive: true, ..Options::default() };
        let doc = build("<Custom>x</Custom>", &options);
        assert_eq!(names(&doc, 0), vec!["Custom"]);
    }

    #[test]
    fn test_stray_end_tags() {
        let doc = build("<div></span></p></br></div>", &Options::default());
        let div = doc.get(0).first_child.unwrap();
        assert_eq!(names(&doc, div), vec!["p", "br"]);

        let partial = Options { partial_markup: true, ..Options::default() };
        let doc = build("</div><p>x", &partial);
        assert!(matches!(&doc.get(doc.get(0).first_child.unwrap()).kind, NodeKind::Markup(m) if m == "</div>"));
        let p = doc.get(0).last_child.unwrap();
        assert_eq!(doc.element(p).unwrap().closure, Closure::Unclosed);
    }

    #[test]
    fn test_bare_rows_get_table_body() {
        let doc = build("<table><tr><td>a<tr><td>b</table>", &Options::default());
        let table = doc.get(0).first_child.unwrap();
        assert_eq!(names(&doc, table), vec!["tbody"]);
        let tbody = doc.get(table).first_child.unwrap();
        assert!(doc.element(tbody).unwrap().implied_start);
        assert_eq!(names(&doc, tbody), vec!["tr", "tr"]);
    }

    #[test]
    fn test_end_tag_closes_intermediate() {
        let doc = build("<div><span><b>x</div>", &Options::default());
        let div = doc.get(0).first_child.unwrap();
        let span = doc.get(div).first_child.unwrap();
        assert_eq!(doc.element(span).unwrap().closure, Closure::Implied);
        assert_eq!(doc.element(div).unwrap().closure, Closure::Explicit);
    }

    #[test]
    fn test_legacy_anchor_closed_by_block() {
        let options = Options { html5: false, ..Options::default() };
        let doc = build("<a href=x><div>y</div></a>", &options);
        assert_eq!(names(&doc, 0), vec!["a", "div"]);
        let doc = build("<a href=x><div>y</div></a>", &Options::default());
        assert_eq!(names(&doc, 0), vec!["a"]);
    }

    #[test]
    fn test_placeholders_split_text() {
        let patterns = vec![FragmentPattern::new("{{", "}}")];
        let (guarded, map) = guard("<p>a {{ b }} c</p>", &patterns, "htmlmin:ignore", false);
        let (doc, _) = parse(&guarded, &Options::default(), &map).unwrap();
        let p = doc.get(0).first_child.unwrap();
        assert_eq!(names(&doc, p), vec!["#a ", "@", "# c"]);
    }

    #[test]
    fn test_ignore_block_becomes_placeholder() {
        let (guarded, map) = guard(
            "<div><!-- htmlmin:ignore --> x <!-- htmlmin:ignore --></div>",
            &[],
            "htmlmin:ignore",
            false,
        );
        let (doc, _) = parse(&guarded, &Options::default(), &map).unwrap();
        let div = doc.get(0).first_child.unwrap();
        let child = doc.get(div).first_child.unwrap();
        assert!(matches!(doc.get(child).kind, NodeKind::Placeholder { ignored_block: true, .. }));
    }

    #[test]
    fn test_comment_flags() {
        let doc = build("<!--[if IE]>x<![endif]--><!--! keep--><!-- drop -->", &Options::default());
        let flags: Vec<(bool, bool)> = doc
            .children(0)
            .filter_map(|id| match &doc.get(id).kind {
                NodeKind::Comment(c) => Some((c.is_conditional, c.is_ignorable)),
                _ => None,
            })
            .collect();
        assert_eq!(flags, vec![(true, false), (false, true), (false, false)]);
    }

    #[test]
    fn test_parse_error_position() {
        let err = parse("<p>\n  <!-- open", &Options::default(), &RestorationMap::default()).unwrap_err();
        match err {
            MinifyError::Parse(e) => {
                assert_eq!(e.line_and_column(), (2, 3));
                assert!(e.snippet().starts_with("<!--"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_recovery() {
        let options = Options { continue_on_parse_error: true, ..Options::default() };
        let (doc, diagnostics) = parse("<p>a <!-- b", &options, &RestorationMap::default()).unwrap();
        assert_eq!(diagnostics.len(), 1);
        let p = doc.get(0).first_child.unwrap();
        assert_eq!(names(&doc, p), vec!["#a <!-- b"]);
    }

    #[test]
    fn test_raw_text_kept_whole() {
        let doc = build("<script>if (a < b) { x = '</p>'; }</script>", &Options::default());
        let script = doc.get(0).first_child.unwrap();
        assert_eq!(names(&doc, script), vec!["#if (a < b) { x = '</p>'; }"]);
    }

    #[test]
    fn test_recovered_error_positions() {
        let options = Options { continue_on_parse_error: true, ..Options::default() };
        let (_, diagnostics) = parse("a\n</b\nc <!-- z", &options, &RestorationMap::default()).unwrap();
        let positions: Vec<(usize, usize)> = diagnostics.iter().map(|e| e.line_and_column()).collect();
        assert_eq!(positions, vec![(2, 1), (3, 3)]);
        assert!(diagnostics[1].snippet().starts_with("<!-- z"));
    }
}
