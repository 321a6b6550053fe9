//! Serializer
//!
//! Writes the minified tree back out as markup:
//! - start and end tags, minus those the omission plan leaves out
//! - attributes with the chosen delimiter, or none when that is safe
//! - text, comments and verbatim markup exactly as stored
//! - placeholders as their tokens, for `guard::restore` to swap back
//!
//! The walk uses an explicit stack, so nesting depth is not limited by the
//! call stack.

pub mod writer;

use crate::dom::{Attribute, Document, Element, NodeId, NodeKind};
use crate::guard::RestorationMap;
use crate::options::Options;
use crate::policy;
use crate::transform::attributes::{can_unquote, quote_value};
use crate::transform::omission::{writes_end_tag, Omissions};

use self::writer::LineWriter;

const SHORT_DOCTYPE: &str = "<!doctype html>";

/// Serialize a document to a string
pub fn serialize(doc: &Document, options: &Options, omissions: &Omissions, map: &RestorationMap) -> String {
    let serializer = Serializer {
        doc,
        options,
        omissions,
        map,
        out: LineWriter::new(doc.node_count() * 16, options.max_line_length),
        preserve_depth: 0,
        after_tag: false,
    };
    serializer.run()
}

// Stack entries: entering a node, or writing its end tag after its children
enum StackEntry {
    Enter(NodeId),
    Close(NodeId),
}

struct Serializer<'a> {
    doc: &'a Document,
    options: &'a Options,
    omissions: &'a Omissions,
    map: &'a RestorationMap,
    out: LineWriter,
    /// Open elements whose content must not gain line breaks
    preserve_depth: usize,
    /// The last thing written was a tag
    after_tag: bool,
}

impl<'a> Serializer<'a> {
    fn run(mut self) -> String {
        let doc = self.doc;
        let mut stack: Vec<StackEntry> = Vec::with_capacity(64);
        stack.push(StackEntry::Enter(doc.root()));

        while let Some(entry) = stack.pop() {
            match entry {
                StackEntry::Close(id) => {
                    if let Some(element) = doc.element(id) {
                        self.end_tag(id, element);
                    }
                }
                StackEntry::Enter(id) => {
                    let node = doc.get(id);
                    match &node.kind {
                        NodeKind::Document => {}
                        NodeKind::Element(element) => {
                            self.start_tag(id, element);
                            stack.push(StackEntry::Close(id));
                        }
                        NodeKind::Text(text) => self.text(text),
                        NodeKind::Comment(comment) => {
                            self.tag_boundary();
                            self.out.push_str(&format!("<!--{}-->", comment.body));
                            self.after_tag = true;
                        }
                        NodeKind::Doctype(raw) => {
                            self.tag_boundary();
                            self.out.push_str(if self.options.use_short_doctype { SHORT_DOCTYPE } else { raw.as_str() });
                            self.after_tag = true;
                        }
                        NodeKind::Markup(raw) => {
                            if raw.starts_with('<') {
                                self.tag_boundary();
                            }
                            self.out.push_str(raw);
                            self.after_tag = raw.ends_with('>');
                        }
                        NodeKind::Placeholder { token, .. } => self.text(token),
                    }

                    // Children in reverse, walking last_child -> prev_sibling
                    let mut child = node.last_child;
                    while let Some(cid) = child {
                        stack.push(StackEntry::Enter(cid));
                        child = doc.get(cid).prev_sibling;
                    }
                }
            }
        }
        self.out.finish()
    }

    #[inline]
    fn text(&mut self, text: &str) {
        if !text.is_empty() {
            self.out.push_str(text);
            self.after_tag = false;
        }
    }

    /// A newline may separate two adjacent tags outside preformatted content
    #[inline]
    fn tag_boundary(&mut self) {
        if self.after_tag && self.preserve_depth == 0 {
            self.out.mark_break();
        }
    }

    fn preserves_content(element: &Element) -> bool {
        !element.is_foreign && !policy::default_can_collapse(&element.name)
    }

    /// The start tag ends in `/>`
    fn writes_slash(&self, element: &Element) -> bool {
        if !element.self_closing_slash {
            return false;
        }
        if element.is_void && !element.is_foreign {
            return self.options.keep_closing_slash;
        }
        // a non-void `<x/>` reads back as self-contained only with its slash
        true
    }

    fn start_tag(&mut self, id: NodeId, element: &Element) {
        let omitted = element.implied_start || self.omissions.omit_start(id);
        if !omitted {
            self.tag_boundary();
            self.out.push('<');
            self.out.push_str(&element.name);

            let slash = self.writes_slash(element);
            let count = element.attrs.len();
            let mut last_quoted = false;
            for (i, attr) in element.attrs.iter().enumerate() {
                if i > 0 && last_quoted && self.options.remove_tag_whitespace {
                    self.out.mark_break();
                } else {
                    self.out.push_separator();
                }
                last_quoted = self.attribute(attr, i + 1 == count);
            }

            if slash {
                let unquoted_value = element.attrs.last().is_some_and(|a| a.has_value()) && !last_quoted;
                if unquoted_value {
                    self.out.push(' ');
                }
                self.out.push_str("/>");
            } else {
                self.out.push('>');
            }
            self.after_tag = true;
        }
        if Self::preserves_content(element) {
            self.preserve_depth += 1;
        }
    }

    /// Write one attribute; returns whether its value ended with a quote
    fn attribute(&mut self, attr: &Attribute, is_last: bool) -> bool {
        let Some(value) = attr.value.as_deref() else {
            self.out.push_str(&attr.name);
            return false;
        };

        let mut piece = String::with_capacity(attr.name.len() + value.len() + 3);
        piece.push_str(&attr.name);
        piece.push('=');
        let quoted = if self.map.contains_token(value) {
            // template text goes back exactly as delimited in the source
            match attr.original_quote {
                Some(q) => {
                    piece.push(q as char);
                    piece.push_str(value);
                    piece.push(q as char);
                    true
                }
                None => {
                    piece.push_str(value);
                    false
                }
            }
        } else if self.options.remove_attribute_quotes && can_unquote(value, self.map, is_last) {
            piece.push_str(value);
            false
        } else {
            let (q, escaped) = quote_value(value, self.options.quote_byte());
            piece.push(q as char);
            piece.push_str(&escaped);
            piece.push(q as char);
            true
        };
        self.out.push_str(&piece);
        quoted
    }

    fn end_tag(&mut self, id: NodeId, element: &Element) {
        let written = writes_end_tag(element, self.options) && !self.omissions.omit_end(id);
        if written {
            if !Self::preserves_content(element) {
                self.tag_boundary();
            }
            self.out.push_str("</");
            self.out.push_str(&element.name);
            self.out.push('>');
            self.after_tag = true;
        }
        if Self::preserves_content(element) {
            self.preserve_depth = self.preserve_depth.saturating_sub(1);
        }
    }
}
