//! Markup node representation
//!
//! Uses NodeId (u32) for compact, cache-friendly node references.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// An attribute as it will be written out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// None for a bare attribute such as `disabled`
    pub value: Option<String>,
    /// Quote character the value was written with in the source
    pub original_quote: Option<u8>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: Option<String>) -> Self {
        Attribute {
            name: name.into(),
            value,
            original_quote: None,
        }
    }

    #[inline]
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// The value, or "" for a bare attribute
    #[inline]
    pub fn value_str(&self) -> &str {
        self.value.as_deref().unwrap_or("")
    }
}

/// How an element's end came about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closure {
    /// The source had an end tag
    Explicit,
    /// The parser closed it (a sibling start tag, an ancestor's end tag, end of input)
    Implied,
    /// Void element or `<x/>`: no end tag exists
    SelfContained,
    /// Left open at the end of partial markup
    Unclosed,
}

/// An element node's payload
#[derive(Debug, Clone)]
pub struct Element {
    /// Tag name as it will be written (lowercased unless case is preserved)
    pub name: String,
    pub attrs: Vec<Attribute>,
    /// Inside (or is the root of) an svg/math subtree
    pub is_foreign: bool,
    pub is_void: bool,
    /// The start tag ended with `/>`
    pub self_closing_slash: bool,
    pub closure: Closure,
    /// Created by the parser without a start tag in the source (`tbody` around a bare `tr`)
    pub implied_start: bool,
}

impl Element {
    /// Get attribute by name (names are compared ASCII case-insensitively)
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Get attribute value by name; bare attributes read as ""
    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attr(name).map(Attribute::value_str)
    }

    #[inline]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A comment node's payload
#[derive(Debug, Clone)]
pub struct Comment {
    pub body: String,
    /// `<!--[if IE]>...<![endif]-->`
    pub is_conditional: bool,
    /// Survives comment removal (`<!--! ... -->` or a custom prefix)
    pub is_ignorable: bool,
}

/// Type of markup node
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Document root
    Document,
    Element(Element),
    /// Text exactly as written in the source
    Text(String),
    Comment(Comment),
    /// `<!DOCTYPE ...>`, kept verbatim
    Doctype(String),
    /// CDATA sections, `<?...?>`, stray end tags in partial markup: written verbatim
    Markup(String),
    /// Opaque stand-in for a protected template fragment or ignored block
    Placeholder {
        token: String,
        trim_exempt: bool,
        /// Stands for an ignore-marker block
        ignored_block: bool,
    },
}

/// A node in the arena
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// Parent node (None for document root and detached nodes)
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Node {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }

    /// Check if this is an element node
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }

    /// Check if this is a text node
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }

    #[inline]
    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match &mut self.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Text made only of ASCII whitespace (an empty text node counts)
    pub fn is_whitespace_only(&self) -> bool {
        self.as_text()
            .is_some_and(|t| t.bytes().all(crate::core::scanner::is_html_space))
    }

    /// Check if this node has children
    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}
