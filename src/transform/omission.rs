//! Tag Omission Engine
//!
//! Decides, per element, whether its start and end tags can be left out of
//! the output. The decision is made once over the finished tree and stored
//! by `NodeId`; the serializer only reads it.
//!
//! An end tag is left out only when whatever follows it in the output
//! closes the element again on re-parse, using the same `closed_by` sets
//! the parser applies:
//! - the next sibling's start tag (or, if that start tag is itself left
//!   out, its first child's start tag)
//! - the parent's end tag, or the end of input
//! - when the parent's end tag is left out too, whatever closes the parent
//!
//! Any text, comment or placeholder between two tags blocks the omission,
//! so whitespace only stops mattering once the collapse engine removed it.

use crate::dom::{Closure, Document, Element, NodeId, NodeKind};
use crate::options::Options;
use crate::policy::{self, ElementPolicy, Mode};

/// Per-node omission decisions
#[derive(Debug, Clone, Default)]
pub struct Omissions {
    start: Vec<bool>,
    end: Vec<bool>,
}

impl Omissions {
    #[inline]
    pub fn omit_start(&self, id: NodeId) -> bool {
        self.start.get(id as usize).copied().unwrap_or(false)
    }

    #[inline]
    pub fn omit_end(&self, id: NodeId) -> bool {
        self.end.get(id as usize).copied().unwrap_or(false)
    }
}

/// The element's end tag is part of the output unless omitted
pub fn writes_end_tag(element: &Element, options: &Options) -> bool {
    match element.closure {
        Closure::Explicit => true,
        Closure::Implied => options.include_auto_generated_tags && !element.implied_start,
        Closure::SelfContained | Closure::Unclosed => false,
    }
}

/// What the output holds right after an element's last child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Follower {
    /// A start tag: `sibling` is set when it belongs to the element's own
    /// next sibling, `token` is the element whose tag is actually written
    StartTag { sibling: Option<NodeId>, token: NodeId },
    EndTag,
    Eof,
    /// Text, a comment, or anything else that is not a tag
    Other,
}

struct Planner<'a> {
    doc: &'a Document,
    options: &'a Options,
    mode: Mode,
    plan: Omissions,
}

/// Compute omissions for the whole document
pub fn plan_omissions(doc: &Document, options: &Options) -> Omissions {
    if !options.remove_optional_tags {
        return Omissions::default();
    }
    let mut planner = Planner {
        doc,
        options,
        mode: Mode {
            case_sensitive: options.case_sensitive,
            html5: options.html5,
        },
        plan: Omissions {
            start: vec![false; doc.node_count()],
            end: vec![false; doc.node_count()],
        },
    };

    let root = doc.root();
    let order: Vec<NodeId> = doc.descendants(root).collect();
    // Start tags first: a start decision only looks at earlier siblings
    for &id in &order {
        if planner.can_omit_start(id) {
            planner.plan.start[id as usize] = true;
        }
    }
    // Pre-order puts every parent before its children
    for &id in &order {
        if planner.can_omit_end(id) {
            planner.plan.end[id as usize] = true;
        }
    }

    let omitted = planner.plan.start.iter().chain(&planner.plan.end).filter(|&&b| b).count();
    log::debug!("omitting {} optional tag(s)", omitted);
    planner.plan
}

impl Planner<'_> {
    /// HTML element the policy table applies to
    fn html_element(&self, id: NodeId) -> Option<&Element> {
        self.doc.element(id).filter(|e| {
            !e.is_foreign && !(self.mode.case_sensitive && e.name.bytes().any(|b| b.is_ascii_uppercase()))
        })
    }

    fn policy(&self, element: &Element) -> ElementPolicy {
        policy::lookup(&element.name, self.mode)
    }

    fn first_child_element(&self, id: NodeId) -> Option<&Element> {
        self.doc.get(id).first_child.and_then(|c| self.doc.element(c))
    }

    fn first_child_is(&self, id: NodeId, name: &str) -> bool {
        self.first_child_element(id).is_some_and(|e| e.is(name))
    }

    // ========================================================================
    // Start tags
    // ========================================================================

    fn can_omit_start(&self, id: NodeId) -> bool {
        let Some(element) = self.html_element(id) else {
            return false;
        };
        if element.implied_start || !element.attrs.is_empty() || element.closure == Closure::SelfContained {
            return false;
        }
        let node = self.doc.get(id);
        let first = node.first_child.map(|c| self.doc.get(c));

        let allowed = match element.name.to_ascii_lowercase().as_str() {
            "html" => !first.is_some_and(|n| matches!(n.kind, NodeKind::Comment(_))),
            "head" => first.map_or(true, |n| n.is_element()),
            "body" => match first {
                None => true,
                Some(n) => match &n.kind {
                    NodeKind::Text(t) => !t.starts_with(|c: char| c.is_ascii_whitespace()),
                    NodeKind::Comment(_) => false,
                    NodeKind::Element(e) => {
                        !["meta", "link", "script", "style", "template"].iter().any(|n| e.is(n))
                    }
                    _ => true,
                },
            },
            "colgroup" => self.first_child_is(id, "col"),
            "tbody" => self.first_child_is(id, "tr"),
            _ => false,
        };
        allowed && self.previous_sibling_allows_start_omission(id)
    }

    /// A preceding sibling whose end tag may be missing must still be closed
    /// by the tag that takes this element's place
    fn previous_sibling_allows_start_omission(&self, id: NodeId) -> bool {
        let Some(prev) = self.doc.get(id).prev_sibling else {
            return true;
        };
        let Some(prev_element) = self.doc.element(prev) else {
            return true;
        };
        if self.plan.omit_start(prev) {
            // Its tags vanish together; its content closes itself
            return true;
        }
        let Some(element) = self.doc.element(id) else {
            return false;
        };
        let policy = self.policy(prev_element);
        let end_may_be_missing = !writes_end_tag(prev_element, self.options)
            || policy.end_omissible_before(&element.name);
        if !end_may_be_missing {
            return true;
        }
        match self.first_child_element(id) {
            Some(first) => !prev_element.is_foreign && policy.is_closed_by(&first.name),
            None => false,
        }
    }

    // ========================================================================
    // End tags
    // ========================================================================

    fn can_omit_end(&self, id: NodeId) -> bool {
        let Some(element) = self.html_element(id) else {
            return false;
        };
        if !matches!(element.closure, Closure::Explicit | Closure::Implied) {
            return false;
        }
        let policy = self.policy(element);
        if policy.closed_by.is_empty() && !policy.end_omissible_at_parent_close {
            return false;
        }

        let at_parent_close = policy.end_omissible_at_parent_close && self.paragraph_rule(id, element);
        match self.follower(id) {
            Follower::StartTag { sibling: Some(sibling), token } => {
                let (Some(sibling), Some(token)) = (self.html_element(sibling), self.html_element(token)) else {
                    return false;
                };
                // Without its start tag the element is not re-created, so
                // only the sibling's own tag has to close it
                let closer = if self.plan.omit_start(id) { sibling } else { token };
                policy.end_omissible_before(&sibling.name)
                    && policy.is_closed_by(&closer.name)
                    && self.trailing_closed_by(id, &closer.name)
            }
            Follower::StartTag { sibling: None, token } => {
                at_parent_close
                    && self
                        .html_element(token)
                        .is_some_and(|t| policy.is_closed_by(&t.name) && self.trailing_closed_by(id, &t.name))
            }
            Follower::EndTag => at_parent_close,
            Follower::Eof => at_parent_close && !self.options.partial_markup,
            Follower::Other => false,
        }
    }

    /// Every element left open at the end of `id` is closed by the start tag
    /// `closer`, innermost first, as the parser pops them
    fn trailing_closed_by(&self, id: NodeId, closer: &str) -> bool {
        let Some(last) = self.doc.get(id).last_child else {
            return true;
        };
        let Some(element) = self.doc.element(last) else {
            return true;
        };
        if element.closure == Closure::SelfContained || writes_end_tag(element, self.options) {
            return true;
        }
        match self.html_element(last) {
            Some(open) => self.policy(open).is_closed_by(closer) && self.trailing_closed_by(last, closer),
            None => false,
        }
    }

    /// A paragraph inside a transparent parent stays open at that parent's close
    fn paragraph_rule(&self, id: NodeId, element: &Element) -> bool {
        if !element.is("p") {
            return true;
        }
        match self.doc.get(id).parent.and_then(|p| self.doc.element(p)) {
            Some(parent) => policy::allows_p_end_omission_at_close(&parent.name),
            None => true,
        }
    }

    /// What is written right after this element's content
    fn follower(&self, id: NodeId) -> Follower {
        let node = self.doc.get(id);
        if let Some(next) = node.next_sibling {
            return match self.doc.element(next) {
                Some(e) if e.implied_start => Follower::Other,
                Some(_) => match self.leading_tag(next) {
                    Some(token) => Follower::StartTag { sibling: Some(next), token },
                    None => Follower::Other,
                },
                None => Follower::Other,
            };
        }
        let Some(parent) = node.parent else {
            return Follower::Eof;
        };
        let Some(parent_element) = self.doc.element(parent) else {
            return Follower::Eof;
        };
        if !self.plan.omit_end(parent) && writes_end_tag(parent_element, self.options) {
            return Follower::EndTag;
        }
        match self.follower(parent) {
            Follower::StartTag { token, .. } => Follower::StartTag { sibling: None, token },
            other => other,
        }
    }

    /// The element whose start tag is written first for `id`
    fn leading_tag(&self, id: NodeId) -> Option<NodeId> {
        if !self.plan.omit_start(id) {
            return Some(id);
        }
        let first = self.doc.get(id).first_child?;
        if self.doc.get(first).is_element() && !self.doc.element(first)?.implied_start {
            self.leading_tag(first)
        } else {
            None
        }
    }
}
