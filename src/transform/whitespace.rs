//! Whitespace Collapse Engine
//!
//! Collapses runs of ASCII whitespace in text nodes to a single space (or a
//! single line break under `preserve_line_breaks`) and trims whitespace at
//! tag boundaries where the policy table says it cannot render:
//!
//! - each edge of a text node looks at the neighbouring sibling, or at the
//!   parent's own tag when there is none
//! - `Trim` boundaries (block containers, doctype) delete the whitespace,
//!   `Keep` boundaries (inline text, kept comments, exempt placeholders)
//!   leave one space
//! - a space already written just before an inline boundary makes the next
//!   leading space redundant
//! - `script`, `style`, `pre`, `textarea` and friends are left untouched,
//!   as is anything the user hooks veto
//!
//! Non-ASCII spaces (U+00A0 and others) are content and never touched.

use crate::dom::{Document, Element, NodeId, NodeKind};
use crate::options::Options;
use crate::policy::{self, Adjacency, Category, ElementPolicy, Mode};

#[inline]
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0C')
}

/// Replace every whitespace run with one space, or one line break when the
/// run contained one and line breaks are preserved
pub fn collapse_runs(text: &str, preserve_line_breaks: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if !is_space(c) {
            out.push(c);
            continue;
        }
        let mut newline = c == '\n';
        while let Some(&next) = chars.peek() {
            if !is_space(next) {
                break;
            }
            newline |= next == '\n';
            chars.next();
        }
        out.push(if preserve_line_breaks && newline { '\n' } else { ' ' });
    }
    out
}

/// Whitespace permissions of the subtree being walked
#[derive(Debug, Clone, Copy)]
struct Scope {
    collapse: bool,
    trim: bool,
}

/// What sits on one side of a text node
#[derive(Debug, Clone, Copy)]
struct Boundary {
    adjacency: Adjacency,
    ignored_block: bool,
}

impl Boundary {
    const fn of(adjacency: Adjacency) -> Self {
        Boundary { adjacency, ignored_block: false }
    }
}

struct Collapser<'o> {
    options: &'o Options,
    mode: Mode,
    /// The last text written ended with whitespace and only inline tags followed
    last_space: bool,
}

/// Collapse whitespace across the whole document
pub fn collapse_whitespace(doc: &mut Document, options: &Options) {
    let mut collapser = Collapser {
        options,
        mode: Mode {
            case_sensitive: options.case_sensitive,
            html5: options.html5,
        },
        last_space: false,
    };
    let root = doc.root();
    collapser.walk(doc, root, Scope { collapse: true, trim: true });

    // Emptied text nodes would block tag omission
    let empty: Vec<NodeId> = doc
        .descendants(root)
        .filter(|&id| doc.get(id).as_text().is_some_and(str::is_empty))
        .collect();
    log::debug!("whitespace collapse dropped {} text node(s)", empty.len());
    for id in empty {
        doc.detach(id);
    }
}

impl Collapser<'_> {
    fn policy(&self, element: &Element) -> ElementPolicy {
        if element.is_foreign {
            policy::foreign_policy()
        } else if self.options.is_inline_custom_element(&element.name) {
            ElementPolicy {
                category: Category::InlineText,
                adjacency: Adjacency::Keep,
                ..policy::DEFAULT_POLICY
            }
        } else {
            policy::lookup(&element.name, self.mode)
        }
    }

    fn child_scope(&self, element: &Element, scope: Scope) -> Scope {
        let collapse = self
            .options
            .can_collapse_whitespace
            .as_ref()
            .and_then(|hook| hook(&element.name, &element.attrs))
            .unwrap_or_else(|| policy::default_can_collapse(&element.name));
        let trim = self
            .options
            .can_trim_whitespace
            .as_ref()
            .and_then(|hook| hook(&element.name, &element.attrs))
            .unwrap_or_else(|| policy::default_can_trim(&element.name));
        Scope {
            collapse: scope.collapse && collapse,
            trim: scope.trim && trim,
        }
    }

    fn walk(&mut self, doc: &mut Document, parent: NodeId, scope: Scope) {
        for child in doc.children_vec(parent) {
            let element_info = match &doc.get(child).kind {
                NodeKind::Text(_) => {
                    if scope.collapse {
                        let text = self.collapse_text(doc, parent, child, scope);
                        if let NodeKind::Text(existing) = &mut doc.get_mut(child).kind {
                            *existing = text;
                        }
                    } else {
                        self.last_space = false;
                    }
                    None
                }
                NodeKind::Element(element) => {
                    let policy = self.policy(element);
                    Some((policy, self.child_scope(element, scope)))
                }
                _ => {
                    self.last_space = false;
                    None
                }
            };

            if let Some((policy, inner)) = element_info {
                let transparent = matches!(policy.category, Category::InlineText | Category::Inline);
                if !transparent {
                    self.last_space = false;
                }
                self.walk(doc, child, inner);
                if !transparent || !inner.collapse {
                    self.last_space = false;
                }
            }
        }
    }

    /// Boundary formed by a sibling, or by the parent's tag when there is none
    fn boundary(&self, doc: &Document, sibling: Option<NodeId>, parent: NodeId) -> Boundary {
        let Some(sibling) = sibling else {
            return match doc.element(parent) {
                Some(element) => {
                    let policy = self.policy(element);
                    match policy.adjacency {
                        // Inside a button or select the edges do not render
                        Adjacency::FormControl => Boundary::of(Adjacency::Trim),
                        adjacency => Boundary::of(adjacency),
                    }
                }
                None => Boundary::of(Adjacency::Trim),
            };
        };
        match &doc.get(sibling).kind {
            NodeKind::Element(element) => Boundary::of(self.policy(element).adjacency),
            NodeKind::Placeholder {
                trim_exempt,
                ignored_block,
                ..
            } => Boundary {
                adjacency: if *trim_exempt { Adjacency::Keep } else { Adjacency::Trim },
                ignored_block: *ignored_block,
            },
            NodeKind::Doctype(_) | NodeKind::Document => Boundary::of(Adjacency::Trim),
            NodeKind::Text(_) | NodeKind::Comment(_) | NodeKind::Markup(_) => Boundary::of(Adjacency::Keep),
        }
    }

    fn trims(&self, boundary: Boundary, form_control_pair: bool, scope: Scope) -> bool {
        if !scope.trim || self.options.conservative_collapse {
            return false;
        }
        match boundary.adjacency {
            Adjacency::Trim => true,
            Adjacency::Keep => self.options.collapse_inline_tag_whitespace,
            Adjacency::FormControl => self.options.collapse_inline_tag_whitespace && !form_control_pair,
        }
    }

    /// A whitespace edge may go entirely (a kept line break stays)
    #[inline]
    fn removable(&self, c: char) -> bool {
        c == ' ' || !self.options.preserve_line_breaks
    }

    fn collapse_text(&mut self, doc: &Document, parent: NodeId, id: NodeId, scope: Scope) -> String {
        let node = doc.get(id);
        let text = collapse_runs(node.as_text().unwrap_or_default(), self.options.preserve_line_breaks);
        let left = self.boundary(doc, node.prev_sibling, parent);
        let right = self.boundary(doc, node.next_sibling, parent);
        let redundant = self.last_space && !self.options.conservative_collapse;

        let mut out = text;
        let whitespace_only = out.chars().all(is_space);

        if whitespace_only {
            let Some(c) = out.chars().next() else {
                return out;
            };
            let pair = left.adjacency == Adjacency::FormControl && right.adjacency == Adjacency::FormControl;
            let between_blocks = left.ignored_block && right.ignored_block;
            let drop = between_blocks
                || ((self.trims(left, pair, scope) || self.trims(right, pair, scope) || redundant)
                    && self.removable(c));
            if drop {
                out.clear();
            }
        } else {
            if out.starts_with(is_space) {
                let c = out.chars().next().unwrap_or(' ');
                if (self.trims(left, false, scope) || redundant) && self.removable(c) {
                    out.remove(0);
                }
            }
            if out.ends_with(is_space) {
                let c = out.chars().last().unwrap_or(' ');
                if self.trims(right, false, scope) && self.removable(c) {
                    out.pop();
                }
            }
        }

        if !out.is_empty() {
            self.last_space = out.ends_with(is_space);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse;
    use crate::guard::{guard, RestorationMap};
    use crate::options::FragmentPattern;
    use std::sync::Arc;

    fn texts(input: &str, options: &Options) -> Vec<String> {
        let (mut doc, _) = parse(input, options, &RestorationMap::default()).unwrap();
        collapse_whitespace(&mut doc, options);
        doc.descendants(doc.root())
            .filter_map(|id| doc.get(id).as_text().map(str::to_string))
            .collect()
    }

    fn collapsing() -> Options {
        Options { collapse_whitespace: true, ..Options::default() }
    }

    #[test]
    fn test_collapse_runs() {
        assert_eq!(collapse_runs("a \t\n b", false), "a b");
        assert_eq!(collapse_runs("a \t\n b", true), "a\nb");
        assert_eq!(collapse_runs("a\u{00A0}\u{00A0}b", false), "a\u{00A0}\u{00A0}b");
    }

    #[test]
    fn test_block_edges_trimmed() {
        assert_eq!(texts("<div>  foo   bar  </div>", &collapsing()), vec!["foo bar"]);
        assert_eq!(texts("<div><p> a </p>   <p> b </p></div>", &collapsing()), vec!["a", "b"]);
    }

    #[test]
    fn test_inline_edges_keep_one_space() {
        assert_eq!(
            texts("<p>foo <b> bar </b> baz</p>", &collapsing()),
            vec!["foo ", "bar ", "baz"]
        );
        assert_eq!(texts("<p><span>a</span>   <span>b</span></p>", &collapsing()), vec!["a", " ", "b"]);
    }

    #[test]
    fn test_preformatted_untouched() {
        assert_eq!(
            texts("<div><pre>  a\n\n b </pre>    </div>", &collapsing()),
            vec!["  a\n\n b "]
        );
        assert_eq!(texts("<textarea>  x  </textarea>", &collapsing()), vec!["  x  "]);
    }

    #[test]
    fn test_conservative_never_empties() {
        let options = Options { conservative_collapse: true, ..collapsing() };
        assert_eq!(texts("<div>  a  </div>", &options), vec![" a "]);
    }

    #[test]
    fn test_preserve_line_breaks() {
        let options = Options { preserve_line_breaks: true, ..collapsing() };
        assert_eq!(texts("<div>\n  a  \n</div>", &options), vec!["\na\n"]);
    }

    #[test]
    fn test_inline_tag_collapse() {
        let options = Options { collapse_inline_tag_whitespace: true, ..collapsing() };
        assert_eq!(texts("<p>a <b> b </b> c</p>", &options), vec!["a", "b", "c"]);
        // Space between two form controls renders
        assert_eq!(
            texts("<p><input> <button>x</button></p>", &options),
            vec![" ", "x"]
        );
    }

    #[test]
    fn test_button_inner_edges_trimmed() {
        assert_eq!(texts("<button> ok </button>", &collapsing()), vec!["ok"]);
    }

    #[test]
    fn test_non_breaking_space_kept() {
        assert_eq!(texts("<div>\u{00A0}a\u{00A0}</div>", &collapsing()), vec!["\u{00A0}a\u{00A0}"]);
    }

    #[test]
    fn test_hook_vetoes_collapse() {
        let options = Options {
            can_collapse_whitespace: Some(Arc::new(|tag: &str, _: &[crate::dom::Attribute]| {
                (tag == "code").then_some(false)
            })),
            ..collapsing()
        };
        assert_eq!(texts("<div><code>  a  b </code></div>", &options), vec!["  a  b "]);
    }

    #[test]
    fn test_inline_custom_elements() {
        let options = Options {
            inline_custom_elements: vec!["my-tag".into()],
            ..collapsing()
        };
        assert_eq!(texts("<p>a <my-tag>b</my-tag> c</p>", &options), vec!["a ", "b", " c"]);
        assert_eq!(texts("<p>a <x-tag>b</x-tag> c</p>", &collapsing()), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_placeholder_edges() {
        let patterns = vec![FragmentPattern::new("{{", "}}")];
        for (trim, expected) in [(false, vec!["a ", " b"]), (true, vec!["a", "b"])] {
            let (guarded, map) = guard("<div>a   {{ x }}   b</div>", &patterns, "htmlmin:ignore", trim);
            let options = collapsing();
            let (mut doc, _) = parse(&guarded, &options, &map).unwrap();
            collapse_whitespace(&mut doc, &options);
            let got: Vec<String> = doc
                .descendants(0)
                .filter_map(|id| doc.get(id).as_text().map(str::to_string))
                .collect();
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn test_adjacent_ignore_blocks_join() {
        let marker = "<!-- htmlmin:ignore -->";
        let src = format!("<div>{m}a{m}  \n  {m}b{m}</div>", m = marker);
        let (guarded, map) = guard(&src, &[], "htmlmin:ignore", false);
        let options = collapsing();
        let (mut doc, _) = parse(&guarded, &options, &map).unwrap();
        collapse_whitespace(&mut doc, &options);
        let div = doc.get(0).first_child.unwrap();
        assert_eq!(doc.children(div).count(), 2);
    }
}
