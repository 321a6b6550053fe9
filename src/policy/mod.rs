//! Element Policy Table
//!
//! One static lookup describing how each tag behaves:
//! - its category (drives whitespace adjacency),
//! - which start tags implicitly close it while it is the current element,
//! - before which siblings, and whether at its parent's close, its end tag may be left out.
//!
//! The parser and the tag omission engine read the same `closed_by` sets,
//! so every omitted end tag is one the parser re-implies on the next read.
//! Unknown and custom tags resolve to the generic container entry.

/// Element category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Generic container: whitespace at its edges is insignificant
    Block,
    /// Rendered inline but not text-level (img, ruby, embed)
    Inline,
    /// Text-level phrasing (a, em, span)
    InlineText,
    /// No content, no end tag
    Void,
    /// input, button, select, textarea and similar
    FormControl,
    /// svg/math roots and everything inside them
    Foreign,
}

/// How whitespace next to an element's tags is treated when collapsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjacency {
    /// Delete whitespace at this boundary
    Trim,
    /// Keep one space at this boundary
    Keep,
    /// Keep one space, even under inline-tag collapsing if a form control sits on the other side
    FormControl,
}

/// Policy record for one tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementPolicy {
    pub category: Category,
    /// Start tags that close this element when it is the current element
    pub closed_by: &'static [&'static str],
    /// Siblings before which the end tag may be omitted
    pub end_omissible_before: &'static [&'static str],
    /// End tag may be omitted when the parent's end follows
    pub end_omissible_at_parent_close: bool,
    pub adjacency: Adjacency,
}

impl ElementPolicy {
    #[inline]
    pub fn is_closed_by(&self, name: &str) -> bool {
        self.closed_by.iter().any(|t| t.eq_ignore_ascii_case(name))
    }

    #[inline]
    pub fn end_omissible_before(&self, name: &str) -> bool {
        self.end_omissible_before
            .iter()
            .any(|t| t.eq_ignore_ascii_case(name))
    }
}

/// Table lookup mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    /// Only exact lowercase names match the table
    pub case_sensitive: bool,
    /// HTML5 content model: anchors are transparent
    pub html5: bool,
}

impl Default for Mode {
    fn default() -> Self {
        Mode { case_sensitive: false, html5: true }
    }
}

// ============================================================================
// Tag sets
// ============================================================================

pub const VOID_ELEMENTS: [&str; 16] = [
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen", "link",
    "meta", "param", "source", "track", "wbr",
];

/// Void elements rendered inline
const INLINE_VOID_ELEMENTS: [&str; 4] = ["img", "wbr", "embed", "keygen"];

const FORM_CONTROLS: [&str; 8] = [
    "input", "button", "select", "textarea", "output", "meter", "progress", "keygen",
];

const INLINE_TEXT_ELEMENTS: [&str; 33] = [
    "a", "abbr", "acronym", "b", "bdi", "bdo", "big", "cite", "code", "data", "del", "dfn", "em",
    "font", "i", "ins", "kbd", "label", "mark", "nobr", "q", "s", "samp", "small", "span",
    "strike", "strong", "sub", "sup", "time", "tt", "u", "var",
];

const INLINE_ELEMENTS: [&str; 13] = [
    "audio", "canvas", "iframe", "map", "object", "picture", "rb", "rp", "rt", "rtc", "ruby",
    "video", "slot",
];

pub const FOREIGN_ROOTS: [&str; 2] = ["svg", "math"];

/// Start tags that close an open paragraph
const P_CLOSERS: [&str; 32] = [
    "address", "article", "aside", "blockquote", "details", "dialog", "div", "dl", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hgroup", "hr", "main", "menu", "nav", "ol", "p", "pre", "search", "section", "table", "ul",
];

const P_CLOSED_BY: [&str; 35] = [
    "address", "article", "aside", "blockquote", "details", "dialog", "div", "dl", "fieldset",
    "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header",
    "hgroup", "hr", "main", "menu", "nav", "ol", "p", "pre", "search", "section", "table", "ul",
    "li", "dd", "dt",
];

/// Block starts that close an open anchor under the legacy content model
const LEGACY_ANCHOR_CLOSED_BY: [&str; 35] = P_CLOSED_BY;

const LI: [&str; 1] = ["li"];
const DT_DD: [&str; 2] = ["dt", "dd"];
const RUBY_PARTS: [&str; 4] = ["rb", "rt", "rtc", "rp"];
const RTC_CLOSED_BY: [&str; 3] = ["rb", "rtc", "rp"];
const RTC_BEFORE: [&str; 2] = ["rb", "rtc"];
const OPTION_CLOSED_BY: [&str; 3] = ["option", "optgroup", "hr"];
const OPTION_BEFORE: [&str; 2] = ["option", "optgroup"];
const OPTGROUP_CLOSED_BY: [&str; 2] = ["optgroup", "hr"];
const OPTGROUP_BEFORE: [&str; 1] = ["optgroup"];
const COLGROUP_CLOSED_BY: [&str; 6] = ["colgroup", "caption", "thead", "tbody", "tfoot", "tr"];
const CAPTION_CLOSED_BY: [&str; 5] = ["colgroup", "thead", "tbody", "tfoot", "tr"];
const THEAD_CLOSED_BY: [&str; 2] = ["tbody", "tfoot"];
const TBODY_CLOSED_BY: [&str; 3] = ["tbody", "tfoot", "thead"];
const TFOOT_CLOSED_BY: [&str; 3] = ["tbody", "thead", "tfoot"];
const TFOOT_BEFORE: [&str; 1] = ["tbody"];
const TR_CLOSED_BY: [&str; 4] = ["tr", "tbody", "thead", "tfoot"];
const TR_BEFORE: [&str; 1] = ["tr"];
const CELL_CLOSED_BY: [&str; 6] = ["td", "th", "tr", "tbody", "thead", "tfoot"];
const CELL_BEFORE: [&str; 2] = ["td", "th"];
const BODY: [&str; 1] = ["body"];

/// Elements whose whitespace is rendered verbatim
const NO_COLLAPSE: [&str; 7] = ["script", "style", "pre", "textarea", "xmp", "plaintext", "listing"];
const NO_TRIM: [&str; 5] = ["pre", "textarea", "xmp", "plaintext", "listing"];

/// Parents whose close does not allow omitting a child paragraph's end tag
const P_TRANSPARENT_PARENTS: [&str; 7] = ["a", "audio", "del", "ins", "map", "noscript", "video"];

#[inline]
fn contains(list: &[&str], name: &str) -> bool {
    list.iter().any(|t| t.eq_ignore_ascii_case(name))
}

/// Normalize a name for table lookup; None when the mode rules out a match
#[inline]
fn table_key(name: &str, mode: Mode) -> Option<String> {
    if mode.case_sensitive && name.bytes().any(|b| b.is_ascii_uppercase()) {
        None
    } else {
        Some(name.to_ascii_lowercase())
    }
}

// ============================================================================
// Lookup
// ============================================================================

const fn entry(category: Category, adjacency: Adjacency) -> ElementPolicy {
    ElementPolicy {
        category,
        closed_by: &[],
        end_omissible_before: &[],
        end_omissible_at_parent_close: false,
        adjacency,
    }
}

const fn omissible(
    closed_by: &'static [&'static str],
    before: &'static [&'static str],
    at_parent_close: bool,
) -> ElementPolicy {
    ElementPolicy {
        category: Category::Block,
        closed_by,
        end_omissible_before: before,
        end_omissible_at_parent_close: at_parent_close,
        adjacency: Adjacency::Trim,
    }
}

/// The generic container entry, used for unknown and custom tags
pub const DEFAULT_POLICY: ElementPolicy = entry(Category::Block, Adjacency::Trim);

/// Look up the policy for a tag name
pub fn lookup(name: &str, mode: Mode) -> ElementPolicy {
    let key = match table_key(name, mode) {
        Some(key) => key,
        None => return DEFAULT_POLICY,
    };

    let mut policy = match key.as_str() {
        "p" => omissible(&P_CLOSED_BY, &P_CLOSERS, true),
        "li" => omissible(&LI, &LI, true),
        "dt" => omissible(&DT_DD, &DT_DD, false),
        "dd" => omissible(&DT_DD, &DT_DD, true),
        "rb" | "rt" | "rp" => ElementPolicy {
            category: Category::Inline,
            adjacency: Adjacency::Keep,
            ..omissible(&RUBY_PARTS, &RUBY_PARTS, true)
        },
        "rtc" => ElementPolicy {
            category: Category::Inline,
            adjacency: Adjacency::Keep,
            ..omissible(&RTC_CLOSED_BY, &RTC_BEFORE, false)
        },
        "option" => omissible(&OPTION_CLOSED_BY, &OPTION_BEFORE, true),
        "optgroup" => omissible(&OPTGROUP_CLOSED_BY, &OPTGROUP_BEFORE, true),
        "colgroup" => omissible(&COLGROUP_CLOSED_BY, &COLGROUP_CLOSED_BY, true),
        "caption" => omissible(&CAPTION_CLOSED_BY, &CAPTION_CLOSED_BY, true),
        "thead" => omissible(&THEAD_CLOSED_BY, &THEAD_CLOSED_BY, false),
        "tbody" => omissible(&TBODY_CLOSED_BY, &THEAD_CLOSED_BY, true),
        "tfoot" => omissible(&TFOOT_CLOSED_BY, &TFOOT_BEFORE, true),
        "tr" => omissible(&TR_CLOSED_BY, &TR_BEFORE, true),
        "td" | "th" => omissible(&CELL_CLOSED_BY, &CELL_BEFORE, true),
        "head" => omissible(&BODY, &BODY, false),
        "body" | "html" => omissible(&[], &[], true),
        _ => classify(&key),
    };

    if key == "a" && !mode.html5 {
        policy.closed_by = &LEGACY_ANCHOR_CLOSED_BY;
    }
    policy
}

/// Category-only entries for tags without omission rules
fn classify(key: &str) -> ElementPolicy {
    if contains(&FORM_CONTROLS, key) {
        entry(Category::FormControl, Adjacency::FormControl)
    } else if contains(&VOID_ELEMENTS, key) {
        let adjacency = if contains(&INLINE_VOID_ELEMENTS, key) {
            Adjacency::Keep
        } else {
            Adjacency::Trim
        };
        entry(Category::Void, adjacency)
    } else if contains(&INLINE_TEXT_ELEMENTS, key) {
        entry(Category::InlineText, Adjacency::Keep)
    } else if contains(&INLINE_ELEMENTS, key) {
        entry(Category::Inline, Adjacency::Keep)
    } else if contains(&FOREIGN_ROOTS, key) {
        entry(Category::Foreign, Adjacency::Keep)
    } else {
        DEFAULT_POLICY
    }
}

/// Policy for an element inside a foreign subtree
pub fn foreign_policy() -> ElementPolicy {
    entry(Category::Foreign, Adjacency::Keep)
}

#[inline]
pub fn is_void(name: &str) -> bool {
    contains(&VOID_ELEMENTS, name)
}

#[inline]
pub fn is_foreign_root(name: &str) -> bool {
    contains(&FOREIGN_ROOTS, name)
}

/// Whitespace in this element's subtree may be collapsed by default
#[inline]
pub fn default_can_collapse(name: &str) -> bool {
    !contains(&NO_COLLAPSE, name)
}

/// Whitespace at this element's inner edges may be trimmed by default
#[inline]
pub fn default_can_trim(name: &str) -> bool {
    !contains(&NO_TRIM, name)
}

/// A paragraph's end tag may be omitted at the close of this parent
#[inline]
pub fn allows_p_end_omission_at_close(parent: &str) -> bool {
    !contains(&P_TRANSPARENT_PARENTS, parent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_item_closed_by_sibling() {
        let li = lookup("li", Mode::default());
        assert!(li.is_closed_by("li"));
        assert!(li.end_omissible_at_parent_close);
    }

    #[test]
    fn test_paragraph_closers() {
        let p = lookup("P", Mode::default());
        assert!(p.is_closed_by("div"));
        assert!(p.is_closed_by("li"));
        assert!(p.end_omissible_before("table"));
        assert!(!p.end_omissible_before("li"));
        assert!(!p.is_closed_by("span"));
    }

    #[test]
    fn test_rtc_only_before_rb_or_rtc() {
        let rtc = lookup("rtc", Mode::default());
        assert!(rtc.end_omissible_before("rb"));
        assert!(rtc.end_omissible_before("rtc"));
        assert!(!rtc.end_omissible_before("rt"));
        assert!(!rtc.end_omissible_before("rp"));
        assert!(!rtc.end_omissible_at_parent_close);
    }

    #[test]
    fn test_unknown_tag_is_generic_container() {
        assert_eq!(lookup("my-widget", Mode::default()), DEFAULT_POLICY);
    }

    #[test]
    fn test_case_sensitive_mode() {
        let mode = Mode { case_sensitive: true, html5: true };
        assert_eq!(lookup("LI", mode), DEFAULT_POLICY);
        assert!(lookup("li", mode).is_closed_by("li"));
    }

    #[test]
    fn test_legacy_anchor() {
        let legacy = Mode { case_sensitive: false, html5: false };
        assert!(lookup("a", legacy).is_closed_by("div"));
        assert!(!lookup("a", Mode::default()).is_closed_by("div"));
    }

    #[test]
    fn test_adjacency() {
        let mode = Mode::default();
        assert_eq!(lookup("div", mode).adjacency, Adjacency::Trim);
        assert_eq!(lookup("em", mode).adjacency, Adjacency::Keep);
        assert_eq!(lookup("img", mode).adjacency, Adjacency::Keep);
        assert_eq!(lookup("br", mode).adjacency, Adjacency::Trim);
        assert_eq!(lookup("input", mode).adjacency, Adjacency::FormControl);
        assert_eq!(lookup("input", mode).category, Category::FormControl);
    }

    #[test]
    fn test_whitespace_defaults() {
        assert!(!default_can_collapse("pre"));
        assert!(!default_can_collapse("script"));
        assert!(default_can_trim("script"));
        assert!(!default_can_trim("textarea"));
    }
}
