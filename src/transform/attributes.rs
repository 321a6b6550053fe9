//! Attribute Normalizer
//!
//! Per element, in order:
//! 1. drop attributes that restate the default (`method=get`, `type=text`, ...)
//! 2. drop empty attributes the `remove_empty_attributes` policy names
//! 3. collapse boolean attributes to their bare form
//! 4. clean values (class and custom whitespace, URL and number trimming,
//!    `style` trailing semicolons, `javascript:` in handlers, entity decoding)
//! 5. sort class tokens and attributes when asked
//!
//! Quote selection and unquoting run at serialization time (`quote_value`,
//! `can_unquote`). Values holding a placeholder token are never unquoted
//! and keep the quote they were written with.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::core::entities::{count_quotes, decode_text, escape_ambiguous_ampersands, escape_quote};
use crate::dispatch::content_type::{
    is_css_type, is_event_handler, is_javascript_type, is_numeric_attribute, is_url_attribute, media_type,
};
use crate::dom::{Attribute, Document, Element, NodeId};
use crate::guard::RestorationMap;
use crate::options::{EmptyAttributes, Options};
use crate::transform::whitespace::collapse_runs;

/// Attributes whose presence alone carries the meaning
const BOOLEAN_ATTRIBUTES: [&str; 41] = [
    "allowfullscreen", "async", "autofocus", "autoplay", "checked", "compact", "controls",
    "declare", "default", "defaultchecked", "defaultmuted", "defaultselected", "defer",
    "disabled", "enabled", "formnovalidate", "hidden", "indeterminate", "inert", "ismap",
    "itemscope", "loop", "multiple", "muted", "nohref", "noresize", "noshade", "novalidate",
    "nowrap", "open", "pauseonexit", "readonly", "required", "reversed", "scoped", "seamless",
    "selected", "sortable", "truespeed", "typemustmatch", "visible",
];

/// Attributes removed by the default empty-attribute policy
const EMPTY_REMOVABLE: [&str; 6] = ["class", "id", "style", "title", "lang", "dir"];

#[inline]
fn is_blank(value: &str) -> bool {
    value.bytes().all(crate::core::scanner::is_html_space)
}

#[inline]
fn value_is(attr: &Attribute, expected: &str) -> bool {
    attr.value_str().trim().eq_ignore_ascii_case(expected)
}

/// The attribute restates the element's default
fn is_redundant(element: &Element, attr: &Attribute, options: &Options) -> bool {
    let tag = element.name.to_ascii_lowercase();
    let name = attr.name.to_ascii_lowercase();

    if options.remove_redundant_attributes {
        let redundant = match (tag.as_str(), name.as_str()) {
            ("form", "method") => value_is(attr, "get"),
            ("input", "type") => value_is(attr, "text"),
            ("area", "shape") => value_is(attr, "rect"),
            ("script", "language") => value_is(attr, "javascript"),
            ("script", "charset") => element.attr("src").is_none(),
            ("a", "name") => element
                .attr("id")
                .is_some_and(|id| id.value_str() == attr.value_str()),
            _ => false,
        };
        if redundant {
            return true;
        }
    }

    if name == "type" {
        if options.remove_script_type_attributes && tag == "script" {
            let media = media_type(attr.value_str());
            // A module script differs from a classic one
            return is_javascript_type(Some(attr.value_str())) && media != "module";
        }
        if options.remove_style_link_type_attributes && (tag == "style" || tag == "link") {
            let stylesheet = tag == "style"
                || element
                    .attr("rel")
                    .is_some_and(|rel| rel.value_str().split_ascii_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")));
            return stylesheet && attr.has_value() && is_css_type(Some(attr.value_str()));
        }
    }
    false
}

fn is_removable_empty(tag: &str, attr: &Attribute, options: &Options) -> bool {
    if !is_blank(attr.value_str()) {
        return false;
    }
    match &options.remove_empty_attributes {
        EmptyAttributes::Off => false,
        EmptyAttributes::Default => {
            EMPTY_REMOVABLE.iter().any(|n| n.eq_ignore_ascii_case(&attr.name)) || is_event_handler(&attr.name)
        }
        EmptyAttributes::Predicate(remove) => remove(&attr.name, tag),
    }
}

fn collapse_boolean(attr: &mut Attribute) {
    let name = attr.name.to_ascii_lowercase();
    if BOOLEAN_ATTRIBUTES.contains(&name.as_str()) {
        attr.value = None;
    } else if name == "draggable" {
        let keep = attr.value.as_deref().is_some_and(|v| {
            let v = v.trim();
            v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false")
        });
        if !keep {
            attr.value = None;
        }
    }
}

/// Trim and collapse inner whitespace runs to one space
fn squash(value: &str) -> String {
    collapse_runs(value.trim_matches(|c: char| c.is_ascii_whitespace()), false)
}

fn trim_style(value: &str) -> String {
    let mut value = value.trim();
    while let Some(stripped) = value.strip_suffix(';') {
        value = stripped.trim_end();
    }
    value.to_string()
}

fn strip_javascript_scheme(value: &str) -> String {
    let value = value.trim();
    match value.get(..11) {
        Some(prefix) if prefix.eq_ignore_ascii_case("javascript:") => value[11..].trim_start().to_string(),
        _ => value.to_string(),
    }
}

fn clean_value(tag: &str, attr: &mut Attribute, options: &Options, map: &RestorationMap) {
    let Some(value) = attr.value.as_deref() else {
        return;
    };
    let name = attr.name.to_ascii_lowercase();
    let cleaned = if name == "class" {
        squash(value)
    } else if name == "style" {
        trim_style(value)
    } else if is_event_handler(&name) {
        strip_javascript_scheme(value)
    } else if is_url_attribute(tag, &name) || is_numeric_attribute(&name) || name == "srcset" {
        value.trim_matches(|c: char| c.is_ascii_whitespace()).to_string()
    } else if options.custom_attr_collapse.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
        squash(value)
    } else {
        value.to_string()
    };

    let cleaned = if options.decode_entities && !map.contains_token(&cleaned) {
        escape_ambiguous_ampersands(&decode_text(&cleaned)).into_owned()
    } else {
        cleaned
    };
    attr.value = Some(cleaned);
}

// ============================================================================
// Sorting
// ============================================================================

/// Document-wide class token counts
pub fn class_frequencies(doc: &Document, map: &RestorationMap) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for id in doc.descendants(doc.root()) {
        let Some(class) = doc.element(id).and_then(|e| e.attr_value("class")) else {
            continue;
        };
        for token in class.split_ascii_whitespace() {
            if map.lookup(token).is_none() {
                *counts.entry(token.to_string()).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Sort class tokens by frequency, most frequent first, then by name.
/// Tokens containing a placeholder stay where they are and split the
/// value into independently sorted runs.
pub fn sort_class_tokens(value: &str, counts: &HashMap<String, usize>, map: &RestorationMap) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut run: Vec<&str> = Vec::new();
    for token in value.split_ascii_whitespace() {
        if map.contains_token(token) {
            sort_run(&mut run, &mut out, counts);
            out.push(token);
        } else {
            run.push(token);
        }
    }
    sort_run(&mut run, &mut out, counts);
    out.join(" ")
}

fn sort_run<'a>(run: &mut Vec<&'a str>, out: &mut Vec<&'a str>, counts: &HashMap<String, usize>) {
    run.sort_by(|a, b| {
        let fa = counts.get(*a).copied().unwrap_or(0);
        let fb = counts.get(*b).copied().unwrap_or(0);
        fb.cmp(&fa).then_with(|| a.cmp(b))
    });
    out.append(run);
}

/// Stable sort by name between attributes that hold placeholders
fn sort_attributes(attrs: &mut [Attribute], map: &RestorationMap) {
    let pinned = |a: &Attribute| map.contains_token(&a.name) || map.contains_token(a.value_str());
    let mut start = 0;
    for i in 0..=attrs.len() {
        if i == attrs.len() || pinned(&attrs[i]) {
            attrs[start..i].sort_by(|a, b| a.name.cmp(&b.name));
            start = i + 1;
        }
    }
}

// ============================================================================
// Driver
// ============================================================================

fn normalize_element(
    element: &mut Element,
    options: &Options,
    map: &RestorationMap,
    class_counts: &HashMap<String, usize>,
) {
    let tag = element.name.clone();

    let keep: Vec<bool> = element
        .attrs
        .iter()
        .map(|attr| {
            map.contains_token(&attr.name)
                || !(!element.is_foreign && is_redundant(element, attr, options)
                    || is_removable_empty(&tag, attr, options))
        })
        .collect();
    let mut keep = keep.into_iter();
    element.attrs.retain(|_| keep.next().unwrap_or(true));

    for attr in &mut element.attrs {
        if map.contains_token(&attr.name) {
            continue;
        }
        if options.collapse_boolean_attributes && !element.is_foreign {
            collapse_boolean(attr);
        }
        clean_value(&tag, attr, options, map);
        if options.sort_class_name && attr.name.eq_ignore_ascii_case("class") {
            let sorted = sort_class_tokens(attr.value_str(), class_counts, map);
            attr.value = Some(sorted);
        }
    }

    if options.sort_attributes {
        sort_attributes(&mut element.attrs, map);
    }
}

/// Normalize every element's attributes
pub fn normalize_attributes(doc: &mut Document, options: &Options, map: &RestorationMap) {
    let class_counts = if options.sort_class_name {
        class_frequencies(doc, map)
    } else {
        HashMap::new()
    };
    let elements: Vec<NodeId> = doc
        .descendants(doc.root())
        .filter(|&id| doc.get(id).is_element())
        .collect();
    for id in elements {
        if let Some(element) = doc.element_mut(id) {
            normalize_element(element, options, map, &class_counts);
        }
    }
}

// ============================================================================
// Quoting
// ============================================================================

/// Pick the delimiter for a value and escape it inside.
///
/// The preferred quote wins unless the value contains it; with both quote
/// characters present the rarer one delimits (ties go to the preferred).
pub fn quote_value(value: &str, preferred: u8) -> (u8, Cow<'_, str>) {
    let (doubles, singles) = count_quotes(value);
    let other = if preferred == b'"' { b'\'' } else { b'"' };
    let (mine, theirs) = if preferred == b'"' {
        (doubles, singles)
    } else {
        (singles, doubles)
    };
    let quote = if mine == 0 {
        preferred
    } else if theirs < mine {
        other
    } else {
        preferred
    };
    (quote, escape_quote(value, quote))
}

/// The value may be written without quotes
///
/// The last value of a tag may not end in `/`, or it would read as `/>`.
pub fn can_unquote(value: &str, map: &RestorationMap, is_last: bool) -> bool {
    !value.is_empty()
        && !value
            .bytes()
            .any(|b| crate::core::scanner::is_html_space(b) || matches!(b, b'"' | b'\'' | b'`' | b'=' | b'<' | b'>'))
        && !map.contains_token(value)
        && !(is_last && value.ends_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse, NodeKind};
    use std::sync::Arc;

    fn attrs_of(input: &str, options: &Options) -> Vec<(String, Option<String>)> {
        let (mut doc, _) = parse(input, options, &RestorationMap::default()).unwrap();
        normalize_attributes(&mut doc, options, &RestorationMap::default());
        let first = doc.get(0).first_child.unwrap();
        match &doc.get(first).kind {
            NodeKind::Element(e) => e.attrs.iter().map(|a| (a.name.clone(), a.value.clone())).collect(),
            _ => Vec::new(),
        }
    }

    fn pair(name: &str, value: Option<&str>) -> (String, Option<String>) {
        (name.to_string(), value.map(str::to_string))
    }

    #[test]
    fn test_redundant_attributes() {
        let options = Options { remove_redundant_attributes: true, ..Options::default() };
        assert_eq!(attrs_of("<form method=GET action=x></form>", &options), vec![pair("action", Some("x"))]);
        assert_eq!(attrs_of("<input type=\" text \">", &options), vec![]);
        assert_eq!(
            attrs_of("<script charset=utf-8 src=a.js></script>", &options),
            vec![pair("charset", Some("utf-8")), pair("src", Some("a.js"))]
        );
        assert_eq!(attrs_of("<script charset=utf-8></script>", &options), vec![]);
    }

    #[test]
    fn test_script_type_removal_keeps_module() {
        let options = Options { remove_script_type_attributes: true, ..Options::default() };
        assert_eq!(attrs_of("<script type=text/javascript></script>", &options), vec![]);
        assert_eq!(
            attrs_of("<script type=module></script>", &options),
            vec![pair("type", Some("module"))]
        );
    }

    #[test]
    fn test_style_link_type_removal() {
        let options = Options { remove_style_link_type_attributes: true, ..Options::default() };
        assert_eq!(
            attrs_of("<link rel=stylesheet type=text/css href=a.css>", &options),
            vec![pair("rel", Some("stylesheet")), pair("href", Some("a.css"))]
        );
        assert_eq!(
            attrs_of("<link rel=icon type=text/css>", &options),
            vec![pair("rel", Some("icon")), pair("type", Some("text/css"))]
        );
    }

    #[test]
    fn test_empty_attributes() {
        let options = Options { remove_empty_attributes: EmptyAttributes::Default, ..Options::default() };
        assert_eq!(
            attrs_of("<div class=\" \" id=\"\" onclick=\"\" data-x=\"\"></div>", &options),
            vec![pair("data-x", Some(""))]
        );
        let options = Options {
            remove_empty_attributes: EmptyAttributes::Predicate(Arc::new(|name: &str, tag: &str| {
                tag == "img" && name == "alt"
            })),
            ..Options::default()
        };
        assert_eq!(attrs_of("<img alt=\"\" class=\"\">", &options), vec![pair("class", Some(""))]);
    }

    #[test]
    fn test_boolean_collapse() {
        let options = Options { collapse_boolean_attributes: true, ..Options::default() };
        assert_eq!(
            attrs_of("<input disabled=\"disabled\" value=\"x\" draggable=\"true\">", &options),
            vec![pair("disabled", None), pair("value", Some("x")), pair("draggable", Some("true"))]
        );
        assert_eq!(attrs_of("<div draggable=\"auto\"></div>", &options), vec![pair("draggable", None)]);
    }

    #[test]
    fn test_value_cleanup() {
        let options = Options {
            custom_attr_collapse: vec!["ng-class".into()],
            ..Options::default()
        };
        assert_eq!(
            attrs_of(
                "<a class=\"  a \n b \" href=\" /x \" style=\"color: red; ;\" onclick=\" javascript:go() \" ng-class=\"{ a:\n b }\">",
                &options
            ),
            vec![
                pair("class", Some("a b")),
                pair("href", Some("/x")),
                pair("style", Some("color: red")),
                pair("onclick", Some("go()")),
                pair("ng-class", Some("{ a: b }")),
            ]
        );
    }

    #[test]
    fn test_decode_entities() {
        let options = Options { decode_entities: true, ..Options::default() };
        assert_eq!(
            attrs_of("<a title=\"&lt;b&gt; &amp;copy\">", &options),
            vec![pair("title", Some("<b> &amp;copy"))]
        );
    }

    #[test]
    fn test_sort_attributes() {
        let options = Options { sort_attributes: true, ..Options::default() };
        assert_eq!(
            attrs_of("<div id=a class=b data-z=c>", &options),
            vec![pair("class", Some("b")), pair("data-z", Some("c")), pair("id", Some("a"))]
        );
    }

    #[test]
    fn test_sort_class_tokens_by_frequency() {
        let mut counts = HashMap::new();
        counts.insert("common".to_string(), 3);
        counts.insert("rare".to_string(), 1);
        counts.insert("also".to_string(), 1);
        let map = RestorationMap::default();
        assert_eq!(sort_class_tokens("rare common also", &counts, &map), "common also rare");
    }

    #[test]
    fn test_quote_value() {
        assert_eq!(quote_value("plain", b'"'), (b'"', Cow::Borrowed("plain")));
        assert_eq!(quote_value("say \"hi\"", b'"').0, b'\'');
        let (quote, value) = quote_value("a\"b'c'd", b'"');
        assert_eq!(quote, b'"');
        assert_eq!(value, "a&#34;b'c'd");
        let (quote, value) = quote_value("a\"b\"c'd", b'"');
        assert_eq!(quote, b'\'');
        assert_eq!(value, "a\"b\"c&#39;d");
    }

    #[test]
    fn test_can_unquote() {
        let map = RestorationMap::default();
        assert!(can_unquote("foo", &map, false));
        assert!(!can_unquote("", &map, false));
        assert!(!can_unquote("a b", &map, false));
        assert!(!can_unquote("a=b", &map, false));
        assert!(!can_unquote("path/", &map, true));
        assert!(can_unquote("path/", &map, false));
    }
}
