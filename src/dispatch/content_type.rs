//! Content classification for embedded code
//!
//! Decides which delegate (if any) owns a `<script>` body, a `<style>` body
//! or an attribute value. Media types compare case-insensitively with
//! parameters (`; charset=...`) stripped; `process_scripts` entries compare
//! against the raw `type` value exactly.

/// Script types that run as JavaScript (an absent or empty type counts)
const JAVASCRIPT_TYPES: [&str; 8] = [
    "text/javascript",
    "text/ecmascript",
    "text/jscript",
    "text/livescript",
    "application/javascript",
    "application/x-javascript",
    "application/ecmascript",
    "module",
];

const JSON_TYPES: [&str; 5] = [
    "application/json",
    "application/ld+json",
    "importmap",
    "speculationrules",
    "application/manifest+json",
];

/// Attributes holding a single URL
const URL_ATTRIBUTES: [&str; 12] = [
    "href", "src", "action", "cite", "poster", "formaction", "longdesc", "usemap", "codebase",
    "background", "profile", "manifest",
];

/// Attributes holding numbers
const NUMERIC_ATTRIBUTES: [&str; 14] = [
    "tabindex", "colspan", "rowspan", "maxlength", "minlength", "size", "start", "span", "cols",
    "rows", "width", "height", "border", "step",
];

/// What a `<script>` element holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptContent {
    /// Listed in `process_scripts`: minified as markup
    Markup,
    Json,
    JavaScript,
    /// Unknown data block, left as is
    Other,
}

/// Media type without parameters, trimmed and lowercased
pub fn media_type(raw: &str) -> String {
    raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

pub fn is_javascript_type(raw: Option<&str>) -> bool {
    match raw {
        None => true,
        Some(raw) => {
            let media = media_type(raw);
            media.is_empty() || JAVASCRIPT_TYPES.contains(&media.as_str())
        }
    }
}

pub fn is_json_type(raw: &str) -> bool {
    JSON_TYPES.contains(&media_type(raw).as_str())
}

/// `<style>` and `<link>` types meaning CSS (an absent or empty type counts)
pub fn is_css_type(raw: Option<&str>) -> bool {
    raw.map_or(true, |raw| {
        let media = media_type(raw);
        media.is_empty() || media == "text/css"
    })
}

/// Classify a script body from its raw `type` attribute
pub fn classify_script(type_attr: Option<&str>, process_scripts: &[String]) -> ScriptContent {
    if let Some(raw) = type_attr {
        if process_scripts.iter().any(|t| t == raw) {
            return ScriptContent::Markup;
        }
        if is_json_type(raw) {
            return ScriptContent::Json;
        }
    }
    if is_javascript_type(type_attr) {
        ScriptContent::JavaScript
    } else {
        ScriptContent::Other
    }
}

#[inline]
pub fn is_event_handler(name: &str) -> bool {
    name.len() > 2
        && name.as_bytes()[..2].eq_ignore_ascii_case(b"on")
        && name.as_bytes()[2..].iter().all(u8::is_ascii_alphabetic)
}

/// Attribute whose value is one URL (`srcset` holds a list and is separate)
pub fn is_url_attribute(tag: &str, name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    if name == "data" {
        return tag.eq_ignore_ascii_case("object");
    }
    URL_ATTRIBUTES.contains(&name.as_str())
}

pub fn is_numeric_attribute(name: &str) -> bool {
    NUMERIC_ATTRIBUTES.iter().any(|n| n.eq_ignore_ascii_case(name))
}
