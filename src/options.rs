//! Minifier configuration
//!
//! A flat option set; every policy is opt-in. `Options::default()` still
//! re-serializes the parsed document and cleans attribute values that have a
//! canonical form: class lists are squashed, trailing `;` leaves `style`,
//! `javascript:` leaves event handlers, and URL and numeric values are trimmed.

use std::fmt;
use std::sync::Arc;

use crate::dispatch::Minify;
use crate::dom::Attribute;
use crate::error::ConfigError;

/// Per-element whitespace veto: `(tag name, attributes) -> Some(allowed)`,
/// `None` defers to the element policy table
pub type WhitespaceHook = Arc<dyn Fn(&str, &[Attribute]) -> Option<bool> + Send + Sync>;

/// Empty attribute predicate: `(attribute name, tag name) -> remove?`
pub type EmptyAttributeHook = Arc<dyn Fn(&str, &str) -> bool + Send + Sync>;

/// How attributes with empty values are treated
#[derive(Clone, Default)]
pub enum EmptyAttributes {
    /// Keep every empty attribute
    #[default]
    Off,
    /// Remove empty `class`, `id`, `style`, `title`, `lang`, `dir` and event handlers
    Default,
    /// Remove exactly the empty attributes the predicate accepts
    Predicate(EmptyAttributeHook),
}

impl fmt::Debug for EmptyAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptyAttributes::Off => f.write_str("Off"),
            EmptyAttributes::Default => f.write_str("Default"),
            EmptyAttributes::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A template syntax region protected from every transformation,
/// delimited by literal `open` and `close` markers (e.g. `{%` and `%}`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentPattern {
    pub open: String,
    pub close: String,
}

impl FragmentPattern {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        FragmentPattern {
            open: open.into(),
            close: close.into(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.open.is_empty() || self.close.is_empty() {
            return Err(ConfigError::new(
                "ignore_custom_fragments",
                format!("empty delimiter in pattern {:?} .. {:?}", self.open, self.close),
            ));
        }
        Ok(())
    }
}

/// All user-selectable policies
#[derive(Clone)]
pub struct Options {
    // Whitespace
    pub collapse_whitespace: bool,
    pub conservative_collapse: bool,
    pub preserve_line_breaks: bool,
    pub collapse_inline_tag_whitespace: bool,
    pub trim_custom_fragments: bool,
    /// Custom element names treated as inline-text for whitespace purposes
    pub inline_custom_elements: Vec<String>,
    pub can_collapse_whitespace: Option<WhitespaceHook>,
    pub can_trim_whitespace: Option<WhitespaceHook>,

    // Tags
    pub remove_optional_tags: bool,
    /// Emit end tags the parser had to imply
    pub include_auto_generated_tags: bool,
    pub remove_empty_elements: bool,
    pub remove_empty_elements_except: Vec<String>,
    pub keep_closing_slash: bool,
    pub case_sensitive: bool,
    /// HTML5 content model (transparent anchors) instead of the legacy one
    pub html5: bool,
    pub partial_markup: bool,
    pub use_short_doctype: bool,

    // Comments
    pub remove_comments: bool,
    /// Comments whose body starts with one of these prefixes survive `remove_comments`
    pub ignore_custom_comments: Vec<String>,
    pub process_conditional_comments: bool,

    // Attributes
    pub remove_redundant_attributes: bool,
    pub remove_script_type_attributes: bool,
    pub remove_style_link_type_attributes: bool,
    pub remove_empty_attributes: EmptyAttributes,
    pub collapse_boolean_attributes: bool,
    pub remove_attribute_quotes: bool,
    /// Preferred attribute delimiter, `"` or `'`
    pub quote_character: Option<char>,
    pub remove_tag_whitespace: bool,
    pub sort_attributes: bool,
    pub sort_class_name: bool,
    /// Attribute names whose values get whitespace collapsed
    pub custom_attr_collapse: Vec<String>,
    pub decode_entities: bool,

    // Fragments
    pub ignore_custom_fragments: Vec<FragmentPattern>,
    /// Comment body that opens and closes an ignored block
    pub ignore_marker: String,

    // Delegates
    pub minify_js: Option<Arc<dyn Minify>>,
    pub minify_css: Option<Arc<dyn Minify>>,
    pub minify_json: Option<Arc<dyn Minify>>,
    pub minify_urls: Option<Arc<dyn Minify>>,
    /// Script `type` values (exact, case-sensitive) whose body is minified as markup
    pub process_scripts: Vec<String>,

    // Errors and limits
    pub continue_on_parse_error: bool,
    pub continue_on_minify_error: bool,
    pub max_input_length: Option<usize>,
    pub max_line_length: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            collapse_whitespace: false,
            conservative_collapse: false,
            preserve_line_breaks: false,
            collapse_inline_tag_whitespace: false,
            trim_custom_fragments: false,
            inline_custom_elements: Vec::new(),
            can_collapse_whitespace: None,
            can_trim_whitespace: None,
            remove_optional_tags: false,
            include_auto_generated_tags: true,
            remove_empty_elements: false,
            remove_empty_elements_except: Vec::new(),
            keep_closing_slash: false,
            case_sensitive: false,
            html5: true,
            partial_markup: false,
            use_short_doctype: false,
            remove_comments: false,
            ignore_custom_comments: vec!["!".to_string()],
            process_conditional_comments: false,
            remove_redundant_attributes: false,
            remove_script_type_attributes: false,
            remove_style_link_type_attributes: false,
            remove_empty_attributes: EmptyAttributes::Off,
            collapse_boolean_attributes: false,
            remove_attribute_quotes: false,
            quote_character: None,
            remove_tag_whitespace: false,
            sort_attributes: false,
            sort_class_name: false,
            custom_attr_collapse: Vec::new(),
            decode_entities: false,
            ignore_custom_fragments: Vec::new(),
            ignore_marker: "htmlmin:ignore".to_string(),
            minify_js: None,
            minify_css: None,
            minify_json: None,
            minify_urls: None,
            process_scripts: Vec::new(),
            continue_on_parse_error: false,
            continue_on_minify_error: true,
            max_input_length: None,
            max_line_length: None,
        }
    }
}

impl Options {
    /// The aggressive preset: every size-reducing policy that keeps rendering intact
    pub fn aggressive() -> Self {
        Options {
            collapse_whitespace: true,
            remove_optional_tags: true,
            remove_comments: true,
            remove_redundant_attributes: true,
            remove_script_type_attributes: true,
            remove_style_link_type_attributes: true,
            remove_empty_attributes: EmptyAttributes::Default,
            collapse_boolean_attributes: true,
            remove_attribute_quotes: true,
            use_short_doctype: true,
            ..Options::default()
        }
    }

    /// Check option values that cannot be interpreted
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(q) = self.quote_character {
            if q != '"' && q != '\'' {
                return Err(ConfigError::new(
                    "quote_character",
                    format!("expected '\"' or '\\'', got {:?}", q),
                ));
            }
        }
        if self.ignore_marker.is_empty() || self.ignore_marker.contains("--") {
            return Err(ConfigError::new(
                "ignore_marker",
                "must be a non-empty comment body without \"--\"",
            ));
        }
        if self.max_line_length == Some(0) {
            return Err(ConfigError::new("max_line_length", "must be greater than zero"));
        }
        for pattern in &self.ignore_custom_fragments {
            pattern.validate()?;
        }
        Ok(())
    }

    /// Preferred quote byte
    #[inline]
    pub(crate) fn quote_byte(&self) -> u8 {
        match self.quote_character {
            Some('\'') => b'\'',
            _ => b'"',
        }
    }

    pub(crate) fn is_inline_custom_element(&self, name: &str) -> bool {
        self.inline_custom_elements
            .iter()
            .any(|n| n.eq_ignore_ascii_case(name))
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("collapse_whitespace", &self.collapse_whitespace)
            .field("conservative_collapse", &self.conservative_collapse)
            .field("preserve_line_breaks", &self.preserve_line_breaks)
            .field("collapse_inline_tag_whitespace", &self.collapse_inline_tag_whitespace)
            .field("remove_optional_tags", &self.remove_optional_tags)
            .field("remove_comments", &self.remove_comments)
            .field("remove_attribute_quotes", &self.remove_attribute_quotes)
            .field("remove_empty_attributes", &self.remove_empty_attributes)
            .field("ignore_custom_fragments", &self.ignore_custom_fragments)
            .field("minify_js", &self.minify_js.is_some())
            .field("minify_css", &self.minify_css.is_some())
            .field("minify_json", &self.minify_json.is_some())
            .field("minify_urls", &self.minify_urls.is_some())
            .field("process_scripts", &self.process_scripts)
            .field("partial_markup", &self.partial_markup)
            .field("max_input_length", &self.max_input_length)
            .field("max_line_length", &self.max_line_length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(Options::default().validate().is_ok());
        assert!(Options::aggressive().validate().is_ok());
    }

    #[test]
    fn test_bad_quote_character() {
        let opts = Options {
            quote_character: Some('`'),
            ..Options::default()
        };
        let err = opts.validate().unwrap_err();
        assert_eq!(err.option, "quote_character");
    }

    #[test]
    fn test_empty_fragment_delimiter() {
        let opts = Options {
            ignore_custom_fragments: vec![FragmentPattern::new("{{", "")],
            ..Options::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_quote_byte() {
        let opts = Options {
            quote_character: Some('\''),
            ..Options::default()
        };
        assert_eq!(opts.quote_byte(), b'\'');
        assert_eq!(Options::default().quote_byte(), b'"');
    }
}
