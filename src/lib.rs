//! RustyHTML-min - HTML minification with configurable policies
//!
//! Pipeline, one stage after another over an arena tree:
//! 1. guard: template fragments and ignore blocks become opaque tokens
//! 2. parse: structural parser with implied closes and foreign content
//! 3. prune: comment removal and conditional comment processing
//! 4. dispatch: embedded JS/CSS/JSON/URL content goes to user delegates
//! 5. attributes: redundancy, emptiness, booleans, cleanup, sorting
//! 6. whitespace: collapse and trim per element policy
//! 7. empty element removal
//! 8. serialize: tag omission, attribute quoting, line wrapping
//! 9. restore: tokens are swapped back for the original fragments
//!
//! ```
//! use rustyhtml_min::{minify, Options};
//!
//! let out = minify("<ul>\n  <li>one</li>\n  <li>two</li>\n</ul>", &Options::aggressive()).unwrap();
//! assert_eq!(out, "<ul><li>one<li>two</ul>");
//! ```

pub mod core;
pub mod dispatch;
pub mod dom;
pub mod error;
pub mod guard;
pub mod options;
pub mod policy;
pub mod serialize;
pub mod transform;
pub mod urls;

#[cfg(test)]
mod tests;

pub use dispatch::{delegate, ContentKind, Minify, MinifyContext};
pub use error::{ConfigError, DelegateMinifyError, MinifyError, ParseError};
pub use options::{EmptyAttributes, FragmentPattern, Options};
pub use urls::UrlShortener;

use transform::omission::plan_omissions;

/// Minify an HTML document or fragment
///
/// Fails on invalid options, input over `max_input_length` (counted in
/// characters), and on parse or delegate errors the options do not ask to
/// recover from.
pub fn minify(input: &str, options: &Options) -> Result<String, MinifyError> {
    options.validate()?;

    if let Some(limit) = options.max_input_length {
        // a byte length within the limit is within it in chars too
        if input.len() > limit {
            let actual = input.chars().count();
            if actual > limit {
                return Err(MinifyError::InputLimitExceeded { limit, actual });
            }
        }
    }

    let (guarded, map) = guard::guard(
        input,
        &options.ignore_custom_fragments,
        &options.ignore_marker,
        options.trim_custom_fragments,
    );
    let output = minify_guarded(&guarded, options, &map)?;
    Ok(guard::restore(&output, &map))
}

/// Run the pipeline over already guarded markup, leaving tokens in place
///
/// Nested markup (conditional comments, `process_scripts` bodies) goes
/// through here with the enclosing document's map, so its placeholders keep
/// their identity and are restored once, with the rest of the document.
pub(crate) fn minify_guarded(guarded: &str, options: &Options, map: &guard::RestorationMap) -> Result<String, MinifyError> {
    let (mut doc, diagnostics) = dom::parse(guarded, options, map)?;
    if !diagnostics.is_empty() {
        log::debug!("parsed with {} recovered error(s)", diagnostics.len());
    }

    transform::prune::prune_comments(&mut doc, options, map)?;
    dispatch::dispatch(&mut doc, options, map)?;
    transform::attributes::normalize_attributes(&mut doc, options, map);

    if options.collapse_whitespace {
        transform::whitespace::collapse_whitespace(&mut doc, options);
    }
    if options.remove_empty_elements {
        transform::prune::remove_empty_elements(&mut doc, options);
    }

    let omissions = plan_omissions(&doc, options);
    let output = serialize::serialize(&doc, options, &omissions, map);
    log::trace!("serialized {} byte(s) before restore", output.len());
    Ok(output)
}
