//! End-to-end pipeline tests

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::dispatch::delegate;
use crate::dom::parse;
use crate::guard::RestorationMap;
use crate::{minify, EmptyAttributes, FragmentPattern, MinifyError, Options, UrlShortener};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn collapsing() -> Options {
    Options { collapse_whitespace: true, ..Options::default() }
}

/// Element names with their depth, as a browser-style parse sees them
fn shape(html: &str) -> Vec<(usize, String)> {
    let (doc, _) = parse(html, &Options::default(), &RestorationMap::default()).unwrap();
    doc.descendants(doc.root())
        .filter_map(|id| {
            let name = doc.element_name(id)?.to_string();
            let mut depth = 0;
            let mut up = doc.get(id).parent;
            while let Some(parent) = up {
                depth += 1;
                up = doc.get(parent).parent;
            }
            Some((depth, name))
        })
        .collect()
}

// ============================================================================
// Whitespace
// ============================================================================

#[test]
fn test_preformatted_content_untouched() {
    init();
    let out = minify("<div><pRe> $foo = \"baz\"; </pRe>    </div>", &collapsing()).unwrap();
    assert_eq!(out, "<div><pre> $foo = \"baz\"; </pre></div>");
}

#[test]
fn test_inline_spacing_survives() {
    init();
    let out = minify("<p>\n  Hello   <b>big</b>   world  \n</p>", &collapsing()).unwrap();
    assert_eq!(out, "<p>Hello <b>big</b> world</p>");
}

// ============================================================================
// Fragments and ignore blocks
// ============================================================================

#[test]
fn test_protected_fragments_byte_identical() {
    init();
    let input = "<img class=\"{% foo %} {% bar %}\">";
    let options = Options {
        ignore_custom_fragments: vec![FragmentPattern::new("{%", "%}")],
        ..collapsing()
    };
    assert_eq!(minify(input, &options).unwrap(), input);
}

#[test]
fn test_fragment_between_words_keeps_spaces() {
    init();
    let options = Options {
        ignore_custom_fragments: vec![FragmentPattern::new("{{", "}}")],
        ..collapsing()
    };
    let out = minify("<div>  a  {{ name }}  b  </div>", &options).unwrap();
    assert_eq!(out, "<div>a {{ name }} b</div>");
}

#[test]
fn test_ignore_block_kept_verbatim() {
    init();
    let input = "<!-- htmlmin:ignore --><p>   keep   </p><!-- htmlmin:ignore --><p>  x  </p>";
    let out = minify(input, &collapsing()).unwrap();
    assert_eq!(out, "<p>   keep   </p><p>x</p>");
}

// ============================================================================
// Tag omission
// ============================================================================

#[test]
fn test_table_sections_omitted() {
    init();
    let input = "<table><thead><tr><th>foo<th>bar</th> <th>baz</th></tr></thead> \
                 <tbody><tr><td>boo</td></tr></tbody></table>";
    let options = Options {
        remove_optional_tags: true,
        ..collapsing()
    };
    let out = minify(input, &options).unwrap();
    assert_eq!(out, "<table><thead><tr><th>foo<th>bar<th>baz<tbody><tr><td>boo</table>");
    // the shortened markup reads back to the same structure
    assert_eq!(minify(&out, &options).unwrap(), out);
}

#[test]
fn test_omission_keeps_open_descendants_in_place() {
    init();
    let options = Options {
        remove_optional_tags: true,
        include_auto_generated_tags: false,
        ..Options::default()
    };
    let input = "<div><p><b>x</p><div>y</div></div>";
    let once = minify(input, &options).unwrap();
    assert_eq!(once, input);
    assert_eq!(shape(&once), shape(input));
    assert_eq!(minify(&once, &options).unwrap(), once);
}

#[test]
fn test_aggressive_document() {
    init();
    let input = "<!DOCTYPE html>\n<html>\n  <head>\n    <title> Test </title>\n  </head>\n  <body>\n    \
                 <p class=\"\">Hello   <b>world</b> !</p>\n  </body>\n</html>\n";
    let out = minify(input, &Options::aggressive()).unwrap();
    assert_eq!(out, "<!doctype html><title>Test</title><p>Hello <b>world</b> !");
}

#[test]
fn test_idempotent() {
    init();
    let input = "<div id=\"main\">\n  <ul>\n    <li><a href=\"/a\">A</a></li>\n    <li>B</li>\n  </ul>\n  \
                 <p>one<p>two</p>\n  <select><option>x<option selected=\"selected\">y</select>\n</div>";
    let options = Options::aggressive();
    let once = minify(input, &options).unwrap();
    let twice = minify(&once, &options).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_partial_markup() {
    init();
    let options = Options { partial_markup: true, ..Options::default() };
    assert_eq!(minify("</div><p>a", &options).unwrap(), "</div><p>a");
    assert_eq!(minify("</div><p>a", &Options::default()).unwrap(), "<p>a</p>");
}

// ============================================================================
// Attributes
// ============================================================================

#[test]
fn test_both_quote_characters() {
    init();
    let options = Options { decode_entities: true, ..Options::default() };
    let out = minify("<p title='He said \"hi\" and &#39;bye&#39;'></p>", &options).unwrap();
    assert_eq!(out, "<p title=\"He said &#34;hi&#34; and 'bye'\"></p>");
}

#[test]
fn test_attribute_cleanup() {
    init();
    let options = Options {
        remove_redundant_attributes: true,
        collapse_boolean_attributes: true,
        remove_attribute_quotes: true,
        remove_empty_attributes: EmptyAttributes::Default,
        ..Options::default()
    };
    let out = minify("<form method=\"get\"><input type=\"text\" disabled=\"disabled\" class=\"\" name=\"q\"></form>", &options)
        .unwrap();
    assert_eq!(out, "<form><input disabled name=q></form>");
}

#[test]
fn test_trailing_slash_value_keeps_quotes() {
    init();
    let options = Options { remove_attribute_quotes: true, ..Options::default() };
    assert_eq!(minify("<a href=\"foo/\">x</a>", &options).unwrap(), "<a href=\"foo/\">x</a>");
    assert_eq!(minify("<img src=\"a/\" />", &options).unwrap(), "<img src=\"a/\">");
}

// ============================================================================
// Comments
// ============================================================================

#[test]
fn test_comments() {
    init();
    let options = Options { remove_comments: true, ..Options::default() };
    assert_eq!(minify("<p>a<!-- x -->b<!--! keep --></p>", &options).unwrap(), "<p>ab<!--! keep --></p>");
}

#[test]
fn test_conditional_comment_body_minified() {
    init();
    let options = Options {
        remove_comments: true,
        process_conditional_comments: true,
        ..collapsing()
    };
    let out = minify("<!--[if IE]> <p> a </p> <![endif]-->", &options).unwrap();
    assert_eq!(out, "<!--[if IE]><p>a</p><![endif]-->");
}

#[test]
fn test_conditional_comment_keeps_fragments() {
    init();
    let options = Options {
        process_conditional_comments: true,
        ignore_custom_fragments: vec![FragmentPattern::new("{{", "}}")],
        ..collapsing()
    };
    let out = minify("<!--[if IE]> <p> {{ x }} </p> <![endif]-->", &options).unwrap();
    assert_eq!(out, "<!--[if IE]><p>{{ x }}</p><![endif]-->");
}

// ============================================================================
// Delegates
// ============================================================================

#[test]
fn test_delegate_failure_keeps_original() {
    init();
    let options = Options {
        minify_css: Some(delegate(|_, _| Err("bad css".to_string()))),
        ..Options::default()
    };
    let input = "<style>a { color: red }</style>";
    assert_eq!(minify(input, &options).unwrap(), input);

    let strict = Options { continue_on_minify_error: false, ..options };
    match minify(input, &strict) {
        Err(MinifyError::Delegate(err)) => assert_eq!(err.delegate, "css"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_process_scripts_as_markup() {
    init();
    let options = Options {
        process_scripts: vec!["text/ng-template".to_string()],
        ..collapsing()
    };
    let out = minify("<script type=\"text/ng-template\"><div>  <p> x </p> </div></script>", &options).unwrap();
    assert_eq!(out, "<script type=\"text/ng-template\"><div><p>x</p></div></script>");
}

#[test]
fn test_process_scripts_with_ignore_block() {
    init();
    let options = Options {
        process_scripts: vec!["text/x-tmpl".to_string()],
        ..collapsing()
    };
    let input = "<script type=\"text/x-tmpl\"><div> a </div><!-- htmlmin:ignore --><b>  KEEP  </b>\
                 <!-- htmlmin:ignore --></script>";
    let out = minify(input, &options).unwrap();
    assert_eq!(out, "<script type=\"text/x-tmpl\"><div>a</div><b>  KEEP  </b></script>");
}

#[test]
fn test_process_scripts_fragments_match_top_level() {
    init();
    let options = Options {
        process_scripts: vec!["text/x-tmpl".to_string()],
        ignore_custom_fragments: vec![FragmentPattern::new("{{", "}}")],
        trim_custom_fragments: true,
        ..collapsing()
    };
    let markup = "<p><span>a</span> {{ x }} <span>b</span></p>";
    let top = minify(markup, &options).unwrap();
    let nested = minify(&format!("<script type=\"text/x-tmpl\">{}</script>", markup), &options).unwrap();
    assert!(top.contains("{{ x }}"));
    assert_eq!(nested, format!("<script type=\"text/x-tmpl\">{}</script>", top));
}

#[test]
fn test_url_shortener_delegate() {
    init();
    let shortener = UrlShortener::new("http://example.com/a/b/").unwrap();
    let options = Options {
        minify_urls: Some(Arc::new(shortener)),
        ..Options::default()
    };
    let out = minify(
        "<a href=\"http://example.com/a/b/c.html\"><img src=\"http://example.com/img/x.png\"></a><a href=\"mailto:a@b.c\">m</a>",
        &options,
    )
    .unwrap();
    assert_eq!(out, "<a href=\"c.html\"><img src=\"/img/x.png\"></a><a href=\"mailto:a@b.c\">m</a>");
}

// ============================================================================
// Errors and limits
// ============================================================================

#[test]
fn test_input_length_boundary() {
    init();
    let options = Options { max_input_length: Some(10), ..Options::default() };
    assert!(minify("<p>abc</p>", &options).is_ok());
    assert_eq!(
        minify("<p>abcd</p>", &options),
        Err(MinifyError::InputLimitExceeded { limit: 10, actual: 11 })
    );
    // counted in characters
    assert!(minify("<p>ééé</p>", &options).is_ok());
}

#[test]
fn test_parse_error_position() {
    init();
    let input = "<div>\n  <p>\n  <a href=\"x";
    match minify(input, &Options::default()) {
        Err(MinifyError::Parse(err)) => assert_eq!(err.line_and_column(), (3, 3)),
        other => panic!("unexpected {:?}", other),
    }

    let lenient = Options { continue_on_parse_error: true, ..Options::default() };
    let out = minify(input, &lenient).unwrap();
    assert!(out.contains("<a href=\"x"));
}

#[test]
fn test_recovery_is_linear() {
    init();
    let input = "<!-- ".repeat(20_000);
    let lenient = Options { continue_on_parse_error: true, ..Options::default() };
    let started = Instant::now();
    let out = minify(&input, &lenient).unwrap();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(out, input);
}

#[test]
fn test_invalid_option() {
    let options = Options { quote_character: Some('x'), ..Options::default() };
    assert!(matches!(minify("<p></p>", &options), Err(MinifyError::Config(_))));
}

#[test]
fn test_line_wrap() {
    init();
    let options = Options { max_line_length: Some(20), ..Options::default() };
    let out = minify("<ul><li>alpha</li><li>beta</li><li>gamma</li></ul>", &options).unwrap();
    assert!(out.lines().all(|l| l.chars().count() <= 20));
    assert_eq!(out.replace('\n', ""), "<ul><li>alpha</li><li>beta</li><li>gamma</li></ul>");
}
