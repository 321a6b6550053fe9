//! Node removal passes
//!
//! - Comments: dropped under `remove_comments`, except conditional comments
//!   and those starting with an `ignore_custom_comments` prefix
//! - Conditional comment bodies are minified as markup when asked to
//! - Empty elements: dropped bottom-up under `remove_empty_elements`

use crate::dispatch::tokens_preserved;
use crate::dom::{Document, NodeId, NodeKind};
use crate::error::MinifyError;
use crate::guard::RestorationMap;
use crate::options::Options;

/// Split a conditional comment body into (opener, content, closer)
fn split_conditional(body: &str) -> Option<(&str, &str, &str)> {
    let open_end = body.find("]>")? + 2;
    let close_start = body.rfind("<![endif]")?;
    if close_start < open_end {
        return None;
    }
    Some((&body[..open_end], &body[open_end..close_start], &body[close_start..]))
}

/// Remove or rewrite comment nodes
pub fn prune_comments(doc: &mut Document, options: &Options, map: &RestorationMap) -> Result<(), MinifyError> {
    let comments: Vec<NodeId> = doc
        .descendants(doc.root())
        .filter(|&id| matches!(doc.get(id).kind, NodeKind::Comment(_)))
        .collect();

    let mut removed = 0usize;
    for id in comments {
        let NodeKind::Comment(comment) = &doc.get(id).kind else {
            continue;
        };

        if comment.is_conditional {
            if !options.process_conditional_comments {
                continue;
            }
            let Some((open, content, close)) = split_conditional(&comment.body) else {
                continue;
            };
            let inner = Options {
                partial_markup: true,
                ..options.clone()
            };
            let minified = crate::minify_guarded(content, &inner, map)?;
            if !tokens_preserved(content, &minified, map) {
                log::warn!("conditional comment lost a placeholder; keeping original");
                continue;
            }
            let body = format!("{}{}{}", open, minified, close);
            if let NodeKind::Comment(comment) = &mut doc.get_mut(id).kind {
                comment.body = body;
            }
        } else if options.remove_comments && !comment.is_ignorable {
            doc.detach(id);
            removed += 1;
        }
    }

    if removed > 0 {
        log::debug!("removed {} comment(s)", removed);
        normalize_all(doc);
    }
    Ok(())
}

/// Merge text nodes that became adjacent after removals
pub(crate) fn normalize_all(doc: &mut Document) {
    let root = doc.root();
    let parents: Vec<NodeId> = std::iter::once(root)
        .chain(doc.descendants(root))
        .filter(|&id| doc.get(id).has_children())
        .collect();
    for parent in parents {
        doc.normalize_text(parent);
    }
}

/// Elements that keep meaning without content
fn can_remove_element(doc: &Document, id: NodeId, options: &Options) -> bool {
    let Some(element) = doc.element(id) else {
        return false;
    };
    if element.is_void
        || options
            .remove_empty_elements_except
            .iter()
            .any(|n| n.eq_ignore_ascii_case(&element.name))
    {
        return false;
    }
    let has = |name: &str| element.attr(name).is_some();
    match element.name.to_ascii_lowercase().as_str() {
        "textarea" => false,
        "audio" | "script" | "video" => !has("src"),
        "iframe" => !has("src") && !has("srcdoc"),
        "object" => !has("data"),
        "applet" => !has("code"),
        _ => true,
    }
}

/// Children are absent or whitespace-only text
fn is_empty(doc: &Document, id: NodeId) -> bool {
    doc.children(id).all(|child| doc.get(child).is_whitespace_only())
}

/// Remove elements with no content, innermost first
pub fn remove_empty_elements(doc: &mut Document, options: &Options) {
    let root = doc.root();
    let mut order: Vec<NodeId> = doc.descendants(root).collect();
    // Reverse pre-order visits children before their parents
    order.reverse();

    let mut removed = 0usize;
    for id in order {
        if doc.get(id).parent.is_none() {
            continue;
        }
        if can_remove_element(doc, id, options) && is_empty(doc, id) {
            log::trace!("removing empty <{}>", doc.element_name(id).unwrap_or_default());
            doc.detach(id);
            removed += 1;
        }
    }

    if removed > 0 {
        log::debug!("removed {} empty element(s)", removed);
        normalize_all(doc);
    }
}
