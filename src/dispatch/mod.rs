//! Content-Type Dispatcher
//!
//! Finds embedded code in the tree and hands it to the user's delegates:
//! - `<script>` bodies: JavaScript, JSON, or markup for `process_scripts` types
//! - `<style>` bodies and `style` attributes: CSS
//! - event handler attributes: JavaScript
//! - URL attributes (`href`, `src`, `srcset`, ...): the URL minifier
//!
//! Jobs are collected first, deduplicated through a per-call LRU cache and
//! run in parallel with rayon. Each result is written back to the node or
//! attribute it came from, so the output does not depend on scheduling.
//!
//! Content that mixes placeholders with comment syntax of the embedded
//! language is left alone, as is any delegate output that loses or
//! duplicates a placeholder.

pub mod cache;
pub mod content_type;

use std::collections::HashMap;

use memchr::{memchr, memchr2, memmem};
use rayon::prelude::*;

use crate::dom::{Document, NodeId, NodeKind};
use crate::error::{DelegateMinifyError, MinifyError};
use crate::guard::RestorationMap;
use crate::options::Options;

use self::cache::{ResultCache, CACHE_CAPACITY};
use self::content_type::{classify_script, is_css_type, is_event_handler, is_url_attribute, ScriptContent};

/// Kind of content handed to a delegate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// `<script>` body
    Script,
    /// Event handler attribute
    InlineScript,
    /// `<style>` body
    Style,
    /// `style` attribute
    InlineStyle,
    /// JSON-family `<script>` body
    Json,
    /// URL attribute value
    Url,
    /// `<script>` body of a `process_scripts` type, minified as markup
    Markup,
}

impl ContentKind {
    /// Delegate name used in error reports
    pub fn delegate_name(self) -> &'static str {
        match self {
            ContentKind::Script | ContentKind::InlineScript => "js",
            ContentKind::Style | ContentKind::InlineStyle => "css",
            ContentKind::Json => "json",
            ContentKind::Url => "url",
            ContentKind::Markup => "html",
        }
    }
}

/// Where a piece of content came from
#[derive(Debug, Clone, Copy)]
pub struct MinifyContext<'a> {
    pub kind: ContentKind,
    /// Element name
    pub tag: &'a str,
    /// Attribute name, for attribute content
    pub attribute: Option<&'a str>,
    /// Raw `type` attribute of the element, if any
    pub type_attr: Option<&'a str>,
}

/// An external minifier
///
/// Returning `Err` reports a failure; what happens next is decided by
/// `continue_on_minify_error`. Closures with the same signature implement
/// this trait.
pub trait Minify: Send + Sync {
    fn minify(&self, content: &str, context: &MinifyContext<'_>) -> Result<String, String>;
}

impl<F> Minify for F
where
    F: Fn(&str, &MinifyContext<'_>) -> Result<String, String> + Send + Sync,
{
    fn minify(&self, content: &str, context: &MinifyContext<'_>) -> Result<String, String> {
        self(content, context)
    }
}

/// Wrap a closure as a shareable delegate for [`Options`]
pub fn delegate<F>(f: F) -> std::sync::Arc<dyn Minify>
where
    F: Fn(&str, &MinifyContext<'_>) -> Result<String, String> + Send + Sync + 'static,
{
    std::sync::Arc::new(f)
}

// ============================================================================
// Jobs
// ============================================================================

/// Write-back target of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    /// Text node holding a script or style body
    Body(NodeId),
    /// Attribute by element and position
    Attribute(NodeId, usize),
}

#[derive(Debug, Clone)]
struct Job {
    target: Target,
    kind: ContentKind,
    tag: String,
    attribute: Option<String>,
    type_attr: Option<String>,
    content: String,
}

impl Job {
    fn site(&self) -> String {
        match &self.attribute {
            Some(attribute) => format!("{} attribute of <{}>", attribute, self.tag),
            None => format!("<{}>", self.tag),
        }
    }

    fn context(&self) -> MinifyContext<'_> {
        MinifyContext {
            kind: self.kind,
            tag: &self.tag,
            attribute: self.attribute.as_deref(),
            type_attr: self.type_attr.as_deref(),
        }
    }
}

fn delegate_for(kind: ContentKind, options: &Options) -> Option<&dyn Minify> {
    let delegate = match kind {
        ContentKind::Script | ContentKind::InlineScript => &options.minify_js,
        ContentKind::Style | ContentKind::InlineStyle => &options.minify_css,
        ContentKind::Json => &options.minify_json,
        ContentKind::Url => &options.minify_urls,
        ContentKind::Markup => return None,
    };
    delegate.as_deref()
}

/// Comment spans of JavaScript/CSS/markup in `content`, end exclusive
fn comment_regions(content: &str) -> Vec<(usize, usize)> {
    let bytes = content.as_bytes();
    let mut regions = Vec::new();
    let mut pos = 0;
    while let Some(i) = memchr2(b'/', b'<', &bytes[pos..]) {
        let start = pos + i;
        let rest = &bytes[start..];
        let end = if rest.starts_with(b"/*") {
            memmem::find(&rest[2..], b"*/").map_or(bytes.len(), |e| start + 2 + e + 2)
        } else if rest.starts_with(b"//") {
            memchr(b'\n', rest).map_or(bytes.len(), |e| start + e)
        } else if rest.starts_with(b"<!--") {
            memmem::find(&rest[4..], b"-->").map_or(bytes.len(), |e| start + 4 + e + 3)
        } else {
            pos = start + 1;
            continue;
        };
        regions.push((start, end));
        pos = end.max(start + 1);
    }
    regions
}

/// The region is the `<!--token-->` wrapper the guard puts around an ignore block
fn is_ignore_wrapper(content: &str, (start, end): (usize, usize), map: &RestorationMap) -> bool {
    content[start..end]
        .strip_prefix("<!--")
        .and_then(|rest| rest.strip_suffix("-->"))
        .and_then(|inner| map.lookup(inner))
        .and_then(|index| map.fragment(index))
        .is_some_and(|fragment| fragment.ignored_block)
}

/// A placeholder sits inside, or right next to, a comment
pub fn unsafe_overlap(content: &str, map: &RestorationMap) -> bool {
    let tokens = map.find_tokens(content);
    if tokens.is_empty() {
        return false;
    }
    let regions: Vec<(usize, usize)> = comment_regions(content)
        .into_iter()
        .filter(|&region| !is_ignore_wrapper(content, region, map))
        .collect();
    tokens
        .iter()
        .any(|t| regions.iter().any(|&(start, end)| t.start <= end && t.end >= start))
}

pub(crate) fn tokens_preserved(before: &str, after: &str, map: &RestorationMap) -> bool {
    let mut a: Vec<usize> = map.find_tokens(before).iter().map(|t| t.index).collect();
    let mut b: Vec<usize> = map.find_tokens(after).iter().map(|t| t.index).collect();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

/// The single text child holding an element's body
fn body_text(doc: &Document, id: NodeId) -> Option<(NodeId, &str)> {
    let node = doc.get(id);
    let child = node.first_child?;
    if node.last_child != Some(child) {
        return None;
    }
    doc.get(child).as_text().map(|text| (child, text))
}

fn collect_jobs(doc: &Document, options: &Options, map: &RestorationMap) -> Vec<Job> {
    let mut jobs = Vec::new();
    let push = |jobs: &mut Vec<Job>, job: Job| {
        if map.contains_token(&job.content) && unsafe_overlap(&job.content, map) {
            log::debug!("leaving {} untouched: placeholder overlaps a comment", job.site());
        } else {
            jobs.push(job);
        }
    };

    for id in doc.descendants(doc.root()) {
        let Some(element) = doc.element(id) else {
            continue;
        };
        if element.is_foreign {
            continue;
        }
        let tag = element.name.to_ascii_lowercase();
        let type_attr = element.attr("type").map(|a| a.value_str().to_string());

        let body_kind = match tag.as_str() {
            "script" => match classify_script(type_attr.as_deref(), &options.process_scripts) {
                ScriptContent::Markup => Some(ContentKind::Markup),
                ScriptContent::Json => Some(ContentKind::Json),
                ScriptContent::JavaScript => Some(ContentKind::Script),
                ScriptContent::Other => None,
            },
            "style" if is_css_type(type_attr.as_deref()) => Some(ContentKind::Style),
            _ => None,
        };
        if let Some(kind) = body_kind {
            let wanted = kind == ContentKind::Markup || delegate_for(kind, options).is_some();
            if let Some((text_id, text)) = body_text(doc, id).filter(|_| wanted) {
                if !text.trim().is_empty() {
                    push(
                        &mut jobs,
                        Job {
                            target: Target::Body(text_id),
                            kind,
                            tag: tag.clone(),
                            attribute: None,
                            type_attr: type_attr.clone(),
                            content: text.to_string(),
                        },
                    );
                }
            }
        }

        for (index, attr) in element.attrs.iter().enumerate() {
            let Some(value) = attr.value.as_deref() else {
                continue;
            };
            let name = attr.name.to_ascii_lowercase();
            let kind = if name == "style" {
                ContentKind::InlineStyle
            } else if is_event_handler(&name) {
                ContentKind::InlineScript
            } else if name == "srcset" || is_url_attribute(&tag, &name) {
                ContentKind::Url
            } else {
                continue;
            };
            if delegate_for(kind, options).is_none() || value.trim().is_empty() {
                continue;
            }
            push(
                &mut jobs,
                Job {
                    target: Target::Attribute(id, index),
                    kind,
                    tag: tag.clone(),
                    attribute: Some(name),
                    type_attr: type_attr.clone(),
                    content: value.to_string(),
                },
            );
        }
    }
    jobs
}

/// Minify each candidate URL of a `srcset` list
fn minify_srcset(delegate: &dyn Minify, value: &str, context: &MinifyContext<'_>) -> Result<String, String> {
    let mut candidates = Vec::new();
    for candidate in value.split(',') {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            continue;
        }
        let (url, descriptor) = match candidate.find(|c: char| c.is_ascii_whitespace()) {
            Some(split) => (&candidate[..split], candidate[split..].trim()),
            None => (candidate, ""),
        };
        let url = delegate.minify(url, context)?;
        candidates.push(if descriptor.is_empty() {
            url
        } else {
            format!("{} {}", url, descriptor)
        });
    }
    Ok(candidates.join(", "))
}

fn run_job(job: &Job, options: &Options, map: &RestorationMap) -> Result<String, MinifyError> {
    let minified = if job.kind == ContentKind::Markup {
        crate::minify_guarded(&job.content, options, map)?
    } else {
        let Some(delegate) = delegate_for(job.kind, options) else {
            return Ok(job.content.clone());
        };
        let context = job.context();
        let result = if job.attribute.as_deref() == Some("srcset") {
            minify_srcset(delegate, &job.content, &context)
        } else {
            delegate.minify(&job.content, &context)
        };
        result.map_err(|message| {
            MinifyError::Delegate(DelegateMinifyError {
                delegate: job.kind.delegate_name(),
                site: job.site(),
                message,
            })
        })?
    };

    if !tokens_preserved(&job.content, &minified, map) {
        log::warn!("{} minifier changed placeholders in {}; keeping original", job.kind.delegate_name(), job.site());
        return Ok(job.content.clone());
    }
    Ok(minified)
}

fn write_back(doc: &mut Document, target: Target, value: String) {
    match target {
        Target::Body(text_id) => {
            if let NodeKind::Text(text) = &mut doc.get_mut(text_id).kind {
                *text = value;
            }
        }
        Target::Attribute(id, index) => {
            if let Some(attr) = doc.element_mut(id).and_then(|e| e.attrs.get_mut(index)) {
                attr.value = Some(value);
            }
        }
    }
}

/// Run every delegate the options enable and write the results into the tree
pub fn dispatch(doc: &mut Document, options: &Options, map: &RestorationMap) -> Result<(), MinifyError> {
    let jobs = collect_jobs(doc, options, map);
    if jobs.is_empty() {
        return Ok(());
    }
    log::debug!("dispatching {} embedded content job(s)", jobs.len());

    let mut cache = ResultCache::default();
    for batch in jobs.chunks(CACHE_CAPACITY.get()) {
        let mut outcome: Vec<Option<String>> = vec![None; batch.len()];
        let mut unique: Vec<&Job> = Vec::new();
        let mut waiting: Vec<(usize, usize)> = Vec::new();
        let mut seen: HashMap<(ContentKind, &str), usize> = HashMap::new();

        for (i, job) in batch.iter().enumerate() {
            if let Some(hit) = cache.get(job.kind, &job.content) {
                outcome[i] = Some(hit);
                continue;
            }
            let slot = *seen.entry((job.kind, job.content.as_str())).or_insert_with(|| {
                unique.push(job);
                unique.len() - 1
            });
            waiting.push((i, slot));
        }

        let computed: Vec<Result<String, MinifyError>> =
            unique.par_iter().map(|job| run_job(job, options, map)).collect();

        let mut settled: Vec<Option<String>> = Vec::with_capacity(unique.len());
        for (job, result) in unique.iter().zip(computed) {
            match result {
                Ok(minified) => {
                    cache.put(job.kind, job.content.clone(), minified.clone());
                    settled.push(Some(minified));
                }
                Err(MinifyError::Delegate(err)) if options.continue_on_minify_error => {
                    log::warn!("keeping original content: {}", err);
                    settled.push(None);
                }
                Err(err) => return Err(err),
            }
        }
        for (i, slot) in waiting {
            outcome[i] = settled[slot].clone();
        }
        for (job, result) in batch.iter().zip(outcome) {
            if let Some(value) = result {
                write_back(doc, job.target, value);
            }
        }
    }
    Ok(())
}
