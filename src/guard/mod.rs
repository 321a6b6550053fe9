//! Fragment Guard
//!
//! Replaces user template syntax (`{% ... %}`, `<?php ... ?>`, ...) and
//! `<!-- htmlmin:ignore -->` blocks with opaque placeholder tokens before
//! the markup is parsed, and puts the original text back at the very end.
//!
//! Tokens have the shape `{uid}{index}{uid}`. The uid starts with 'x', ends
//! with 'z' and contains no other 'x', so it cannot overlap itself, and it is
//! chosen to be absent from the input: every occurrence of the uid in the
//! output therefore belongs to a token.
//!
//! Scanning is a single left-to-right pass. Each pattern keeps a cached next
//! opening position, and a pattern whose closing delimiter is missing is
//! retired for the rest of the input, so no region is searched twice.

use memchr::memmem;

use crate::core::scanner::is_html_space;
use crate::options::FragmentPattern;

/// One protected region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Text to put back
    pub original: String,
    /// Whitespace next to the fragment is collapsed but never trimmed away
    pub trim_exempt: bool,
    /// Came from an ignore-marker block rather than a custom pattern
    pub ignored_block: bool,
}

/// Placeholder token -> original text
#[derive(Debug, Clone, Default)]
pub struct RestorationMap {
    uid: String,
    fragments: Vec<Fragment>,
}

/// A token found in some text: byte range and fragment index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMatch {
    pub start: usize,
    pub end: usize,
    pub index: usize,
}

impl RestorationMap {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    #[inline]
    pub fn fragment(&self, index: usize) -> Option<&Fragment> {
        self.fragments.get(index)
    }

    /// Placeholder token for a fragment index
    pub fn token(&self, index: usize) -> String {
        format!("{}{}{}", self.uid, index, self.uid)
    }

    fn push(&mut self, fragment: Fragment) -> String {
        self.fragments.push(fragment);
        self.token(self.fragments.len() - 1)
    }

    /// Fragment index when `text` is exactly one token
    pub fn lookup(&self, text: &str) -> Option<usize> {
        match self.find_tokens(text).as_slice() {
            [m] if m.start == 0 && m.end == text.len() => Some(m.index),
            _ => None,
        }
    }

    /// Check if some text holds at least one token
    pub fn contains_token(&self, text: &str) -> bool {
        !self.is_empty() && memmem::find(text.as_bytes(), self.uid.as_bytes()).is_some()
    }

    /// All tokens in `text`, in order
    pub fn find_tokens(&self, text: &str) -> Vec<TokenMatch> {
        let mut found = Vec::new();
        if self.is_empty() {
            return found;
        }
        let bytes = text.as_bytes();
        let uid = self.uid.as_bytes();
        let finder = memmem::Finder::new(uid);
        let mut pos = 0;

        while let Some(i) = finder.find(&bytes[pos..]) {
            let start = pos + i;
            let digits_start = start + uid.len();
            let mut digits_end = digits_start;
            while digits_end < bytes.len() && bytes[digits_end].is_ascii_digit() {
                digits_end += 1;
            }
            let end = digits_end + uid.len();
            if digits_end > digits_start && end <= bytes.len() && &bytes[digits_end..end] == uid {
                if let Ok(index) = text[digits_start..digits_end].parse::<usize>() {
                    if index < self.fragments.len() {
                        found.push(TokenMatch { start, end, index });
                        pos = end;
                        continue;
                    }
                }
            }
            pos = digits_start;
        }
        found
    }
}

/// Pick a uid absent from the input, retrying on collision
fn choose_uid(text: &str) -> String {
    let mut attempt = 0u32;
    loop {
        let uid = format!("xhmfrag{}z", attempt);
        if memmem::find(text.as_bytes(), uid.as_bytes()).is_none() {
            return uid;
        }
        attempt += 1;
    }
}

/// Match `<!--\s*marker\s*-->` at `pos`, returning the end of the comment
fn marker_comment_at(bytes: &[u8], pos: usize, marker: &[u8]) -> Option<usize> {
    let mut i = pos + 4;
    while i < bytes.len() && is_html_space(bytes[i]) {
        i += 1;
    }
    if !bytes[i..].starts_with(marker) {
        return None;
    }
    i += marker.len();
    while i < bytes.len() && is_html_space(bytes[i]) {
        i += 1;
    }
    if bytes[i..].starts_with(b"-->") {
        Some(i + 3)
    } else {
        None
    }
}

/// Next ignore-marker comment at or after `from`: (start, end)
fn next_marker(bytes: &[u8], from: usize, marker: &[u8]) -> Option<(usize, usize)> {
    let finder = memmem::Finder::new(b"<!--");
    let mut pos = from;
    while let Some(i) = finder.find(&bytes[pos..]) {
        let start = pos + i;
        if let Some(end) = marker_comment_at(bytes, start, marker) {
            return Some((start, end));
        }
        pos = start + 4;
    }
    None
}

/// Replace protected regions with placeholder tokens
///
/// Returns the guarded text and the map needed to undo the substitution.
pub fn guard(
    text: &str,
    patterns: &[FragmentPattern],
    ignore_marker: &str,
    trim_custom_fragments: bool,
) -> (String, RestorationMap) {
    let bytes = text.as_bytes();
    let marker = ignore_marker.as_bytes();
    let mut map = RestorationMap {
        uid: choose_uid(text),
        fragments: Vec::new(),
    };
    let mut out = String::with_capacity(text.len());

    // Cached next opening per pattern; None once a pattern is retired
    let mut next_open: Vec<Option<usize>> = patterns
        .iter()
        .map(|p| memmem::find(bytes, p.open.as_bytes()))
        .collect();
    let mut next_ignore = next_marker(bytes, 0, marker);
    let mut pos = 0;

    loop {
        // Refresh stale cache entries that fell behind the cursor
        for (k, pattern) in patterns.iter().enumerate() {
            if let Some(at) = next_open[k] {
                if at < pos {
                    next_open[k] = memmem::find(&bytes[pos..], pattern.open.as_bytes()).map(|i| pos + i);
                }
            }
        }
        if let Some((at, _)) = next_ignore {
            if at < pos {
                next_ignore = next_marker(bytes, pos, marker);
            }
        }

        let earliest_pattern = next_open
            .iter()
            .enumerate()
            .filter_map(|(k, at)| at.map(|at| (at, k)))
            .min();

        let ignore_first = match (next_ignore, earliest_pattern) {
            (Some((at, _)), Some((open_at, _))) => at <= open_at,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };

        if ignore_first {
            let Some((open_start, open_end)) = next_ignore else { break };
            // Ignore block: content between two marker comments
            match next_marker(bytes, open_end, marker) {
                Some((close_start, close_end)) => {
                    out.push_str(&text[pos..open_start]);
                    let token = map.push(Fragment {
                        original: text[open_end..close_start].to_string(),
                        trim_exempt: true,
                        ignored_block: true,
                    });
                    out.push_str("<!--");
                    out.push_str(&token);
                    out.push_str("-->");
                    pos = close_end;
                    next_ignore = next_marker(bytes, pos, marker);
                }
                // Unpaired marker stays an ordinary comment
                None => next_ignore = None,
            }
        } else if let Some((open_at, k)) = earliest_pattern {
            let pattern = &patterns[k];
            let body_from = open_at + pattern.open.len();
            match memmem::find(&bytes[body_from..], pattern.close.as_bytes()) {
                Some(i) => {
                    let end = body_from + i + pattern.close.len();
                    out.push_str(&text[pos..open_at]);
                    let token = map.push(Fragment {
                        original: text[open_at..end].to_string(),
                        trim_exempt: !trim_custom_fragments,
                        ignored_block: false,
                    });
                    out.push_str(&token);
                    pos = end;
                }
                // No close anywhere after: this pattern cannot match again
                None => next_open[k] = None,
            }
        }
    }

    out.push_str(&text[pos..]);
    log::debug!("guarded {} fragment(s)", map.len());
    (out, map)
}

/// Put original text back in place of every token
///
/// Tokens of ignored blocks may still be wrapped in the `<!--` `-->` the
/// guard wrote (when they sat inside raw text); the wrapper goes too.
pub fn restore(output: &str, map: &RestorationMap) -> String {
    if map.is_empty() {
        return output.to_string();
    }
    let mut out = String::with_capacity(output.len());
    let mut last = 0;
    for m in map.find_tokens(output) {
        let fragment = &map.fragments[m.index];
        let (mut start, mut end) = (m.start, m.end);
        if fragment.ignored_block
            && output[..start].ends_with("<!--")
            && output[end..].starts_with("-->")
            && start - 4 >= last
        {
            start -= 4;
            end += 3;
        }
        out.push_str(&output[last..start]);
        out.push_str(&fragment.original);
        last = end;
    }
    out.push_str(&output[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jinja() -> Vec<FragmentPattern> {
        vec![FragmentPattern::new("{%", "%}"), FragmentPattern::new("{{", "}}")]
    }

    #[test]
    fn test_round_trip() {
        let src = "<img class=\"{% foo %} {% bar %}\"><p>{{ name }}</p>";
        let (guarded, map) = guard(src, &jinja(), "htmlmin:ignore", false);
        assert_eq!(map.len(), 3);
        assert!(!guarded.contains("{%"));
        assert_eq!(restore(&guarded, &map), src);
    }

    #[test]
    fn test_uid_avoids_collision() {
        let src = "xhmfrag0z {{ a }}";
        let (guarded, map) = guard(src, &jinja(), "htmlmin:ignore", false);
        assert!(guarded.contains("xhmfrag1z0xhmfrag1z"));
        assert_eq!(restore(&guarded, &map), src);
    }

    #[test]
    fn test_ignore_block() {
        let src = "<p>a</p><!-- htmlmin:ignore --><div>  keep  </div><!-- htmlmin:ignore --><p>b</p>";
        let (guarded, map) = guard(src, &[], "htmlmin:ignore", false);
        assert_eq!(map.len(), 1);
        assert!(guarded.starts_with("<p>a</p><!--xhmfrag0z0xhmfrag0z--><p>"));
        let fragment = map.fragment(0).unwrap();
        assert_eq!(fragment.original, "<div>  keep  </div>");
        assert!(fragment.ignored_block);
        // Markers themselves are dropped on restore
        assert_eq!(restore(&guarded, &map), "<p>a</p><div>  keep  </div><p>b</p>");
    }

    #[test]
    fn test_unpaired_marker_is_plain_comment() {
        let src = "<!-- htmlmin:ignore --><p>x</p>";
        let (guarded, map) = guard(src, &[], "htmlmin:ignore", false);
        assert!(map.is_empty());
        assert_eq!(guarded, src);
    }

    #[test]
    fn test_unclosed_pattern_left_alone() {
        let src = "{% open and {{ x }}";
        let (guarded, map) = guard(src, &jinja(), "htmlmin:ignore", false);
        assert_eq!(map.len(), 1);
        assert!(guarded.starts_with("{% open and "));
    }

    #[test]
    fn test_trim_flag() {
        let (_, map) = guard("{{ a }}", &jinja(), "htmlmin:ignore", true);
        assert!(!map.fragment(0).unwrap().trim_exempt);
    }

    #[test]
    fn test_long_whitespace_runs_are_linear() {
        let src = format!("<!--{}x{}", " ".repeat(10_000), "{% ".repeat(2_000));
        let (guarded, map) = guard(&src, &jinja(), "htmlmin:ignore", false);
        assert!(map.is_empty());
        assert_eq!(guarded, src);
    }

    #[test]
    fn test_lookup_and_find() {
        let (guarded, map) = guard("a {{ b }} c {{ d }}", &jinja(), "htmlmin:ignore", false);
        let found = map.find_tokens(&guarded);
        assert_eq!(found.len(), 2);
        assert_eq!(found[1].index, 1);
        assert_eq!(map.lookup(&map.token(1)), Some(1));
        assert_eq!(map.lookup("a"), None);
    }
}
