//! URL shortening against a site base URL
//!
//! Produces the shortest of:
//! - a path relative to the base document's directory (`../img/a.png`)
//! - a root-relative path (`/img/a.png`)
//! - a scheme-relative URL (`//cdn.example.com/a.js`) for other hosts on the same scheme
//! - the absolute URL
//!
//! `data:`, `javascript:` and `mailto:` targets are never touched.

use url::{Position, Url};

use crate::dispatch::{Minify, MinifyContext};
use crate::error::ConfigError;

const OPAQUE_SCHEMES: [&str; 3] = ["data:", "javascript:", "mailto:"];
const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

/// URL minifier bound to the site URL of the document being minified
#[derive(Debug, Clone)]
pub struct UrlShortener {
    base: Url,
}

impl UrlShortener {
    pub fn new(site: &str) -> Result<Self, ConfigError> {
        let base = Url::parse(site).map_err(|e| ConfigError::new("minify_urls", format!("invalid site URL {:?}: {}", site, e)))?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::new("minify_urls", format!("{:?} cannot be used as a base URL", site)));
        }
        Ok(UrlShortener { base })
    }

    /// Shortest equivalent of `raw`, or `raw` itself when it cannot be shortened
    pub fn shorten(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || is_opaque(trimmed) {
            return raw.to_string();
        }
        let Ok(mut target) = self.base.join(trimmed) else {
            return raw.to_string();
        };
        if target.cannot_be_a_base() {
            return raw.to_string();
        }
        strip_index_file(&mut target);

        if target.scheme() != self.base.scheme() {
            return target.to_string();
        }
        if target.host_str() != self.base.host_str()
            || target.port_or_known_default() != self.base.port_or_known_default()
            || target.username() != self.base.username()
        {
            return format!("//{}", &target[Position::BeforeUsername..]);
        }

        let absolute = target.to_string();
        let root_relative = target[Position::BeforePath..].to_string();
        let relative = self.relative_to_base(&target);

        [relative, root_relative, absolute]
            .into_iter()
            .min_by_key(String::len)
            .unwrap_or_else(|| raw.to_string())
    }

    /// Path of `target` relative to the base document's directory
    fn relative_to_base(&self, target: &Url) -> String {
        let base_dirs = directory_segments(&self.base);
        let target_segments: Vec<&str> = target.path_segments().map(Iterator::collect).unwrap_or_default();
        let (file, target_dirs) = match target_segments.split_last() {
            Some((file, dirs)) => (*file, dirs),
            None => ("", &[][..]),
        };

        let common = base_dirs
            .iter()
            .zip(target_dirs)
            .take_while(|(a, b)| a == b)
            .count();

        let mut path = "../".repeat(base_dirs.len() - common);
        for dir in &target_dirs[common..] {
            path.push_str(dir);
            path.push('/');
        }
        path.push_str(file);

        if path.is_empty() {
            path.push_str("./");
        } else if path.split('/').next().is_some_and(|first| first.contains(':')) {
            // a leading `a:b` segment would read as a scheme
            path.insert_str(0, "./");
        }
        path.push_str(&target[Position::AfterPath..]);
        path
    }
}

impl Minify for UrlShortener {
    fn minify(&self, content: &str, _context: &MinifyContext<'_>) -> Result<String, String> {
        Ok(self.shorten(content))
    }
}

fn is_opaque(url: &str) -> bool {
    OPAQUE_SCHEMES.iter().any(|scheme| {
        url.len() >= scheme.len() && url.as_bytes()[..scheme.len()].eq_ignore_ascii_case(scheme.as_bytes())
    })
}

fn strip_index_file(url: &mut Url) {
    let path = url.path();
    let Some(file) = path.rsplit('/').next() else {
        return;
    };
    if INDEX_FILES.iter().any(|index| file.eq_ignore_ascii_case(index)) {
        let dir = path[..path.len() - file.len()].to_string();
        url.set_path(&dir);
    }
}

fn directory_segments(url: &Url) -> Vec<&str> {
    let mut segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
    segments.pop();
    segments
}
