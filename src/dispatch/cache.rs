//! Delegate result memoization
//!
//! Identical content of the same kind is handed to a delegate once per
//! `minify` call. The cache is bounded; an evicted entry is simply
//! minified again.

use std::num::NonZeroUsize;

use lru::LruCache;

use super::ContentKind;

/// Entries kept per document
pub const CACHE_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(255);

/// LRU cache of `(kind, content) -> minified`
pub struct ResultCache {
    inner: LruCache<(ContentKind, String), String>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CACHE_CAPACITY)
    }
}

impl ResultCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        ResultCache {
            inner: LruCache::new(capacity),
        }
    }

    /// Cached result, marking the entry as recently used
    pub fn get(&mut self, kind: ContentKind, content: &str) -> Option<String> {
        self.inner.get(&(kind, content.to_string())).cloned()
    }

    pub fn put(&mut self, kind: ContentKind, content: String, minified: String) {
        self.inner.put((kind, content), minified);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss() {
        let mut cache = ResultCache::default();
        cache.put(ContentKind::Style, "a { }".into(), "a{}".into());
        assert_eq!(cache.get(ContentKind::Style, "a { }").as_deref(), Some("a{}"));
        assert_eq!(cache.get(ContentKind::InlineStyle, "a { }"), None);
    }

    #[test]
    fn test_eviction() {
        let mut cache = ResultCache::new(NonZeroUsize::MIN.saturating_add(1));
        cache.put(ContentKind::Url, "a".into(), "1".into());
        cache.put(ContentKind::Url, "b".into(), "2".into());
        cache.get(ContentKind::Url, "a");
        cache.put(ContentKind::Url, "c".into(), "3".into());
        assert_eq!(cache.len(), 2);
        assert!(cache.get(ContentKind::Url, "b").is_none());
        assert!(cache.get(ContentKind::Url, "a").is_some());
    }
}
