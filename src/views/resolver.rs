//! View file resolution.
//!
//! # Responsibilities
//! - Turn a logical view name into candidate files (directories × extensions)
//! - Probe candidates in directory priority order
//! - Cache results per controller, misses included when not raising
//!
//! # Design Decisions
//! - The cache is keyed by view name (plus the extension override, if any)
//! - A cached entry is returned as the same `Arc` on every hit
//! - Probing uses async filesystem metadata; one probe per candidate at most

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use crate::observability::metrics;

/// Errors raised by view lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    /// No candidate exists on disk.
    #[error("view `{view}` not found, tried: {}", display_candidates(.candidates))]
    NotFound { view: String, candidates: Vec<PathBuf> },

    /// No view name given and the current action has no default view.
    #[error("no view name given and no default view for the current action")]
    NoDefaultView,
}

fn display_candidates(candidates: &[PathBuf]) -> String {
    candidates
        .iter()
        .map(|c| c.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of a view lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewLookup {
    /// First candidate that exists, if any.
    pub file: Option<PathBuf>,
    /// Every candidate considered, in probe order.
    pub candidates: Vec<PathBuf>,
}

/// Per-controller view lookup cache. Grows until the registry is rebuilt.
#[derive(Debug, Default)]
pub struct ViewCache {
    entries: DashMap<String, Arc<ViewLookup>>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<ViewLookup>> {
        self.entries.get(key).map(|r| r.value().clone())
    }

    /// Insert unless present; returns the entry that ends up cached.
    fn insert(&self, key: String, lookup: Arc<ViewLookup>) -> Arc<ViewLookup> {
        self.entries.entry(key).or_insert(lookup).value().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a lookup runs against: a controller's search path and cache, plus the
/// default view of the action being executed.
#[derive(Debug, Clone, Copy)]
pub struct ViewScope<'a> {
    pub search_path: &'a [PathBuf],
    pub cache: &'a ViewCache,
    pub default_view: Option<&'a str>,
}

/// Locates view files along a search path.
#[derive(Debug, Clone)]
pub struct ViewResolver {
    extensions: Vec<String>,
}

impl ViewResolver {
    /// Create a resolver allowing `extensions` (with leading dots), in order.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Find the file for `view_name`, or the scope's default view when `None`.
    ///
    /// With `throw_if_missing` a miss fails with `ViewError::NotFound`;
    /// otherwise the miss is cached and returned with `file: None`.
    pub async fn locate(
        &self,
        scope: ViewScope<'_>,
        view_name: Option<&str>,
        extension_override: Option<&str>,
        throw_if_missing: bool,
    ) -> Result<Arc<ViewLookup>, ViewError> {
        let view = match view_name.or(scope.default_view) {
            Some(view) => view,
            None => return Err(ViewError::NoDefaultView),
        };
        let key = match extension_override {
            Some(ext) => format!("{view}|{ext}"),
            None => view.to_string(),
        };

        if let Some(cached) = scope.cache.get(&key) {
            metrics::record_view_lookup(true);
            return finish(view, cached, throw_if_missing);
        }
        metrics::record_view_lookup(false);

        let candidates = self.candidates(scope.search_path, view, extension_override);
        let mut file = None;
        for candidate in &candidates {
            if is_file(candidate).await {
                file = Some(candidate.clone());
                break;
            }
        }

        let lookup = Arc::new(ViewLookup { file, candidates });
        if lookup.file.is_none() && throw_if_missing {
            tracing::debug!(view = %view, candidates = lookup.candidates.len(), "View not found");
            return finish(view, lookup, true);
        }

        tracing::debug!(view = %view, file = ?lookup.file, "View resolved");
        let cached = scope.cache.insert(key, lookup);
        finish(view, cached, throw_if_missing)
    }

    /// Candidate files, directory-major, in priority order.
    pub fn candidates(
        &self,
        search_path: &[PathBuf],
        view: &str,
        extension_override: Option<&str>,
    ) -> Vec<PathBuf> {
        let extensions: Vec<&str> = match extension_override {
            Some(ext) => vec![ext],
            None => self.extensions.iter().map(String::as_str).collect(),
        };
        search_path
            .iter()
            .flat_map(|dir| {
                extensions
                    .iter()
                    .map(move |ext| dir.join(format!("{view}{}", normalize_extension(ext))))
            })
            .collect()
    }
}

fn finish(
    view: &str,
    lookup: Arc<ViewLookup>,
    throw_if_missing: bool,
) -> Result<Arc<ViewLookup>, ViewError> {
    if lookup.file.is_none() && throw_if_missing {
        return Err(ViewError::NotFound {
            view: view.to_string(),
            candidates: lookup.candidates.clone(),
        });
    }
    Ok(lookup)
}

fn normalize_extension(ext: &str) -> String {
    if ext.is_empty() || ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Fixture {
        _root: tempfile::TempDir,
        a: PathBuf,
        b: PathBuf,
        cache: ViewCache,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let a = root.path().join("A");
            let b = root.path().join("B");
            fs::create_dir_all(&a).unwrap();
            fs::create_dir_all(&b).unwrap();
            Self {
                _root: root,
                a,
                b,
                cache: ViewCache::new(),
            }
        }

        fn search_path(&self) -> Vec<PathBuf> {
            vec![self.a.clone(), self.b.clone()]
        }
    }

    #[tokio::test]
    async fn test_candidates_follow_directory_priority() {
        let fx = Fixture::new();
        let resolver = ViewResolver::new([".html"]);
        let search_path = fx.search_path();
        let scope = ViewScope {
            search_path: &search_path,
            cache: &fx.cache,
            default_view: None,
        };

        let err = resolver.locate(scope, Some("index"), None, true).await.unwrap_err();
        assert_eq!(
            err,
            ViewError::NotFound {
                view: "index".to_string(),
                candidates: vec![fx.a.join("index.html"), fx.b.join("index.html")],
            }
        );
        assert!(fx.cache.is_empty());
    }

    #[tokio::test]
    async fn test_first_directory_wins() {
        let fx = Fixture::new();
        fs::write(fx.a.join("index.html"), "a").unwrap();
        fs::write(fx.b.join("index.html"), "b").unwrap();
        let resolver = ViewResolver::new([".html"]);
        let search_path = fx.search_path();
        let scope = ViewScope {
            search_path: &search_path,
            cache: &fx.cache,
            default_view: None,
        };

        let lookup = resolver.locate(scope, Some("index"), None, true).await.unwrap();
        assert_eq!(lookup.file, Some(fx.a.join("index.html")));
    }

    #[tokio::test]
    async fn test_extensions_are_tried_per_directory() {
        let fx = Fixture::new();
        fs::write(fx.a.join("show.tpl"), "a").unwrap();
        fs::write(fx.b.join("show.html"), "b").unwrap();
        let resolver = ViewResolver::new([".html", ".tpl"]);
        let search_path = fx.search_path();
        let scope = ViewScope {
            search_path: &search_path,
            cache: &fx.cache,
            default_view: None,
        };

        let lookup = resolver.locate(scope, Some("show"), None, true).await.unwrap();
        assert_eq!(lookup.file, Some(fx.a.join("show.tpl")));
        assert_eq!(lookup.candidates.len(), 2);
    }

    #[tokio::test]
    async fn test_extension_override() {
        let fx = Fixture::new();
        fs::write(fx.b.join("feed.xml"), "<rss/>").unwrap();
        let resolver = ViewResolver::new([".html"]);
        let search_path = fx.search_path();
        let scope = ViewScope {
            search_path: &search_path,
            cache: &fx.cache,
            default_view: None,
        };

        let lookup = resolver.locate(scope, Some("feed"), Some("xml"), true).await.unwrap();
        assert_eq!(lookup.file, Some(fx.b.join("feed.xml")));
        assert_eq!(lookup.candidates, vec![fx.a.join("feed.xml"), fx.b.join("feed.xml")]);
    }

    #[tokio::test]
    async fn test_second_lookup_hits_cache() {
        let fx = Fixture::new();
        fs::write(fx.a.join("index.html"), "a").unwrap();
        let resolver = ViewResolver::new([".html"]);
        let search_path = fx.search_path();
        let scope = ViewScope {
            search_path: &search_path,
            cache: &fx.cache,
            default_view: None,
        };

        let first = resolver.locate(scope, Some("index"), None, true).await.unwrap();
        fs::remove_file(fx.a.join("index.html")).unwrap();
        let second = resolver.locate(scope, Some("index"), None, true).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.file, Some(fx.a.join("index.html")));
        assert_eq!(fx.cache.len(), 1);
    }

    #[tokio::test]
    async fn test_negative_result_cached_when_not_throwing() {
        let fx = Fixture::new();
        let resolver = ViewResolver::new([".html"]);
        let search_path = fx.search_path();
        let scope = ViewScope {
            search_path: &search_path,
            cache: &fx.cache,
            default_view: None,
        };

        let miss = resolver.locate(scope, Some("missing"), None, false).await.unwrap();
        assert!(miss.file.is_none());
        assert_eq!(fx.cache.len(), 1);

        // Created after the miss was cached: still reported missing.
        fs::write(fx.a.join("missing.html"), "late").unwrap();
        let again = resolver.locate(scope, Some("missing"), None, false).await.unwrap();
        assert!(Arc::ptr_eq(&miss, &again));

        let err = resolver.locate(scope, Some("missing"), None, true).await.unwrap_err();
        assert!(matches!(err, ViewError::NotFound { ref candidates, .. } if candidates.len() == 2));
    }

    #[tokio::test]
    async fn test_default_view_from_scope() {
        let fx = Fixture::new();
        fs::write(fx.b.join("profile.html"), "b").unwrap();
        let resolver = ViewResolver::new([".html"]);
        let search_path = fx.search_path();

        let scope = ViewScope {
            search_path: &search_path,
            cache: &fx.cache,
            default_view: Some("profile"),
        };
        let lookup = resolver.locate(scope, None, None, true).await.unwrap();
        assert_eq!(lookup.file, Some(fx.b.join("profile.html")));

        let no_default = ViewScope {
            default_view: None,
            ..scope
        };
        assert_eq!(
            resolver.locate(no_default, None, None, true).await.unwrap_err(),
            ViewError::NoDefaultView
        );
    }
}
