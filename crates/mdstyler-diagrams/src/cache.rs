//! Content-addressed diagram cache.
//!
//! [`CachedEngine`] wraps any [`DiagramEngine`] and remembers successful
//! compilations keyed by [`DiagramKey`]. Failures are never cached, so a
//! diagram that failed because the server was unreachable is retried on the
//! next render.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use futures::FutureExt;
use futures::future::BoxFuture;
use sha2::{Digest, Sha256};

use crate::engine::{DiagramEngine, DiagramError, DiagramRequest};
use crate::language::DiagramLanguage;

/// Parameters that affect compiled diagram output.
#[derive(Debug)]
pub struct DiagramKey<'a> {
    /// Engine name (e.g., "kroki").
    pub engine: &'a str,
    pub language: DiagramLanguage,
    pub source: &'a str,
}

impl DiagramKey<'_> {
    /// SHA-256 of `"{engine}:{language}:{source}"`, hex encoded.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let content = format!("{}:{}:{}", self.engine, self.language.name(), self.source);
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// In-memory cache in front of another engine.
pub struct CachedEngine<E> {
    inner: E,
    entries: RwLock<HashMap<String, String>>,
}

impl<E: DiagramEngine> CachedEngine<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Number of cached diagrams.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key(&self, request: &DiagramRequest) -> String {
        DiagramKey {
            engine: self.inner.name(),
            language: request.language,
            source: &request.source,
        }
        .compute_hash()
    }
}

impl<E: DiagramEngine> DiagramEngine for CachedEngine<E> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn compile<'a>(&'a self, request: &'a DiagramRequest) -> BoxFuture<'a, Result<String, DiagramError>> {
        async move {
            let key = self.key(request);
            let cached = self
                .entries
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&key)
                .cloned();
            if let Some(svg) = cached {
                tracing::debug!(index = request.index, language = request.language.name(), "Diagram cache hit");
                return Ok(svg);
            }

            let svg = self.inner.compile(request).await?;
            self.entries
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, svg.clone());
            Ok(svg)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::engine::DiagramErrorKind;

    struct CountingEngine {
        calls: AtomicUsize,
    }

    impl DiagramEngine for CountingEngine {
        fn name(&self) -> &str {
            "counting"
        }

        fn compile<'a>(&'a self, request: &'a DiagramRequest) -> BoxFuture<'a, Result<String, DiagramError>> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if request.source.contains("bad") {
                    Err(DiagramError::new(request.index, DiagramErrorKind::Engine("syntax error".into())))
                } else {
                    Ok(format!("<svg>{}</svg>", request.source))
                }
            }
            .boxed()
        }
    }

    fn cached() -> CachedEngine<CountingEngine> {
        CachedEngine::new(CountingEngine {
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_key_hash() {
        let key = |engine, language, source| DiagramKey { engine, language, source }.compute_hash();

        let a = key("kroki", DiagramLanguage::Mermaid, "graph TD");
        assert_eq!(a, key("kroki", DiagramLanguage::Mermaid, "graph TD"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, key("kroki", DiagramLanguage::Mermaid, "graph LR"));
        assert_ne!(a, key("kroki", DiagramLanguage::D2, "graph TD"));
        assert_ne!(a, key("other", DiagramLanguage::Mermaid, "graph TD"));
    }

    #[tokio::test]
    async fn test_successes_are_cached() {
        let engine = cached();
        let request = DiagramRequest::new(0, DiagramLanguage::Mermaid, "a");

        let first = engine.compile(&request).await.unwrap();
        let second = engine.compile(&DiagramRequest { index: 5, ..request }).await.unwrap();

        assert_eq!(first, "<svg>a</svg>");
        assert_eq!(second, first);
        assert_eq!(engine.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.len(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let engine = cached();
        let request = DiagramRequest::new(0, DiagramLanguage::Mermaid, "bad");

        assert!(engine.compile(&request).await.is_err());
        assert!(engine.compile(&request).await.is_err());

        assert_eq!(engine.inner().calls.load(Ordering::SeqCst), 2);
        assert!(engine.is_empty());
    }
}
