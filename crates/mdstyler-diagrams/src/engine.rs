//! Diagram engine abstraction.

use futures::future::BoxFuture;

use crate::language::DiagramLanguage;

/// A single diagram submitted for compilation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagramRequest {
    /// Position of the block within its render pass.
    pub index: usize,
    pub language: DiagramLanguage,
    pub source: String,
}

impl DiagramRequest {
    pub fn new(index: usize, language: DiagramLanguage, source: impl Into<String>) -> Self {
        Self {
            index,
            language,
            source: source.into(),
        }
    }
}

/// Single diagram compilation error.
#[derive(Debug, thiserror::Error)]
#[error("diagram {index}: {kind}")]
pub struct DiagramError {
    pub index: usize,
    pub kind: DiagramErrorKind,
}

impl DiagramError {
    pub fn new(index: usize, kind: DiagramErrorKind) -> Self {
        Self { index, kind }
    }
}

/// Kind of diagram compilation error.
#[derive(Debug, thiserror::Error)]
pub enum DiagramErrorKind {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid UTF-8 in diagram output")]
    InvalidUtf8,

    #[error("{0}")]
    Engine(String),
}

/// Compiles diagram source into SVG markup.
///
/// Implementations must be shareable across tasks: one engine serves every
/// block of a render pass, and compilations of different blocks may be in
/// flight at the same time.
pub trait DiagramEngine: Send + Sync {
    /// Short engine name, part of the cache key.
    fn name(&self) -> &str;

    /// Compile one diagram to SVG.
    fn compile<'a>(&'a self, request: &'a DiagramRequest) -> BoxFuture<'a, Result<String, DiagramError>>;
}
