//! Diagram rendering for mdstyler.
//!
//! Fenced code blocks tagged with a diagram language (`mermaid`,
//! `plantuml`, `kroki-d2`, ...) are compiled to SVG by a
//! [`DiagramEngine`] and replaced on the rendered surface. The bundled
//! [`KrokiEngine`] talks to a [Kroki](https://kroki.io) server;
//! [`CachedEngine`] adds a content-addressed cache in front of any engine.
//!
//! # Example
//!
//! ```no_run
//! use mdstyler_diagrams::{CachedEngine, KrokiEngine, DEFAULT_TIMEOUT, process_diagrams};
//! use mdstyler_renderer::Pipeline;
//! use mdstyler_surface::Surface;
//!
//! # async fn run() {
//! let engine = CachedEngine::new(KrokiEngine::new("https://kroki.io", DEFAULT_TIMEOUT));
//! let result = Pipeline::default().render("```mermaid\ngraph TD; A-->B\n```");
//!
//! let mut surface = Surface::preview();
//! let content = surface.preview_content().unwrap();
//! surface.set_children_markup(content, &result.nodes).unwrap();
//!
//! let report = process_diagrams(&mut surface, content, &engine, 1).await;
//! assert!(report.errors.is_empty());
//! # }
//! ```

mod cache;
mod engine;
mod kroki;
mod language;
mod processor;

pub use cache::{CachedEngine, DiagramKey};
pub use engine::{DiagramEngine, DiagramError, DiagramErrorKind, DiagramRequest};
pub use kroki::{DEFAULT_TIMEOUT, KrokiEngine, create_agent};
pub use language::{DEFAULT_LANGUAGE, DiagramLanguage};
pub use processor::{
    DIAGRAM_CLASS, DIAGRAM_ERROR_CLASS, DiagramBlock, DiagramReport, find_diagram_blocks,
    process_diagrams,
};
