//! Preview session for mdstyler.
//!
//! Ties the pipeline, diagrams, style synthesis and export together the
//! way an editor preview uses them:
//!
//! - every source change is rendered under a new generation, and a render
//!   that finishes after a newer one started is discarded
//! - the style sheet is recomputed whenever the theme configuration or the
//!   user overrides change
//! - print and export both use that same style sheet
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use mdstyler_preview::{PipelineRenderer, PreviewSession, RenderOutcome};
//! use mdstyler_theme::ThemeConfig;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let session = PreviewSession::new(Arc::new(PipelineRenderer::default()), None, ThemeConfig::default());
//! let outcome = session.render("> [!NOTE]\n> Remember this").await.unwrap();
//! assert!(matches!(outcome, RenderOutcome::Committed { .. }));
//! assert!(session.print_document().unwrap().contains("callout-note"));
//! # }
//! ```

mod error;
mod generation;
mod print;
mod renderer;
mod session;

pub use error::PreviewError;
pub use generation::GenerationCounter;
pub use print::{DEFAULT_TITLE, print_document};
pub use renderer::{DocumentRenderer, PipelineRenderer};
pub use session::{PreviewEvent, PreviewSession, RenderOutcome};
