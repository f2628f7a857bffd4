//! Markdown to styled markup transform pipeline.
//!
//! Source text is parsed with pulldown-cmark into a [`SyntaxNode`] tree,
//! rewritten by syntax passes (callouts), lowered into a [`MarkupNode`]
//! tree, rewritten by markup passes (raw markup re-parsing, math, syntax
//! highlighting) and serialized to HTML.
//!
//! Rendering is total: every input produces output, and regions that
//! cannot be interpreted pass through as text.
//!
//! # Example
//!
//! ```
//! use mdstyler_renderer::Pipeline;
//!
//! let result = Pipeline::default().render("# Hello\n\n> [!NOTE]\n> Styled output");
//! assert_eq!(result.title.as_deref(), Some("Hello"));
//! assert!(result.html.contains("callout-note"));
//! ```

mod callout;
mod highlight;
mod lower;
pub mod markup;
mod math;
mod pipeline;
mod raw;
pub mod syntax;
mod toc;

pub use callout::{CALLOUT_CLASS, CalloutKind, CalloutPass, annotate_callouts, match_marker};
pub use highlight::{HIGHLIGHT_CLASS_PREFIX, HighlightPass, code_language};
pub use lower::{Lowered, lower};
pub use markup::{Element, MarkupError, MarkupNode, escape_html, parse_fragment, to_html};
pub use math::MathPass;
pub use pipeline::{
    MarkupPass, PassContext, Pipeline, RenderOptions, RenderResult, SyntaxPass,
};
pub use raw::RawMarkupPass;
pub use syntax::{NodeKind, SyntaxNode};
pub use toc::{TocEntry, slugify};
