//! The transform pipeline.
//!
//! Stages run in a fixed order:
//!
//! 1. parse source text into a [`SyntaxNode`] tree
//! 2. syntax passes ([`CalloutPass`])
//! 3. lower into [`MarkupNode`]s
//! 4. [`RawMarkupPass`] (only when raw markup is allowed)
//! 5. [`MathPass`]
//! 6. [`HighlightPass`]
//! 7. serialize to HTML
//!
//! Additional passes registered with [`Pipeline::with_syntax_pass`] and
//! [`Pipeline::with_markup_pass`] run after the built-in passes of the
//! same kind.

use crate::callout::CalloutPass;
use crate::highlight::HighlightPass;
use crate::lower::lower;
use crate::markup::{MarkupNode, to_html};
use crate::math::MathPass;
use crate::raw::RawMarkupPass;
use crate::syntax::{SyntaxNode, parse};
use crate::toc::TocEntry;

/// A tree rewrite over the syntax tree.
pub trait SyntaxPass: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, root: &mut SyntaxNode);
}

/// A tree rewrite over the markup tree.
pub trait MarkupPass: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, nodes: &mut Vec<MarkupNode>, context: &mut PassContext);
}

/// Per-render state shared by markup passes.
#[derive(Debug, Default)]
pub struct PassContext {
    /// Non-fatal problems found while rendering.
    pub warnings: Vec<String>,
}

impl PassContext {
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Options for [`Pipeline`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOptions {
    /// Pass raw markup in the source through unescaped.
    ///
    /// The source is treated as trusted local input. Turn this off to escape
    /// raw markup instead.
    pub allow_raw_html: bool,
    /// Convert `$...$` and `$$...$$` to MathML.
    pub math: bool,
    /// Syntax-highlight code blocks.
    pub highlight: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            allow_raw_html: true,
            math: true,
            highlight: true,
        }
    }
}

/// Result of rendering a document.
#[derive(Clone, Debug)]
pub struct RenderResult {
    /// Serialized styled markup.
    pub html: String,
    /// The markup tree `html` was serialized from.
    pub nodes: Vec<MarkupNode>,
    /// Text of the first H1, if any.
    pub title: Option<String>,
    pub toc: Vec<TocEntry>,
    pub warnings: Vec<String>,
}

/// Ordered markdown-to-markup transform.
///
/// # Example
///
/// ```
/// use mdstyler_renderer::{Pipeline, RenderOptions};
///
/// let pipeline = Pipeline::new(RenderOptions::default());
/// let result = pipeline.render("> [!TIP]\n> Use the pipeline");
/// assert!(result.html.contains(r#"data-callout="tip""#));
/// ```
pub struct Pipeline {
    options: RenderOptions,
    syntax_passes: Vec<Box<dyn SyntaxPass>>,
    markup_passes: Vec<Box<dyn MarkupPass>>,
}

impl Pipeline {
    /// Create a pipeline with the built-in passes enabled by `options`.
    pub fn new(options: RenderOptions) -> Self {
        let syntax_passes: Vec<Box<dyn SyntaxPass>> = vec![Box::new(CalloutPass)];

        let mut markup_passes: Vec<Box<dyn MarkupPass>> = Vec::new();
        if options.allow_raw_html {
            markup_passes.push(Box::new(RawMarkupPass));
        }
        if options.math {
            markup_passes.push(Box::new(MathPass));
        }
        if options.highlight {
            markup_passes.push(Box::new(HighlightPass));
        }

        Self {
            options,
            syntax_passes,
            markup_passes,
        }
    }

    /// Append a syntax pass after the built-in ones.
    #[must_use]
    pub fn with_syntax_pass(mut self, pass: impl SyntaxPass + 'static) -> Self {
        self.syntax_passes.push(Box::new(pass));
        self
    }

    /// Append a markup pass after the built-in ones.
    #[must_use]
    pub fn with_markup_pass(mut self, pass: impl MarkupPass + 'static) -> Self {
        self.markup_passes.push(Box::new(pass));
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Names of the tree passes in execution order.
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.syntax_passes
            .iter()
            .map(|pass| pass.name())
            .chain(std::iter::once("lower"))
            .chain(self.markup_passes.iter().map(|pass| pass.name()))
            .collect()
    }

    /// Render source text. Never fails: malformed input degrades to text.
    pub fn render(&self, source: &str) -> RenderResult {
        let mut root = parse(source);
        for pass in &self.syntax_passes {
            pass.run(&mut root);
        }

        let lowered = lower(&root, self.options.allow_raw_html);
        drop(root);

        let mut nodes = lowered.nodes;
        let mut context = PassContext::default();
        for pass in &self.markup_passes {
            pass.run(&mut nodes, &mut context);
        }

        let html = to_html(&nodes);
        if !context.warnings.is_empty() {
            tracing::debug!(count = context.warnings.len(), "Rendered with warnings");
        }

        RenderResult {
            html,
            nodes,
            title: lowered.title,
            toc: lowered.toc,
            warnings: context.warnings,
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("options", &self.options)
            .field("passes", &self.pass_names())
            .finish()
    }
}
