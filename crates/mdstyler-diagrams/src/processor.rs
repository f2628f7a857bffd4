//! Replacement of diagram code blocks on a rendered surface.
//!
//! Every `pre > code.language-<diagram>` block is compiled independently.
//! Each block is addressed by the [`NodeId`] of its `pre` container, so
//! completions may arrive in any order and a failure only affects its own
//! block.

use futures::future::join_all;
use mdstyler_renderer::{Element, MarkupNode, parse_fragment};
use mdstyler_surface::{NodeId, Surface};

use crate::engine::{DiagramEngine, DiagramError, DiagramErrorKind, DiagramRequest};
use crate::language::DiagramLanguage;

/// Class of the wrapper around a compiled diagram.
pub const DIAGRAM_CLASS: &str = "diagram";

/// Class of the panel shown in place of a failed diagram.
pub const DIAGRAM_ERROR_CLASS: &str = "diagram-error";

/// A diagram block found on a surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagramBlock {
    /// The `pre` container that gets replaced.
    pub container: NodeId,
    pub request: DiagramRequest,
}

/// Outcome of a diagram pass.
#[derive(Debug, Default)]
pub struct DiagramReport {
    /// Indices of blocks replaced by a compiled diagram.
    pub rendered: Vec<usize>,
    /// Blocks replaced by an error panel.
    pub errors: Vec<DiagramError>,
}

impl DiagramReport {
    pub fn is_empty(&self) -> bool {
        self.rendered.is_empty() && self.errors.is_empty()
    }
}

/// Find diagram blocks under `scope` in document order.
pub fn find_diagram_blocks(surface: &Surface, scope: NodeId) -> Vec<DiagramBlock> {
    let Ok(codes) = surface.select(scope, "pre > code") else {
        return Vec::new();
    };

    codes
        .into_iter()
        .filter_map(|code| {
            let language = surface
                .attr(code, "class")?
                .split_whitespace()
                .filter_map(|class| class.strip_prefix("language-"))
                .find_map(DiagramLanguage::parse)?;
            Some((surface.parent(code)?, language, surface.text_content(code)))
        })
        .enumerate()
        .map(|(index, (container, language, source))| DiagramBlock {
            container,
            request: DiagramRequest::new(index, language, source),
        })
        .collect()
}

/// Compile every diagram block under `scope` and replace it in place.
///
/// `generation` identifies the render pass and goes into each wrapper id
/// so diagrams of different passes never share an id.
pub async fn process_diagrams(
    surface: &mut Surface,
    scope: NodeId,
    engine: &dyn DiagramEngine,
    generation: u64,
) -> DiagramReport {
    let blocks = find_diagram_blocks(surface, scope);
    if blocks.is_empty() {
        return DiagramReport::default();
    }

    tracing::debug!(count = blocks.len(), generation, "Compiling diagrams");
    let results = join_all(blocks.iter().map(|block| engine.compile(&block.request))).await;

    let mut report = DiagramReport::default();
    for (block, result) in blocks.iter().zip(results) {
        let request = &block.request;
        let replacement = result.and_then(|svg| {
            parse_svg(&svg)
                .map(|nodes| diagram_wrapper(request, generation, nodes))
                .map_err(|message| DiagramError::new(request.index, DiagramErrorKind::Engine(message)))
        });

        let node = match replacement {
            Ok(node) => {
                report.rendered.push(request.index);
                node
            }
            Err(error) => {
                tracing::warn!(
                    index = request.index,
                    language = request.language.name(),
                    error = %error.kind,
                    "Diagram failed"
                );
                let panel = error_panel(&error);
                report.errors.push(error);
                panel
            }
        };

        if let Err(e) = surface.replace_with_markup(block.container, &[node]) {
            tracing::debug!(index = request.index, error = %e, "Diagram container no longer attached");
        }
    }
    report
}

fn parse_svg(svg: &str) -> Result<Vec<MarkupNode>, String> {
    let nodes = parse_fragment(svg).map_err(|e| format!("Invalid SVG: {e}"))?;
    let has_svg = nodes
        .iter()
        .any(|node| matches!(node, MarkupNode::Element(element) if element.is("svg")));
    if has_svg {
        Ok(nodes)
    } else {
        Err("Invalid SVG: no <svg> element".to_owned())
    }
}

fn diagram_wrapper(request: &DiagramRequest, generation: u64, svg: Vec<MarkupNode>) -> MarkupNode {
    let name = request.language.name();
    MarkupNode::Element(
        Element::new("figure")
            .with_attr("class", format!("{DIAGRAM_CLASS} {DIAGRAM_CLASS}-{name}"))
            .with_attr("id", format!("diagram-{generation}-{}", request.index))
            .with_children(svg),
    )
}

fn error_panel(error: &DiagramError) -> MarkupNode {
    MarkupNode::Element(
        Element::new("div")
            .with_attr("class", DIAGRAM_ERROR_CLASS)
            .with_text(format!("Diagram error: {}", error.kind)),
    )
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use mdstyler_renderer::Pipeline;
    use pretty_assertions::assert_eq;

    use super::*;

    /// Compiles anything except sources containing `invalid`.
    struct FakeEngine;

    impl DiagramEngine for FakeEngine {
        fn name(&self) -> &str {
            "fake"
        }

        fn compile<'a>(&'a self, request: &'a DiagramRequest) -> BoxFuture<'a, Result<String, DiagramError>> {
            async move {
                if request.source.contains("invalid") {
                    Err(DiagramError::new(
                        request.index,
                        DiagramErrorKind::Http {
                            status: 400,
                            body: "Syntax error in graph".into(),
                        },
                    ))
                } else {
                    Ok(format!(
                        r#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg"><text>{}</text></svg>"#,
                        request.language.name()
                    ))
                }
            }
            .boxed()
        }
    }

    fn rendered(markdown: &str) -> (Surface, NodeId) {
        let result = Pipeline::default().render(markdown);
        let mut surface = Surface::preview();
        let content = surface.preview_content().unwrap();
        surface.set_children_markup(content, &result.nodes).unwrap();
        (surface, content)
    }

    #[test]
    fn test_find_blocks() {
        let (surface, content) = rendered(
            "```mermaid\ngraph TD\n```\n\n```rust\nfn main() {}\n```\n\n```kroki-d2\na -> b\n```\n\n```kroki-nope\nx\n```\n",
        );

        let blocks = find_diagram_blocks(&surface, content);

        let found: Vec<_> = blocks
            .iter()
            .map(|block| (block.request.index, block.request.language, block.request.source.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (0, DiagramLanguage::Mermaid, "graph TD\n"),
                (1, DiagramLanguage::D2, "a -> b\n"),
            ]
        );
        assert_eq!(surface.tag(blocks[0].container), Some("pre"));
    }

    #[tokio::test]
    async fn test_valid_and_invalid_blocks_are_isolated() {
        let (mut surface, content) =
            rendered("```mermaid\ngraph TD; A-->B\n```\n\ntext\n\n```mermaid\ninvalid !!\n```\n");

        let report = process_diagrams(&mut surface, content, &FakeEngine, 7).await;

        assert_eq!(report.rendered, vec![0]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].index, 1);

        let figures = surface.select(content, "figure.diagram").unwrap();
        assert_eq!(figures.len(), 1);
        assert_eq!(surface.attr(figures[0], "id"), Some("diagram-7-0"));
        assert!(surface.has_class(figures[0], "diagram-mermaid"));
        assert_eq!(surface.select(figures[0], "svg text").unwrap().len(), 1);

        let panels = surface.select(content, ".diagram-error").unwrap();
        assert_eq!(panels.len(), 1);
        assert_eq!(
            surface.text_content(panels[0]),
            "Diagram error: HTTP 400: Syntax error in graph"
        );
        assert!(surface.select(content, "pre").unwrap().is_empty());
        assert_eq!(surface.select(content, "p").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ids_follow_generation() {
        let markdown = "```mermaid\ngraph TD\n```\n";
        let (mut first, first_content) = rendered(markdown);
        let (mut second, second_content) = rendered(markdown);

        process_diagrams(&mut first, first_content, &FakeEngine, 1).await;
        process_diagrams(&mut second, second_content, &FakeEngine, 2).await;

        let id = |surface: &Surface, scope| {
            let figure = surface.select(scope, "figure").unwrap()[0];
            surface.attr(figure, "id").map(str::to_owned)
        };
        assert_eq!(id(&first, first_content).as_deref(), Some("diagram-1-0"));
        assert_eq!(id(&second, second_content).as_deref(), Some("diagram-2-0"));
    }

    #[tokio::test]
    async fn test_no_diagrams_leaves_surface_untouched() {
        let (mut surface, content) = rendered("```rust\nfn main() {}\n```\n");
        let before = surface.inner_html(content);

        let report = process_diagrams(&mut surface, content, &FakeEngine, 1).await;

        assert!(report.is_empty());
        assert_eq!(surface.inner_html(content), before);
    }

    #[tokio::test]
    async fn test_invalid_svg_becomes_error_panel() {
        struct BrokenEngine;

        impl DiagramEngine for BrokenEngine {
            fn name(&self) -> &str {
                "broken"
            }

            fn compile<'a>(&'a self, _request: &'a DiagramRequest) -> BoxFuture<'a, Result<String, DiagramError>> {
                async { Ok("Internal Server Error".to_owned()) }.boxed()
            }
        }

        let (mut surface, content) = rendered("```dot\ndigraph { a -> b }\n```\n");

        let report = process_diagrams(&mut surface, content, &BrokenEngine, 1).await;

        assert_eq!(report.errors.len(), 1);
        let panel = surface.select(content, ".diagram-error").unwrap()[0];
        assert_eq!(surface.text_content(panel), "Diagram error: Invalid SVG: no <svg> element");
    }
}
