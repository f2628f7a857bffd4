//! Asynchronous document rendering.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use mdstyler_renderer::{Element, MarkupNode, Pipeline, RenderResult, to_html};

/// Renders source text to styled markup.
///
/// Rendering is total: an implementation always produces a result, falling
/// back to the verbatim source when it cannot do better.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, source: String) -> BoxFuture<'_, RenderResult>;
}

/// Runs a [`Pipeline`] on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct PipelineRenderer {
    pipeline: Arc<Pipeline>,
}

impl PipelineRenderer {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

impl Default for PipelineRenderer {
    fn default() -> Self {
        Self::new(Pipeline::default())
    }
}

impl DocumentRenderer for PipelineRenderer {
    fn render(&self, source: String) -> BoxFuture<'_, RenderResult> {
        let pipeline = Arc::clone(&self.pipeline);
        async move {
            let fallback = source.clone();
            match tokio::task::spawn_blocking(move || pipeline.render(&source)).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(error = %e, "Render task failed, showing source text");
                    verbatim(&fallback)
                }
            }
        }
        .boxed()
    }
}

/// The source shown as preformatted text.
pub(crate) fn verbatim(source: &str) -> RenderResult {
    let nodes = vec![MarkupNode::Element(Element::new("pre").with_text(source))];
    RenderResult {
        html: to_html(&nodes),
        nodes,
        title: None,
        toc: Vec::new(),
        warnings: vec!["rendered verbatim".to_owned()],
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_pipeline_renderer() {
        let result = PipelineRenderer::default().render("# Hello".to_owned()).await;
        assert_eq!(result.title.as_deref(), Some("Hello"));
        assert!(result.html.contains("<h1"));
    }

    #[test]
    fn test_verbatim_escapes() {
        let result = verbatim("<b>x</b>");
        assert_eq!(result.html, "<pre>&lt;b&gt;x&lt;/b&gt;</pre>");
    }
}
