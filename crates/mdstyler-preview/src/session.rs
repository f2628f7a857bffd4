//! The preview session.
//!
//! A [`PreviewSession`] owns the current theme configuration, the user's
//! style overrides, the synthesized style sheet derived from both, and the
//! most recently committed rendered surface. Renders may overlap: each one
//! takes a new generation, and a render whose generation has been
//! superseded by the time it finishes is discarded instead of committed.

use std::sync::{Arc, PoisonError, RwLock};

use mdstyler_diagrams::{DiagramEngine, DiagramReport, process_diagrams};
use mdstyler_export::{ExportArtifact, PaginationOptions, Paginator, export_document};
use mdstyler_renderer::TocEntry;
use mdstyler_surface::{NodeId, Stylesheet, Surface, SurfaceError};
use mdstyler_theme::{ThemeConfig, ThemePatch, synthesize};
use tokio::sync::broadcast;

use crate::error::PreviewError;
use crate::generation::GenerationCounter;
use crate::print::print_document;
use crate::renderer::DocumentRenderer;

const EVENT_CAPACITY: usize = 16;

/// Notification sent to subscribers when the preview changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewEvent {
    /// A render was committed.
    Rendered { generation: u64 },
    /// The style sheet was recomputed.
    StyleChanged,
}

/// What happened to a render request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    Committed {
        generation: u64,
        diagrams: usize,
        diagram_errors: usize,
    },
    /// A newer render started before this one finished.
    Superseded { generation: u64, latest: u64 },
}

/// A committed render.
#[derive(Debug, Clone)]
struct RenderedDocument {
    generation: u64,
    surface: Surface,
    content: NodeId,
    title: Option<String>,
    toc: Vec<TocEntry>,
}

#[derive(Debug)]
struct StyleState {
    config: ThemeConfig,
    overrides: String,
    stylesheet: String,
}

impl StyleState {
    fn new(config: ThemeConfig, overrides: String) -> Self {
        let stylesheet = synthesize(&config, &overrides);
        Self {
            config,
            overrides,
            stylesheet,
        }
    }

    fn recompute(&mut self) {
        self.stylesheet = synthesize(&self.config, &self.overrides);
    }
}

/// Interactive preview of one document.
pub struct PreviewSession {
    renderer: Arc<dyn DocumentRenderer>,
    diagrams: Option<Arc<dyn DiagramEngine>>,
    generations: GenerationCounter,
    document: RwLock<Option<RenderedDocument>>,
    style: RwLock<StyleState>,
    content_width_px: f64,
    scale: f64,
    events: broadcast::Sender<PreviewEvent>,
}

impl PreviewSession {
    /// Create a session. Without a diagram engine, diagram blocks stay
    /// highlighted code.
    pub fn new(
        renderer: Arc<dyn DocumentRenderer>,
        diagrams: Option<Arc<dyn DiagramEngine>>,
        config: ThemeConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let defaults = PaginationOptions::default();
        Self {
            renderer,
            diagrams,
            generations: GenerationCounter::new(),
            document: RwLock::new(None),
            style: RwLock::new(StyleState::new(config, String::new())),
            content_width_px: defaults.content_width_px,
            scale: defaults.scale,
            events,
        }
    }

    /// Set the export layout width and raster scale.
    #[must_use]
    pub fn with_export_geometry(mut self, content_width_px: f64, scale: f64) -> Self {
        self.content_width_px = content_width_px;
        self.scale = scale;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PreviewEvent> {
        self.events.subscribe()
    }

    /// Render `source` and commit it unless a newer render started meanwhile.
    ///
    /// The new surface is built off to the side and swapped in whole, so
    /// readers never observe a partially rendered document.
    pub async fn render(&self, source: &str) -> Result<RenderOutcome, PreviewError> {
        let generation = self.generations.advance();
        let result = self.renderer.render(source.to_owned()).await;
        if let Some(outcome) = self.superseded(generation) {
            return Ok(outcome);
        }

        let mut surface = Surface::preview();
        let content = surface
            .preview_content()
            .ok_or_else(|| SurfaceError::UnknownNode(surface.document()))?;
        surface.set_children_markup(content, &result.nodes)?;

        let report = match &self.diagrams {
            Some(engine) => process_diagrams(&mut surface, content, engine.as_ref(), generation).await,
            None => DiagramReport::default(),
        };
        if let Some(outcome) = self.superseded(generation) {
            return Ok(outcome);
        }

        {
            let mut document = self.document.write().unwrap_or_else(PoisonError::into_inner);
            // Checked again under the lock so two renders cannot both commit.
            if let Some(outcome) = self.superseded(generation) {
                return Ok(outcome);
            }
            *document = Some(RenderedDocument {
                generation,
                surface,
                content,
                title: result.title,
                toc: result.toc,
            });
        }

        tracing::debug!(
            generation,
            diagrams = report.rendered.len(),
            diagram_errors = report.errors.len(),
            "Committed render"
        );
        let _ = self.events.send(PreviewEvent::Rendered { generation });

        Ok(RenderOutcome::Committed {
            generation,
            diagrams: report.rendered.len(),
            diagram_errors: report.errors.len(),
        })
    }

    fn superseded(&self, generation: u64) -> Option<RenderOutcome> {
        if self.generations.is_current(generation) {
            return None;
        }
        let latest = self.generations.latest();
        tracing::debug!(generation, latest, "Discarding stale render");
        Some(RenderOutcome::Superseded { generation, latest })
    }

    /// Generation of the committed render, if any.
    pub fn committed_generation(&self) -> Option<u64> {
        self.read_document(|document| document.generation)
    }

    /// Rendered markup of the committed document.
    pub fn html(&self) -> Option<String> {
        self.read_document(|document| document.surface.inner_html(document.content))
    }

    pub fn title(&self) -> Option<String> {
        self.read_document(|document| document.title.clone()).flatten()
    }

    pub fn toc(&self) -> Vec<TocEntry> {
        self.read_document(|document| document.toc.clone())
            .unwrap_or_default()
    }

    fn read_document<T>(&self, f: impl FnOnce(&RenderedDocument) -> T) -> Option<T> {
        let document = self.document.read().unwrap_or_else(PoisonError::into_inner);
        document.as_ref().map(f)
    }

    pub fn config(&self) -> ThemeConfig {
        self.read_style(|style| style.config.clone())
    }

    pub fn overrides(&self) -> String {
        self.read_style(|style| style.overrides.clone())
    }

    /// The synthesized style sheet for the current configuration and overrides.
    pub fn stylesheet(&self) -> String {
        self.read_style(|style| style.stylesheet.clone())
    }

    fn read_style<T>(&self, f: impl FnOnce(&StyleState) -> T) -> T {
        f(&self.style.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn update_style(&self, f: impl FnOnce(&mut StyleState)) {
        {
            let mut style = self.style.write().unwrap_or_else(PoisonError::into_inner);
            f(&mut style);
            style.recompute();
        }
        let _ = self.events.send(PreviewEvent::StyleChanged);
    }

    /// Replace the whole configuration.
    pub fn set_config(&self, config: ThemeConfig) {
        self.update_style(|style| style.config = config);
    }

    /// Merge a partial configuration update.
    pub fn update_config(&self, patch: &ThemePatch) {
        self.update_style(|style| style.config.merge(patch));
    }

    /// Apply a named preset, keeping page geometry.
    pub fn apply_preset(&self, name: &str) -> Result<(), PreviewError> {
        let mut config = self.config();
        config.apply_preset(name)?;
        self.set_config(config);
        Ok(())
    }

    pub fn set_overrides(&self, overrides: impl Into<String>) {
        let overrides = overrides.into();
        self.update_style(|style| style.overrides = overrides);
    }

    /// Standalone HTML of the committed document for printing.
    pub fn print_document(&self) -> Option<String> {
        let stylesheet = self.stylesheet();
        self.read_document(|document| {
            print_document(
                document.title.as_deref(),
                &stylesheet,
                &document.surface.inner_html(document.content),
            )
        })
    }

    /// Export the committed document with the current configuration.
    ///
    /// The export works on a copy of the committed surface on the blocking
    /// thread pool; renders committed in the meantime are unaffected.
    pub async fn export(
        &self,
        paginator: Arc<dyn Paginator>,
        filename: Option<&str>,
    ) -> Result<ExportArtifact, PreviewError> {
        let Some(document) = self.read_document(Clone::clone) else {
            return Err(mdstyler_export::ExportError::Empty.into());
        };
        let (stylesheet, mut options) =
            self.read_style(|style| (style.stylesheet.clone(), PaginationOptions::from_config(&style.config)));
        options.content_width_px = self.content_width_px;
        options.scale = self.scale;
        options.title.clone_from(&document.title);
        let filename = filename.map(str::to_owned);

        let task = tokio::task::spawn_blocking(move || {
            let RenderedDocument {
                mut surface,
                content,
                ..
            } = document;
            export_document(
                &mut surface,
                content,
                &Stylesheet::parse(&stylesheet),
                &options,
                paginator.as_ref(),
                filename.as_deref(),
            )
        });
        match task.await {
            Ok(result) => Ok(result?),
            Err(e) => Err(PreviewError::Task(e.to_string())),
        }
    }
}

impl std::fmt::Debug for PreviewSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewSession")
            .field("latest_generation", &self.generations.latest())
            .field("committed_generation", &self.committed_generation())
            .field("diagrams", &self.diagrams.as_ref().map(|engine| engine.name().to_owned()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::FutureExt;
    use futures::future::BoxFuture;
    use mdstyler_diagrams::{DiagramError, DiagramErrorKind, DiagramRequest};
    use mdstyler_export::{ExportError, PdfPaginator};
    use mdstyler_renderer::RenderResult;
    use mdstyler_theme::PageSize;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::renderer::PipelineRenderer;

    /// Delays sources that start with `slow` before rendering them.
    struct DelayedRenderer {
        inner: PipelineRenderer,
    }

    impl DocumentRenderer for DelayedRenderer {
        fn render(&self, source: String) -> BoxFuture<'_, RenderResult> {
            async move {
                if source.starts_with("slow") {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                self.inner.render(source).await
            }
            .boxed()
        }
    }

    struct FakeEngine;

    impl DiagramEngine for FakeEngine {
        fn name(&self) -> &str {
            "fake"
        }

        fn compile<'a>(&'a self, request: &'a DiagramRequest) -> BoxFuture<'a, Result<String, DiagramError>> {
            async move {
                if request.source.contains("bad") {
                    Err(DiagramError::new(
                        request.index,
                        DiagramErrorKind::Engine("syntax error".to_owned()),
                    ))
                } else {
                    Ok(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"></svg>"#.to_owned())
                }
            }
            .boxed()
        }
    }

    fn session() -> PreviewSession {
        PreviewSession::new(Arc::new(PipelineRenderer::default()), None, ThemeConfig::default())
    }

    #[tokio::test]
    async fn test_render_commits() {
        let session = session();
        let mut events = session.subscribe();

        let outcome = session.render("# Title\n\nBody").await.unwrap();
        assert!(matches!(outcome, RenderOutcome::Committed { generation: 1, .. }));
        assert_eq!(session.committed_generation(), Some(1));
        assert_eq!(session.title().as_deref(), Some("Title"));
        assert!(session.html().unwrap().contains("<p>Body</p>"));
        assert_eq!(events.recv().await.unwrap(), PreviewEvent::Rendered { generation: 1 });
    }

    #[tokio::test]
    async fn test_stale_render_is_discarded() {
        let session = PreviewSession::new(
            Arc::new(DelayedRenderer {
                inner: PipelineRenderer::default(),
            }),
            None,
            ThemeConfig::default(),
        );

        let (first, second) = tokio::join!(session.render("slow version one"), session.render("version two"));

        assert_eq!(
            first.unwrap(),
            RenderOutcome::Superseded {
                generation: 1,
                latest: 2
            }
        );
        assert!(matches!(second.unwrap(), RenderOutcome::Committed { generation: 2, .. }));
        let html = session.html().unwrap();
        assert!(html.contains("version two"));
        assert!(!html.contains("version one"));
    }

    #[tokio::test]
    async fn test_diagrams_are_isolated() {
        let session = PreviewSession::new(
            Arc::new(PipelineRenderer::default()),
            Some(Arc::new(FakeEngine)),
            ThemeConfig::default(),
        );

        let outcome = session
            .render("```mermaid\ngraph TD\n```\n\n```mermaid\nbad\n```\n")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            RenderOutcome::Committed {
                generation: 1,
                diagrams: 1,
                diagram_errors: 1
            }
        );
        let html = session.html().unwrap();
        assert!(html.contains(r#"id="diagram-1-0""#), "{html}");
        assert!(html.contains("Diagram error: syntax error"), "{html}");
    }

    #[tokio::test]
    async fn test_style_recomputed_on_change() {
        let session = session();
        let mut events = session.subscribe();
        let before = session.stylesheet();

        session.update_config(&ThemePatch {
            h2_color: Some("#ff0000".to_owned()),
            ..ThemePatch::default()
        });
        let after = session.stylesheet();
        assert_ne!(before, after);
        assert!(after.contains("#ff0000"));
        assert_eq!(events.recv().await.unwrap(), PreviewEvent::StyleChanged);

        session.set_overrides(".preview-content h2 { color: blue; }");
        assert!(session.stylesheet().ends_with(".preview-content h2 { color: blue; }\n"));
        assert_eq!(session.stylesheet(), synthesize(&session.config(), &session.overrides()));
    }

    #[tokio::test]
    async fn test_apply_preset_keeps_page_geometry() {
        let session = session();
        session.update_config(&ThemePatch {
            page_size: Some(PageSize::Legal),
            ..ThemePatch::default()
        });

        session.apply_preset("dracula").unwrap();
        let config = session.config();
        assert_eq!(config.preset, "dracula");
        assert_eq!(config.page_size, PageSize::Legal);

        assert!(matches!(
            session.apply_preset("no-such-theme"),
            Err(PreviewError::Theme(_))
        ));
    }

    #[tokio::test]
    async fn test_print_document() {
        let session = session();
        assert_eq!(session.print_document(), None);

        session.render("# Notes\n\ntext").await.unwrap();
        let document = session.print_document().unwrap();
        assert!(document.contains("<title>Notes</title>"));
        assert!(document.contains(&session.stylesheet()));
        assert!(document.contains("<p>text</p>"));
    }

    #[tokio::test]
    async fn test_export() {
        let session = session();
        let paginator: Arc<dyn Paginator> = Arc::new(PdfPaginator);

        let error = session.export(Arc::clone(&paginator), None).await.unwrap_err();
        assert!(matches!(error, PreviewError::Export(ExportError::Empty)));

        session.render("# Report\n\nSome text.").await.unwrap();
        let before = session.html();
        let artifact = session.export(paginator, Some("report.pdf")).await.unwrap();
        assert_eq!(artifact.filename, "report.pdf");
        assert_eq!(artifact.pages, 1);
        assert!(lopdf::Document::load_mem(&artifact.bytes).is_ok());
        assert_eq!(session.html(), before);
    }
}
