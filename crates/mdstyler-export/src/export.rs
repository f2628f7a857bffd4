//! The export entry point.

use std::path::Path;

use mdstyler_surface::{Media, NodeId, StyleResolver, Stylesheet, Surface};

use crate::error::ExportError;
use crate::options::{DEFAULT_FILENAME, PaginationOptions};
use crate::pdf::{PaginationInput, Paginator};
use crate::scratch::ScratchContainer;
use crate::snapshot::{apply_break_policy, snapshot_styles};

/// A finished export.
#[derive(Clone, Debug)]
pub struct ExportArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub pages: usize,
}

impl ExportArtifact {
    /// Write the artifact into `dir` under its filename.
    pub fn save_in(&self, dir: &Path) -> Result<std::path::PathBuf, ExportError> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Export the rendered `content` of `surface` as a paginated document.
///
/// The content is copied into an off-screen container, every element gets
/// its computed colors and text metrics written inline, structural blocks
/// are marked unsplittable, and the self-styled copy is handed to
/// `paginator`. The container is removed again on every path. Failures
/// are logged and returned; the live content is never modified.
pub fn export_document(
    surface: &mut Surface,
    content: NodeId,
    stylesheet: &Stylesheet,
    options: &PaginationOptions,
    paginator: &dyn Paginator,
    filename: Option<&str>,
) -> Result<ExportArtifact, ExportError> {
    let filename = filename
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_FILENAME);

    match export_copy(surface, content, stylesheet, options, paginator) {
        Ok(document) => {
            tracing::info!(filename, pages = document.pages, "Exported document");
            Ok(ExportArtifact {
                filename: filename.to_owned(),
                bytes: document.bytes,
                pages: document.pages,
            })
        }
        Err(error) => {
            tracing::error!(filename, %error, "Export failed");
            Err(error)
        }
    }
}

fn export_copy(
    surface: &mut Surface,
    content: NodeId,
    stylesheet: &Stylesheet,
    options: &PaginationOptions,
    paginator: &dyn Paginator,
) -> Result<crate::pdf::PaginatedDocument, ExportError> {
    if surface.children(content).is_empty() {
        return Err(ExportError::Empty);
    }

    let mut scratch = ScratchContainer::mount(surface, content, options.content_width_px)?;
    let root = scratch.content();
    for (name, value) in root_overrides(options) {
        scratch.surface_mut().set_style_property(root, name, &value)?;
    }

    let resolver = StyleResolver::new(Media::Screen).with_stylesheet(stylesheet.clone());
    let computed = resolver.resolve(scratch.surface(), root);
    let touched = snapshot_styles(scratch.surface_mut(), root, &computed)?;
    apply_break_policy(scratch.surface_mut(), root)?;
    tracing::debug!(elements = touched, "Snapshotted computed styles");

    let styles = resolver.resolve(scratch.surface(), root);
    let input = PaginationInput {
        surface: scratch.surface(),
        root,
        styles: &styles,
    };
    paginator.paginate(&input, options)
}

/// Inline styles making the copy fill the page with the theme colors.
fn root_overrides(options: &PaginationOptions) -> [(&'static str, String); 7] {
    [
        ("width", "100%".to_owned()),
        ("height", "auto".to_owned()),
        ("min-height", "100%".to_owned()),
        ("margin", "0".to_owned()),
        ("padding", "0".to_owned()),
        ("background-color", options.background_color.clone()),
        ("color", options.text_color.clone()),
    ]
}
