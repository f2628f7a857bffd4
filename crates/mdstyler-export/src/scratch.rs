//! Off-screen container holding the export copy of a document.

use mdstyler_surface::{NodeId, Surface, SurfaceError};

/// Class of the off-screen container.
pub const SCRATCH_CLASS: &str = "export-scratch";

/// A copy of the rendered content mounted off-screen at a fixed width.
///
/// The container is attached to the surface's document for as long as the
/// guard lives. Dropping the guard, whichever way the export ends, detaches
/// it and frees every node created since it was mounted.
pub struct ScratchContainer<'a> {
    surface: &'a mut Surface,
    container: NodeId,
    content: NodeId,
    mark: usize,
}

impl<'a> ScratchContainer<'a> {
    /// Copy `source` into a new off-screen container `width_px` wide.
    pub fn mount(surface: &'a mut Surface, source: NodeId, width_px: f64) -> Result<Self, SurfaceError> {
        let mark = surface.node_count();
        let content = surface.clone_subtree(source)?;
        let container = surface.create_element(
            "div",
            vec![
                ("class".to_owned(), SCRATCH_CLASS.to_owned()),
                (
                    "style".to_owned(),
                    format!("position: absolute; top: -9999px; left: 0; width: {width_px}px;"),
                ),
            ],
        );
        surface.append_child(container, content)?;
        let document = surface.document();
        surface.append_child(document, container)?;

        Ok(Self {
            surface,
            container,
            content,
            mark,
        })
    }

    pub fn surface(&self) -> &Surface {
        self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        self.surface
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Root of the copied content.
    pub fn content(&self) -> NodeId {
        self.content
    }
}

impl Drop for ScratchContainer<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.surface.detach(self.container) {
            tracing::debug!(error = %e, "Failed to detach export container");
        }
        self.surface.truncate(self.mark);
    }
}
