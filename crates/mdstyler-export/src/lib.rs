//! Pagination and PDF export.
//!
//! [`export_document`] turns the rendered preview content of a
//! [`Surface`](mdstyler_surface::Surface) into a paginated artifact:
//!
//! 1. copy the content into an off-screen [`ScratchContainer`]
//! 2. write every element's computed colors and text metrics inline
//! 3. mark structural blocks unsplittable and headings keep-with-next
//! 4. hand the copy to a [`Paginator`]
//!
//! [`PdfPaginator`] lays the copy out at a fixed pixel width, scales it
//! onto the page's content box and writes one vector PDF page per slice.
//!
//! # Example
//!
//! ```
//! use mdstyler_export::{PaginationOptions, PdfPaginator, export_document};
//! use mdstyler_renderer::parse_fragment;
//! use mdstyler_surface::{Stylesheet, Surface};
//! use mdstyler_theme::{ThemeConfig, synthesize};
//!
//! let mut surface = Surface::preview();
//! let content = surface.preview_content().unwrap();
//! surface
//!     .set_children_markup(content, &parse_fragment("<h1>Notes</h1>").unwrap())
//!     .unwrap();
//!
//! let config = ThemeConfig::default();
//! let stylesheet = Stylesheet::parse(&synthesize(&config, ""));
//! let options = PaginationOptions::from_config(&config);
//! let artifact =
//!     export_document(&mut surface, content, &stylesheet, &options, &PdfPaginator, None).unwrap();
//! assert!(artifact.bytes.starts_with(b"%PDF-1.7"));
//! ```

mod error;
mod export;
mod layout;
mod options;
mod paginate;
mod pdf;
mod scratch;
mod snapshot;

pub use error::ExportError;
pub use export::{ExportArtifact, export_document};
pub use options::{
    BREAK_AFTER_SELECTOR, BREAK_BEFORE_SELECTOR, DEFAULT_AVOID_SELECTORS, DEFAULT_CONTENT_WIDTH,
    DEFAULT_FILENAME, DEFAULT_SCALE, Orientation, PaginationOptions,
};
pub use pdf::{PaginatedDocument, PaginationInput, Paginator, PdfPaginator};
pub use scratch::{SCRATCH_CLASS, ScratchContainer};
pub use snapshot::{AVOID_INSIDE_TAGS, KEEP_WITH_NEXT_TAGS, apply_break_policy, snapshot_styles};
