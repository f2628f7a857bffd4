use mdstyler_surface::SurfaceError;

/// Export error.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Nothing to export: the document is empty")]
    Empty,

    #[error("Pagination failed: {0}")]
    Paginate(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Surface(#[from] SurfaceError),
}
