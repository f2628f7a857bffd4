use mdstyler_export::ExportError;
use mdstyler_surface::SurfaceError;
use mdstyler_theme::ThemeError;

/// Preview session error.
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error(transparent)]
    Theme(#[from] ThemeError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Background task failed: {0}")]
    Task(String),
}
