//! CLI error types.

use mdstyler_config::ConfigError;
use mdstyler_export::ExportError;
use mdstyler_preview::PreviewError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Preview(#[from] PreviewError),

    #[error("{0}")]
    Export(#[from] ExportError),

    /// A newer render replaced this one; only possible if the session is shared.
    #[error("render of {0} was superseded")]
    Superseded(String),
}
