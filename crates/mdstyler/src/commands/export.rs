//! `mdstyler export` command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use mdstyler_export::PdfPaginator;

use crate::GlobalArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the export command.
#[derive(Args)]
pub(crate) struct ExportArgs {
    /// Markdown file to export.
    input: PathBuf,

    /// Output PDF file (default: `export.filename` in the current directory).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ExportArgs {
    /// Render the input and write the paginated PDF.
    pub(crate) async fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let output = Output::new();

        let (dir, filename) = match &self.output {
            Some(path) => (
                path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf),
                path.file_name().map(|name| name.to_string_lossy().into_owned()),
            ),
            None => (PathBuf::from("."), None),
        };

        let (config, session) =
            super::render_input(global, filename, &self.input, &output).await?;

        let artifact = session
            .export(Arc::new(PdfPaginator), Some(&config.export.filename))
            .await?;
        let path = artifact.save_in(&dir)?;

        output.success(&format!(
            "Wrote {} ({} page{})",
            path.display(),
            artifact.pages,
            if artifact.pages == 1 { "" } else { "s" }
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::fixture;

    #[tokio::test]
    async fn test_export_writes_pdf() {
        let (temp, global, input) = fixture(
            "[export]\ncontent_width_px = 800\n",
            "# Report\n\nSome text.\n\n| a | b |\n|---|---|\n| 1 | 2 |\n",
        );
        let target = temp.path().join("report.pdf");
        let args = ExportArgs {
            input,
            output: Some(target.clone()),
        };

        args.execute(&global).await.unwrap();

        let bytes = std::fs::read(&target).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
    }

    #[tokio::test]
    async fn test_export_empty_document_fails() {
        let (temp, global, input) = fixture("", "");
        let args = ExportArgs {
            input,
            output: Some(temp.path().join("empty.pdf")),
        };

        let result = args.execute(&global).await;
        assert!(matches!(
            result,
            Err(CliError::Preview(mdstyler_preview::PreviewError::Export(
                mdstyler_export::ExportError::Empty
            )))
        ));
    }
}
