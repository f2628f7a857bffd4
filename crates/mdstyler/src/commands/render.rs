//! `mdstyler render` command implementation.

use std::path::PathBuf;

use clap::Args;

use crate::GlobalArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Markdown file to render.
    input: PathBuf,

    /// Output HTML file (default: the input with an `.html` extension).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl RenderArgs {
    /// Render the input and write the standalone print document.
    pub(crate) async fn execute(self, global: &GlobalArgs) -> Result<(), CliError> {
        let output = Output::new();
        let (_config, session) = super::render_input(global, None, &self.input, &output).await?;

        let document = session
            .print_document()
            .ok_or_else(|| CliError::Superseded(self.input.display().to_string()))?;
        let target = self
            .output
            .unwrap_or_else(|| self.input.with_extension("html"));
        std::fs::write(&target, document)?;

        output.success(&format!("Wrote {}", target.display()));
        Ok(())
    }
}
