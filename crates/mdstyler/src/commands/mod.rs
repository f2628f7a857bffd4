//! CLI command implementations.

mod export;
mod render;

use std::path::Path;
use std::sync::Arc;

use mdstyler_config::{CliSettings, Config};
use mdstyler_diagrams::{CachedEngine, DiagramEngine, KrokiEngine};
use mdstyler_preview::{PipelineRenderer, PreviewSession, RenderOutcome};
use mdstyler_renderer::Pipeline;
use mdstyler_theme::{DEFAULT_PRESET, presets};

pub(crate) use export::ExportArgs;
pub(crate) use render::RenderArgs;

use crate::GlobalArgs;
use crate::error::CliError;
use crate::output::Output;

/// Print the preset names, marking the default.
pub(crate) fn list_presets() {
    let output = Output::stdout();
    for preset in presets() {
        let line = format!("{:<16} {}", preset.name, preset.label);
        if preset.name == DEFAULT_PRESET {
            output.highlight(&format!("{line} (default)"));
        } else {
            output.info(&line);
        }
    }
}

/// Load the configuration, build a session from it and render `input`.
async fn render_input(
    global: &GlobalArgs,
    filename: Option<String>,
    input: &Path,
    output: &Output,
) -> Result<(Config, PreviewSession), CliError> {
    let cli_settings = CliSettings {
        preset: global.preset.clone(),
        kroki_url: global.kroki_url.clone(),
        filename,
    };
    let config = Config::load(global.config.as_deref(), Some(&cli_settings))?;
    if let Some(path) = &config.config_path {
        tracing::info!(path = %path.display(), "Loaded configuration");
    }

    let session = build_session(&config)?;
    let source = std::fs::read_to_string(input)?;

    match session.render(&source).await? {
        RenderOutcome::Committed {
            diagrams,
            diagram_errors,
            ..
        } => {
            if diagram_errors > 0 {
                output.warning(&format!(
                    "{diagram_errors} of {diagrams} diagrams failed to render"
                ));
            }
        }
        RenderOutcome::Superseded { .. } => {
            return Err(CliError::Superseded(input.display().to_string()));
        }
    }

    Ok((config, session))
}

fn build_session(config: &Config) -> Result<PreviewSession, CliError> {
    let renderer = PipelineRenderer::new(Pipeline::new(config.render.render_options()));

    let diagrams = config.diagrams_resolved.kroki_url.as_ref().map(|url| {
        let engine = KrokiEngine::new(url.clone(), config.diagrams_resolved.timeout);
        if config.diagrams_resolved.cache {
            Arc::new(CachedEngine::new(engine)) as Arc<dyn DiagramEngine>
        } else {
            Arc::new(engine)
        }
    });

    let session = PreviewSession::new(Arc::new(renderer), diagrams, config.theme_config()?)
        .with_export_geometry(config.export.content_width_px, config.export.scale);
    if !config.style_resolved.overrides.is_empty() {
        session.set_overrides(config.style_resolved.overrides.clone());
    }
    Ok(session)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::PathBuf;

    use super::*;

    /// A temp dir with an explicit config and a markdown input.
    pub(crate) fn fixture(config: &str, markdown: &str) -> (tempfile::TempDir, GlobalArgs, PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join("mdstyler.toml");
        std::fs::write(&config_path, config).unwrap();
        let input = temp.path().join("notes.md");
        std::fs::write(&input, markdown).unwrap();
        let global = GlobalArgs {
            config: Some(config_path),
            ..GlobalArgs::default()
        };
        (temp, global, input)
    }

    #[test]
    fn test_build_session_applies_config() {
        let (_temp, global, _input) = fixture(
            "[theme]\npreset = \"nord\"\n\n[style]\noverrides = \"h1 { color: red; }\"\n",
            "",
        );
        let config = Config::load(global.config.as_deref(), None).unwrap();
        let session = build_session(&config).unwrap();

        assert_eq!(session.config().preset, "nord");
        assert!(session.stylesheet().contains("h1 { color: red; }"));
    }

    #[tokio::test]
    async fn test_render_input_missing_file() {
        let (temp, global, _input) = fixture("", "");
        let result = render_input(&global, None, &temp.path().join("absent.md"), &Output::new()).await;
        assert!(matches!(result, Err(CliError::Io(_))));
    }
}
