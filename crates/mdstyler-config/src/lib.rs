//! Configuration for mdstyler.
//!
//! Parses `mdstyler.toml` with serde and discovers it in the current
//! directory or its parents. Every section is optional, so an empty file
//! is a valid configuration.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Values without `${` are never expanded. Expanded fields:
//! - `diagrams.kroki_url`
//! - `style.overrides_file`
//! - `export.filename`

use std::path::{Path, PathBuf};
use std::time::Duration;

use mdstyler_renderer::RenderOptions;
use mdstyler_theme::{DEFAULT_PRESET, ThemeConfig, ThemePatch, find_preset};
use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdstyler.toml";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// CLI settings that override configuration file values.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the theme preset.
    pub preset: Option<String>,
    /// Override Kroki URL for diagram rendering.
    pub kroki_url: Option<String>,
    /// Override the export filename.
    pub filename: Option<String>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Partial theme configuration applied over the chosen preset.
    pub theme: ThemePatch,
    style: StyleConfigRaw,
    pub render: RenderConfig,
    /// When present, `kroki_url` is required.
    diagrams: Option<DiagramsConfigRaw>,
    pub export: ExportConfig,

    /// Resolved style configuration (set after loading).
    #[serde(skip)]
    pub style_resolved: StyleConfig,
    /// Resolved diagrams configuration (set after loading).
    #[serde(skip)]
    pub diagrams_resolved: DiagramsConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StyleConfigRaw {
    overrides: Option<String>,
    overrides_file: Option<String>,
}

/// Custom style overrides.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StyleConfig {
    /// Inline overrides followed by the contents of `overrides_file`.
    pub overrides: String,
    /// Absolute path of the overrides file, if one was configured.
    pub overrides_file: Option<PathBuf>,
}

/// Transform pipeline switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Pass raw markup in the source through unescaped.
    pub allow_raw_html: bool,
    pub highlight: bool,
    pub math: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        let options = RenderOptions::default();
        Self {
            allow_raw_html: options.allow_raw_html,
            highlight: options.highlight,
            math: options.math,
        }
    }
}

impl RenderConfig {
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            allow_raw_html: self.allow_raw_html,
            math: self.math,
            highlight: self.highlight,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DiagramsConfigRaw {
    kroki_url: Option<String>,
    timeout_secs: Option<u64>,
    cache: Option<bool>,
}

/// Resolved diagram rendering configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramsConfig {
    /// Kroki server URL. Without one, diagram blocks stay code blocks.
    pub kroki_url: Option<String>,
    pub timeout: Duration,
    /// Cache compiled diagrams in memory.
    pub cache: bool,
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            kroki_url: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache: true,
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub filename: String,
    /// Width the document is laid out at before it is scaled onto the page.
    pub content_width_px: f64,
    /// Raster scale factor.
    pub scale: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            filename: "markdown-styled.pdf".to_owned(),
            content_width_px: 1000.0,
            scale: 2.0,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`diagrams.kroki_url`").
        field: String,
        message: String,
    },
}

/// Expand one field. Values without `${` are returned as they are, so a
/// literal `$` in a filename survives.
fn expand_field(
    value: &str,
    field: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }
    shellexpand::env_with_context(value, |var| lookup(var).map(Some).ok_or(()))
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} is not set", e.var_name),
        })
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

fn require_positive(value: f64, field: &str) -> Result<(), ConfigError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(ConfigError::Validation(format!("{field} must be greater than 0")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise,
    /// searches for `mdstyler.toml` in the current directory and its
    /// parents, falling back to defaults when none is found.
    ///
    /// CLI settings are applied last and take precedence.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_from(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(preset) = &settings.preset {
            self.theme.preset = Some(preset.clone());
        }
        if let Some(kroki_url) = &settings.kroki_url {
            self.diagrams_resolved.kroki_url = Some(kroki_url.clone());
        }
        if let Some(filename) = &settings.filename {
            self.export.filename.clone_from(filename);
        }
    }

    /// Search for the config file in `start` and its parents.
    fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(preset) = &self.theme.preset
            && find_preset(preset).is_none()
        {
            return Err(ConfigError::Validation(format!("theme.preset: unknown preset `{preset}`")));
        }

        if let Some(kroki_url) = &self.diagrams_resolved.kroki_url {
            require_non_empty(kroki_url, "diagrams.kroki_url")?;
            require_http_url(kroki_url, "diagrams.kroki_url")?;
        }
        if self.diagrams_resolved.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "diagrams.timeout_secs must be greater than 0".to_owned(),
            ));
        }

        require_non_empty(&self.export.filename, "export.filename")?;
        require_positive(self.export.content_width_px, "export.content_width_px")?;
        require_positive(self.export.scale, "export.scale")?;
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.expand_with(|var| std::env::var(var).ok())
    }

    /// Expand `${VAR}` and `${VAR:-default}` in the fields naming URLs and
    /// paths, looking variables up with `lookup`.
    fn expand_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(url) = self.diagrams.as_mut().and_then(|d| d.kroki_url.as_mut()) {
            *url = expand_field(url, "diagrams.kroki_url", &lookup)?;
        }
        if let Some(file) = self.style.overrides_file.as_mut() {
            *file = expand_field(file, "style.overrides_file", &lookup)?;
        }
        self.export.filename = expand_field(&self.export.filename, "export.filename", &lookup)?;
        Ok(())
    }

    /// Resolve relative paths against the config directory and read the
    /// overrides file.
    fn resolve(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let overrides_file = self.style.overrides_file.as_deref().map(|file| config_dir.join(file));
        let mut overrides = self.style.overrides.clone().unwrap_or_default();
        if let Some(path) = &overrides_file {
            let file = std::fs::read_to_string(path)?;
            if !overrides.is_empty() && !overrides.ends_with('\n') {
                overrides.push('\n');
            }
            overrides.push_str(&file);
        }
        self.style_resolved = StyleConfig {
            overrides,
            overrides_file,
        };

        self.diagrams_resolved = match &self.diagrams {
            Some(diagrams) => {
                let kroki_url = diagrams.kroki_url.clone().ok_or_else(|| {
                    ConfigError::Validation("[diagrams] section requires kroki_url to be set".to_owned())
                })?;
                DiagramsConfig {
                    kroki_url: Some(kroki_url),
                    timeout: Duration::from_secs(diagrams.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
                    cache: diagrams.cache.unwrap_or(true),
                }
            }
            None => DiagramsConfig::default(),
        };

        Ok(())
    }

    /// Theme configuration: the preset's values with `[theme]` merged over
    /// them.
    pub fn theme_config(&self) -> Result<ThemeConfig, ConfigError> {
        let preset = self.theme.preset.as_deref().unwrap_or(DEFAULT_PRESET);
        let mut config = ThemeConfig::from_preset(preset)
            .map_err(|e| ConfigError::Validation(format!("theme.preset: {e}")))?;
        config.merge(&ThemePatch {
            preset: None,
            ..self.theme.clone()
        });
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use mdstyler_theme::PageSize;
    use pretty_assertions::assert_eq;

    use super::*;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILENAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_empty_file_is_valid() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_config(temp.path(), "");

        let config = Config::load(Some(&path), None).unwrap();
        assert_eq!(config.config_path, Some(path));
        assert_eq!(config.render, RenderConfig::default());
        assert_eq!(config.export, ExportConfig::default());
        assert_eq!(config.diagrams_resolved, DiagramsConfig::default());
        assert_eq!(config.theme_config().unwrap(), ThemeConfig::default());
    }

    #[test]
    fn test_full_config() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("custom.css"), ".preview-content p { margin: 0; }\n").unwrap();
        let path = write_config(
            temp.path(),
            r##"
[theme]
preset = "github-light"
font_size = 17
h2_color = "#ff0000"
page_size = "letter"

[style]
overrides = ".preview-content h1 { color: red; }"
overrides_file = "custom.css"

[render]
allow_raw_html = false

[diagrams]
kroki_url = "https://kroki.io"
timeout_secs = 5
cache = false

[export]
filename = "notes.pdf"
scale = 3.0
"##,
        );

        let config = Config::load(Some(&path), None).unwrap();
        let theme = config.theme_config().unwrap();
        assert_eq!(theme.preset, "github-light");
        assert!((theme.font_size - 17.0).abs() < f64::EPSILON);
        assert_eq!(theme.h2_color, "#ff0000");
        assert_eq!(theme.page_size, PageSize::Letter);

        assert_eq!(
            config.style_resolved.overrides,
            ".preview-content h1 { color: red; }\n.preview-content p { margin: 0; }\n"
        );
        assert_eq!(config.style_resolved.overrides_file, Some(temp.path().join("custom.css")));
        assert!(!config.render.render_options().allow_raw_html);
        assert_eq!(
            config.diagrams_resolved,
            DiagramsConfig {
                kroki_url: Some("https://kroki.io".to_owned()),
                timeout: Duration::from_secs(5),
                cache: false,
            }
        );
        assert_eq!(config.export.filename, "notes.pdf");
        assert!((config.export.scale - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_explicit_file() {
        let temp = tempfile::tempdir().unwrap();
        let result = Config::load(Some(&temp.path().join("nope.toml")), None);
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_discover_in_parent() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_config(temp.path(), "");
        let nested = temp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(Config::discover_from(&nested), Some(path));
    }

    #[test]
    fn test_unknown_preset() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_config(temp.path(), "[theme]\npreset = \"neon\"\n");
        let result = Config::load(Some(&path), None);
        assert!(matches!(result, Err(ConfigError::Validation(message)) if message.contains("neon")));
    }

    #[test]
    fn test_unknown_theme_field() {
        let result: Result<Config, _> = toml::from_str("[theme]\nfont_sise = 12\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_diagrams_section_requires_kroki_url() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_config(temp.path(), "[diagrams]\ntimeout_secs = 10\n");
        let result = Config::load(Some(&path), None);
        assert!(
            matches!(result, Err(ConfigError::Validation(message)) if message.contains("kroki_url"))
        );
    }

    #[test]
    fn test_invalid_values() {
        let temp = tempfile::tempdir().unwrap();

        let path = write_config(temp.path(), "[diagrams]\nkroki_url = \"kroki.io\"\n");
        assert!(matches!(Config::load(Some(&path), None), Err(ConfigError::Validation(_))));

        let path = write_config(temp.path(), "[export]\nscale = 0\n");
        assert!(matches!(Config::load(Some(&path), None), Err(ConfigError::Validation(_))));

        let path = write_config(temp.path(), "[export]\nfilename = \"\"\n");
        assert!(matches!(Config::load(Some(&path), None), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_missing_overrides_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_config(temp.path(), "[style]\noverrides_file = \"absent.css\"\n");
        assert!(matches!(Config::load(Some(&path), None), Err(ConfigError::Io(_))));
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_expand_env_vars() {
        let mut config: Config = toml::from_str(
            r#"
[style]
overrides_file = "${STYLE_DIR:-styles}/print.css"

[diagrams]
kroki_url = "https://${KROKI_HOST}"

[export]
filename = "${DOC_NAME}.pdf"
"#,
        )
        .unwrap();

        config
            .expand_with(lookup(&[("KROKI_HOST", "kroki.example.com"), ("DOC_NAME", "notes")]))
            .unwrap();
        assert_eq!(
            config.diagrams.and_then(|d| d.kroki_url).as_deref(),
            Some("https://kroki.example.com")
        );
        assert_eq!(config.style.overrides_file.as_deref(), Some("styles/print.css"));
        assert_eq!(config.export.filename, "notes.pdf");
    }

    #[test]
    fn test_missing_env_var_names_field() {
        let mut config: Config = toml::from_str("[export]\nfilename = \"${DOC_NAME}.pdf\"\n").unwrap();

        let err = config.expand_with(lookup(&[])).unwrap_err();
        assert!(matches!(&err, ConfigError::EnvVar { field, .. } if field == "export.filename"));
        assert!(err.to_string().contains("${DOC_NAME} is not set"), "{err}");
    }

    #[test]
    fn test_literal_dollar_unchanged() {
        let mut config: Config = toml::from_str("[export]\nfilename = \"$HOME-report.pdf\"\n").unwrap();
        config.expand_with(lookup(&[])).unwrap();
        assert_eq!(config.export.filename, "$HOME-report.pdf");
    }

    #[test]
    fn test_apply_cli_settings() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_config(temp.path(), "[theme]\npreset = \"nord\"\n");
        let settings = CliSettings {
            preset: Some("dracula".to_owned()),
            kroki_url: Some("http://localhost:8000".to_owned()),
            filename: Some("out.pdf".to_owned()),
        };

        let config = Config::load(Some(&path), Some(&settings)).unwrap();
        assert_eq!(config.theme_config().unwrap().preset, "dracula");
        assert_eq!(
            config.diagrams_resolved.kroki_url.as_deref(),
            Some("http://localhost:8000")
        );
        assert_eq!(config.export.filename, "out.pdf");
    }

    #[test]
    fn test_cli_preset_is_validated() {
        let temp = tempfile::tempdir().unwrap();
        let path = write_config(temp.path(), "");
        let settings = CliSettings {
            preset: Some("missing".to_owned()),
            ..CliSettings::default()
        };
        assert!(matches!(
            Config::load(Some(&path), Some(&settings)),
            Err(ConfigError::Validation(_))
        ));
    }
}
