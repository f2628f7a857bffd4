//! Theme configuration record and partial updates.

use serde::{Deserialize, Serialize};

const MM_PER_INCH: f64 = 25.4;
const PT_PER_INCH: f64 = 72.0;

const DEFAULT_FONT: &str = "Inter, -apple-system, BlinkMacSystemFont, sans-serif";

/// Errors raised when manipulating a theme configuration.
#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("Unknown theme preset: {0}")]
    UnknownPreset(String),
}

/// Physical page format used for print and export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Legal,
}

impl PageSize {
    /// All page sizes in display order.
    pub const ALL: [Self; 3] = [Self::A4, Self::Letter, Self::Legal];

    /// Value of the `size` descriptor inside `@page`.
    #[must_use]
    pub fn css_size(self) -> &'static str {
        match self {
            Self::A4 => "210mm 297mm",
            Self::Letter => "8.5in 11in",
            Self::Legal => "8.5in 14in",
        }
    }

    /// Portrait width and height in millimetres.
    #[must_use]
    pub fn dimensions_mm(self) -> (f64, f64) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::Letter => (8.5 * MM_PER_INCH, 11.0 * MM_PER_INCH),
            Self::Legal => (8.5 * MM_PER_INCH, 14.0 * MM_PER_INCH),
        }
    }

    /// Portrait width and height in PDF points.
    ///
    /// Letter and Legal are computed from inches so they come out as the
    /// exact integers 612×792 and 612×1008.
    #[must_use]
    pub fn dimensions_pt(self) -> (f64, f64) {
        match self {
            Self::A4 => (mm_to_pt(210.0), mm_to_pt(297.0)),
            Self::Letter => (8.5 * PT_PER_INCH, 11.0 * PT_PER_INCH),
            Self::Legal => (8.5 * PT_PER_INCH, 14.0 * PT_PER_INCH),
        }
    }

    /// Short label for user-facing listings.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::A4 => "A4",
            Self::Letter => "US Letter",
            Self::Legal => "US Legal",
        }
    }
}

/// Convert millimetres to PDF points.
#[must_use]
pub fn mm_to_pt(mm: f64) -> f64 {
    mm / MM_PER_INCH * PT_PER_INCH
}

/// Code highlight theme identifier.
///
/// Carried in the configuration for collaborators; style synthesis does not
/// read it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodeTheme {
    GithubDark,
    Monokai,
    Dracula,
    #[default]
    OneDark,
    Nord,
}

/// Complete theme configuration.
///
/// Every field has a default (the `tokyo-night` preset with A4 pages and
/// 20mm margins). Values are never validated: malformed colors or fonts are
/// passed to style synthesis verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub preset: String,

    pub font_family: String,
    /// Body font size in pixels.
    pub font_size: f64,
    pub line_height: f64,

    pub heading_font_family: String,
    /// Heading sizes as multiples of the body font size (`em`).
    pub h1_size: f64,
    pub h2_size: f64,
    pub h3_size: f64,
    pub h4_size: f64,
    pub h5_size: f64,
    pub h6_size: f64,

    pub background_color: String,
    pub text_color: String,
    /// Reserved. Per-level heading colors are what style synthesis uses.
    pub heading_color: String,
    pub link_color: String,
    pub code_background: String,
    pub code_color: String,
    pub blockquote_background: String,
    pub blockquote_border: String,

    pub h1_color: String,
    pub h2_color: String,
    pub h3_color: String,
    pub h4_color: String,
    pub h5_color: String,
    pub h6_color: String,

    pub page_size: PageSize,
    /// Page margins in millimetres.
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,

    /// Reserved.
    pub code_theme: CodeTheme,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            preset: crate::DEFAULT_PRESET.to_owned(),
            font_family: DEFAULT_FONT.to_owned(),
            font_size: 16.0,
            line_height: 1.7,
            heading_font_family: DEFAULT_FONT.to_owned(),
            h1_size: 2.5,
            h2_size: 2.0,
            h3_size: 1.5,
            h4_size: 1.25,
            h5_size: 1.1,
            h6_size: 1.0,
            background_color: "#1a1b26".to_owned(),
            text_color: "#a9b1d6".to_owned(),
            heading_color: "#c0caf5".to_owned(),
            link_color: "#7aa2f7".to_owned(),
            code_background: "#24283b".to_owned(),
            code_color: "#a9b1d6".to_owned(),
            blockquote_background: "#1f2335".to_owned(),
            blockquote_border: "#7aa2f7".to_owned(),
            h1_color: "#ff9e64".to_owned(),
            h2_color: "#9ece6a".to_owned(),
            h3_color: "#7aa2f7".to_owned(),
            h4_color: "#bb9af7".to_owned(),
            h5_color: "#f7768e".to_owned(),
            h6_color: "#7dcfff".to_owned(),
            page_size: PageSize::A4,
            margin_top: 20.0,
            margin_right: 20.0,
            margin_bottom: 20.0,
            margin_left: 20.0,
            code_theme: CodeTheme::OneDark,
        }
    }
}

impl ThemeConfig {
    /// Font size multiplier for heading `level` (1-6).
    ///
    /// Levels outside the range are clamped.
    #[must_use]
    pub fn heading_size(&self, level: u8) -> f64 {
        match level {
            0 | 1 => self.h1_size,
            2 => self.h2_size,
            3 => self.h3_size,
            4 => self.h4_size,
            5 => self.h5_size,
            _ => self.h6_size,
        }
    }

    /// Color for heading `level` (1-6). Levels outside the range are clamped.
    #[must_use]
    pub fn heading_level_color(&self, level: u8) -> &str {
        match level {
            0 | 1 => &self.h1_color,
            2 => &self.h2_color,
            3 => &self.h3_color,
            4 => &self.h4_color,
            5 => &self.h5_color,
            _ => &self.h6_color,
        }
    }

    /// Margins as `[top, right, bottom, left]` in millimetres.
    #[must_use]
    pub fn margins_mm(&self) -> [f64; 4] {
        [
            self.margin_top,
            self.margin_right,
            self.margin_bottom,
            self.margin_left,
        ]
    }

    /// Shallow-merge a partial update; fields absent from `patch` are kept.
    pub fn merge(&mut self, patch: &ThemePatch) {
        macro_rules! merge_fields {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(value) = &patch.$field {
                        self.$field = value.clone();
                    }
                )*
            };
        }

        merge_fields!(
            preset,
            font_family,
            font_size,
            line_height,
            heading_font_family,
            h1_size,
            h2_size,
            h3_size,
            h4_size,
            h5_size,
            h6_size,
            background_color,
            text_color,
            heading_color,
            link_color,
            code_background,
            code_color,
            blockquote_background,
            blockquote_border,
            h1_color,
            h2_color,
            h3_color,
            h4_color,
            h5_color,
            h6_color,
            page_size,
            margin_top,
            margin_right,
            margin_bottom,
            margin_left,
            code_theme,
        );
    }

    /// Apply the named preset, keeping every field the preset does not
    /// define (page size and margins in particular).
    pub fn apply_preset(&mut self, name: &str) -> Result<(), ThemeError> {
        let preset =
            crate::find_preset(name).ok_or_else(|| ThemeError::UnknownPreset(name.to_owned()))?;
        self.merge(&preset.patch);
        self.preset = preset.name.to_owned();
        Ok(())
    }

    /// Configuration initialized from a named preset.
    pub fn from_preset(name: &str) -> Result<Self, ThemeError> {
        let mut config = Self::default();
        config.apply_preset(name)?;
        Ok(config)
    }
}

/// Partial theme configuration.
///
/// Used both for presets and for field-by-field updates coming from the
/// settings collaborator or the `[theme]` table of `mdstyler.toml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemePatch {
    pub preset: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub line_height: Option<f64>,
    pub heading_font_family: Option<String>,
    pub h1_size: Option<f64>,
    pub h2_size: Option<f64>,
    pub h3_size: Option<f64>,
    pub h4_size: Option<f64>,
    pub h5_size: Option<f64>,
    pub h6_size: Option<f64>,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    pub heading_color: Option<String>,
    pub link_color: Option<String>,
    pub code_background: Option<String>,
    pub code_color: Option<String>,
    pub blockquote_background: Option<String>,
    pub blockquote_border: Option<String>,
    pub h1_color: Option<String>,
    pub h2_color: Option<String>,
    pub h3_color: Option<String>,
    pub h4_color: Option<String>,
    pub h5_color: Option<String>,
    pub h6_color: Option<String>,
    pub page_size: Option<PageSize>,
    pub margin_top: Option<f64>,
    pub margin_right: Option<f64>,
    pub margin_bottom: Option<f64>,
    pub margin_left: Option<f64>,
    pub code_theme: Option<CodeTheme>,
}
