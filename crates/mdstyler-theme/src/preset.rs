//! Built-in theme presets.
//!
//! Presets define palette and typography only. Page size and margins are
//! never part of a preset, so switching presets keeps the page geometry the
//! user picked.

use std::sync::LazyLock;

use crate::config::{CodeTheme, ThemePatch};

/// Preset applied at session start.
pub const DEFAULT_PRESET: &str = "tokyo-night";

const SERIF_FONT: &str = "\"Source Serif Pro\", Georgia, serif";
const SYSTEM_FONT: &str = "-apple-system, BlinkMacSystemFont, \"Segoe UI\", Roboto, sans-serif";

/// A named, immutable bundle of partial configuration values.
#[derive(Debug)]
pub struct ThemePreset {
    pub name: &'static str,
    pub label: &'static str,
    pub patch: ThemePatch,
}

/// Colors shared by every preset definition below, in config field order.
struct Palette {
    background: &'static str,
    text: &'static str,
    heading: &'static str,
    link: &'static str,
    code_background: &'static str,
    code: &'static str,
    blockquote_background: &'static str,
    blockquote_border: &'static str,
    headings: [&'static str; 6],
    code_theme: CodeTheme,
}

impl Palette {
    fn into_patch(self) -> ThemePatch {
        let [h1, h2, h3, h4, h5, h6] = self.headings.map(|c| Some(c.to_owned()));
        ThemePatch {
            background_color: Some(self.background.to_owned()),
            text_color: Some(self.text.to_owned()),
            heading_color: Some(self.heading.to_owned()),
            link_color: Some(self.link.to_owned()),
            code_background: Some(self.code_background.to_owned()),
            code_color: Some(self.code.to_owned()),
            blockquote_background: Some(self.blockquote_background.to_owned()),
            blockquote_border: Some(self.blockquote_border.to_owned()),
            h1_color: h1,
            h2_color: h2,
            h3_color: h3,
            h4_color: h4,
            h5_color: h5,
            h6_color: h6,
            code_theme: Some(self.code_theme),
            ..ThemePatch::default()
        }
    }
}

static PRESETS: LazyLock<Vec<ThemePreset>> = LazyLock::new(|| {
    vec![
        ThemePreset {
            name: "tokyo-night",
            label: "Tokyo Night",
            patch: Palette {
                background: "#1a1b26",
                text: "#a9b1d6",
                heading: "#c0caf5",
                link: "#7aa2f7",
                code_background: "#24283b",
                code: "#a9b1d6",
                blockquote_background: "#1f2335",
                blockquote_border: "#7aa2f7",
                headings: ["#ff9e64", "#9ece6a", "#7aa2f7", "#bb9af7", "#f7768e", "#7dcfff"],
                code_theme: CodeTheme::OneDark,
            }
            .into_patch(),
        },
        ThemePreset {
            name: "github-light",
            label: "GitHub Light",
            patch: ThemePatch {
                font_family: Some(SYSTEM_FONT.to_owned()),
                heading_font_family: Some(SYSTEM_FONT.to_owned()),
                ..Palette {
                    background: "#ffffff",
                    text: "#1f2328",
                    heading: "#1f2328",
                    link: "#0969da",
                    code_background: "#f6f8fa",
                    code: "#1f2328",
                    blockquote_background: "#ffffff",
                    blockquote_border: "#d0d7de",
                    headings: ["#1f2328", "#1f2328", "#1f2328", "#1f2328", "#1f2328", "#59636e"],
                    code_theme: CodeTheme::GithubDark,
                }
                .into_patch()
            },
        },
        ThemePreset {
            name: "github-dark",
            label: "GitHub Dark",
            patch: ThemePatch {
                font_family: Some(SYSTEM_FONT.to_owned()),
                heading_font_family: Some(SYSTEM_FONT.to_owned()),
                ..Palette {
                    background: "#0d1117",
                    text: "#e6edf3",
                    heading: "#e6edf3",
                    link: "#4493f8",
                    code_background: "#161b22",
                    code: "#e6edf3",
                    blockquote_background: "#0d1117",
                    blockquote_border: "#3d444d",
                    headings: ["#f0f6fc", "#f0f6fc", "#e6edf3", "#e6edf3", "#e6edf3", "#9198a1"],
                    code_theme: CodeTheme::GithubDark,
                }
                .into_patch()
            },
        },
        ThemePreset {
            name: "dracula",
            label: "Dracula",
            patch: Palette {
                background: "#282a36",
                text: "#f8f8f2",
                heading: "#f8f8f2",
                link: "#8be9fd",
                code_background: "#44475a",
                code: "#f8f8f2",
                blockquote_background: "#343746",
                blockquote_border: "#bd93f9",
                headings: ["#ff79c6", "#bd93f9", "#8be9fd", "#50fa7b", "#ffb86c", "#f1fa8c"],
                code_theme: CodeTheme::Dracula,
            }
            .into_patch(),
        },
        ThemePreset {
            name: "nord",
            label: "Nord",
            patch: Palette {
                background: "#2e3440",
                text: "#d8dee9",
                heading: "#eceff4",
                link: "#88c0d0",
                code_background: "#3b4252",
                code: "#e5e9f0",
                blockquote_background: "#3b4252",
                blockquote_border: "#81a1c1",
                headings: ["#88c0d0", "#81a1c1", "#5e81ac", "#a3be8c", "#ebcb8b", "#b48ead"],
                code_theme: CodeTheme::Nord,
            }
            .into_patch(),
        },
        ThemePreset {
            name: "one-dark",
            label: "One Dark",
            patch: Palette {
                background: "#282c34",
                text: "#abb2bf",
                heading: "#e6e6e6",
                link: "#61afef",
                code_background: "#21252b",
                code: "#abb2bf",
                blockquote_background: "#2c313a",
                blockquote_border: "#61afef",
                headings: ["#e06c75", "#e5c07b", "#61afef", "#c678dd", "#98c379", "#56b6c2"],
                code_theme: CodeTheme::OneDark,
            }
            .into_patch(),
        },
        ThemePreset {
            name: "solarized-light",
            label: "Solarized Light",
            patch: Palette {
                background: "#fdf6e3",
                text: "#657b83",
                heading: "#586e75",
                link: "#268bd2",
                code_background: "#eee8d5",
                code: "#586e75",
                blockquote_background: "#eee8d5",
                blockquote_border: "#b58900",
                headings: ["#cb4b16", "#b58900", "#268bd2", "#6c71c4", "#d33682", "#2aa198"],
                code_theme: CodeTheme::Monokai,
            }
            .into_patch(),
        },
        ThemePreset {
            name: "academic",
            label: "Academic",
            patch: ThemePatch {
                font_family: Some(SERIF_FONT.to_owned()),
                heading_font_family: Some(SERIF_FONT.to_owned()),
                font_size: Some(15.0),
                line_height: Some(1.6),
                h1_size: Some(2.0),
                h2_size: Some(1.6),
                h3_size: Some(1.3),
                ..Palette {
                    background: "#ffffff",
                    text: "#222222",
                    heading: "#111111",
                    link: "#1a4f8b",
                    code_background: "#f4f4f4",
                    code: "#333333",
                    blockquote_background: "#fafafa",
                    blockquote_border: "#999999",
                    headings: ["#111111", "#111111", "#222222", "#222222", "#333333", "#444444"],
                    code_theme: CodeTheme::GithubDark,
                }
                .into_patch()
            },
        },
    ]
});

/// All built-in presets, default first.
pub fn presets() -> &'static [ThemePreset] {
    &PRESETS
}

/// Look up a preset by name (case-insensitive).
pub fn find_preset(name: &str) -> Option<&'static ThemePreset> {
    PRESETS
        .iter()
        .find(|preset| preset.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::ThemeConfig;

    #[test]
    fn test_default_preset_is_first() {
        assert_eq!(presets()[0].name, DEFAULT_PRESET);
    }

    #[test]
    fn test_default_preset_matches_default_config() {
        let config = ThemeConfig::from_preset(DEFAULT_PRESET).unwrap();
        assert_eq!(config, ThemeConfig::default());
    }

    #[test]
    fn test_presets_never_define_page_geometry() {
        for preset in presets() {
            assert!(preset.patch.page_size.is_none(), "{}", preset.name);
            assert!(preset.patch.margin_top.is_none(), "{}", preset.name);
            assert!(preset.patch.margin_right.is_none(), "{}", preset.name);
            assert!(preset.patch.margin_bottom.is_none(), "{}", preset.name);
            assert!(preset.patch.margin_left.is_none(), "{}", preset.name);
        }
    }

    #[test]
    fn test_preset_names_are_unique() {
        let mut names: Vec<_> = presets().iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), presets().len());
    }

    #[test]
    fn test_find_preset_case_insensitive() {
        assert_eq!(find_preset("Dracula").map(|p| p.name), Some("dracula"));
        assert!(find_preset("missing").is_none());
    }

    #[test]
    fn test_academic_keeps_unset_sizes() {
        let config = ThemeConfig::from_preset("academic").unwrap();
        assert_eq!(config.h1_size, 2.0);
        assert_eq!(config.h4_size, 1.25);
        assert_eq!(config.font_size, 15.0);
    }
}
