//! Style sheet synthesis.
//!
//! [`synthesize`] is a pure function of the configuration and the override
//! text. Each per-heading rule sits on its own line so that changing one
//! heading field touches exactly one line of output.

use std::fmt::Write;

use crate::ThemeConfig;

/// Class of the element that holds the rendered document.
pub const CONTENT_CLASS: &str = "preview-content";

/// Id of the container exposed to print and export.
pub const CONTAINER_ID: &str = "preview-container";

/// Fixed callout palettes, identical across all themes.
pub const CALLOUT_PALETTE: [(&str, &str); 5] = [
    ("note", "#7aa2f7"),
    ("tip", "#9ece6a"),
    ("important", "#bb9af7"),
    ("warning", "#ff9e64"),
    ("caution", "#f7768e"),
];

const ERROR_COLOR: &str = "#f7768e";
const MONO_FONT: &str = "'JetBrains Mono', 'Fira Code', Consolas, monospace";

/// Token colors for highlighted code spans (`hl-` class prefix).
const TOKEN_PALETTE: [(&str, &str); 5] = [
    (".hl-string", "#9ece6a"),
    (".hl-constant.hl-numeric", "#ff9e64"),
    (".hl-entity.hl-name.hl-function", "#7dcfff"),
    (".hl-storage.hl-type", "#bb9af7"),
    (".hl-entity.hl-name.hl-type", "#e0af68"),
];

/// Build the complete style sheet for `config`, with `overrides` appended
/// verbatim after every generated rule.
///
/// Generated declarations are not `!important`, so an override with equal
/// specificity wins by source order. Only the print color-fidelity
/// directives are marked important.
#[must_use]
pub fn synthesize(config: &ThemeConfig, overrides: &str) -> String {
    let mut css = String::with_capacity(6 * 1024 + overrides.len());

    write_base(&mut css, config);
    write_headings(&mut css, config);
    write_links(&mut css, config);
    write_code(&mut css, config);
    write_blockquotes(&mut css, config);
    write_tables(&mut css, config);
    write_lists(&mut css, config);
    write_media(&mut css, config);
    write_callouts(&mut css);
    write_diagrams(&mut css, config);
    write_math(&mut css, config);
    write_print(&mut css, config);

    if !overrides.is_empty() {
        css.push_str("\n/* Custom overrides */\n");
        css.push_str(overrides);
        if !overrides.ends_with('\n') {
            css.push('\n');
        }
    }

    css
}

fn write_base(css: &mut String, config: &ThemeConfig) {
    let _ = write!(
        css,
        ".{CONTENT_CLASS} {{
  font-family: {font};
  font-size: {size}px;
  line-height: {line_height};
  background-color: {background};
  color: {text};
  padding: {top}mm {right}mm {bottom}mm {left}mm;
  min-height: 100%;
}}
",
        font = config.font_family,
        size = config.font_size,
        line_height = config.line_height,
        background = config.background_color,
        text = config.text_color,
        top = config.margin_top,
        right = config.margin_right,
        bottom = config.margin_bottom,
        left = config.margin_left,
    );
}

fn write_headings(css: &mut String, config: &ThemeConfig) {
    let selectors: Vec<String> = (1..=6).map(|level| format!(".{CONTENT_CLASS} h{level}")).collect();
    let _ = write!(
        css,
        "
{selectors} {{
  font-family: {font};
  margin-top: 1.5em;
  margin-bottom: 0.5em;
  font-weight: 600;
}}
",
        selectors = selectors.join(",\n"),
        font = config.heading_font_family,
    );

    for level in 1..=6u8 {
        let _ = writeln!(
            css,
            ".{CONTENT_CLASS} h{level} {{ font-size: {size}em; color: {color}; }}",
            size = config.heading_size(level),
            color = config.heading_level_color(level),
        );
    }
}

fn write_links(css: &mut String, config: &ThemeConfig) {
    let _ = write!(
        css,
        "
.{CONTENT_CLASS} a {{
  color: {link};
  text-decoration: underline;
  text-underline-offset: 2px;
}}

.{CONTENT_CLASS} a:hover {{
  opacity: 0.8;
}}
",
        link = config.link_color,
    );
}

fn write_code(css: &mut String, config: &ThemeConfig) {
    let _ = write!(
        css,
        "
.{CONTENT_CLASS} code {{
  font-family: {MONO_FONT};
  background-color: {code_bg};
  color: {code};
  padding: 0.2em 0.4em;
  border-radius: 4px;
  font-size: 0.9em;
}}

.{CONTENT_CLASS} pre {{
  background-color: {code_bg};
  border-radius: 8px;
  padding: 1em;
  overflow-x: auto;
  margin: 1em 0;
}}

.{CONTENT_CLASS} pre code {{
  background: none;
  padding: 0;
  font-size: 0.875em;
  line-height: 1.6;
}}

.{CONTENT_CLASS} .hl-comment {{
  opacity: 0.6;
  font-style: italic;
}}

.{CONTENT_CLASS} .hl-keyword,
.{CONTENT_CLASS} .hl-storage {{
  color: {link};
}}
",
        code_bg = config.code_background,
        code = config.code_color,
        link = config.link_color,
    );
    for (selector, color) in TOKEN_PALETTE {
        let _ = writeln!(css, ".{CONTENT_CLASS} {selector} {{ color: {color}; }}");
    }
}

fn write_blockquotes(css: &mut String, config: &ThemeConfig) {
    let _ = write!(
        css,
        "
.{CONTENT_CLASS} blockquote {{
  background-color: {background};
  border-left: 4px solid {border};
  margin: 1em 0;
  padding: 0.5em 1em;
  border-radius: 0 4px 4px 0;
}}

.{CONTENT_CLASS} blockquote p {{
  margin: 0.5em 0;
}}
",
        background = config.blockquote_background,
        border = config.blockquote_border,
    );
}

fn write_tables(css: &mut String, config: &ThemeConfig) {
    let _ = write!(
        css,
        "
.{CONTENT_CLASS} table {{
  width: 100%;
  border-collapse: collapse;
  margin: 1em 0;
}}

.{CONTENT_CLASS} th,
.{CONTENT_CLASS} td {{
  border: 1px solid {border}40;
  padding: 0.5em 1em;
  text-align: left;
}}

.{CONTENT_CLASS} th {{
  background-color: {code_bg};
  font-weight: 600;
}}

.{CONTENT_CLASS} tr:nth-child(even) {{
  background-color: {code_bg}40;
}}
",
        border = config.blockquote_border,
        code_bg = config.code_background,
    );
}

fn write_lists(css: &mut String, config: &ThemeConfig) {
    let _ = write!(
        css,
        "
.{CONTENT_CLASS} ul,
.{CONTENT_CLASS} ol {{
  padding-left: 1.5em;
  margin: 0.5em 0;
}}

.{CONTENT_CLASS} li {{
  margin: 0.25em 0;
}}

.{CONTENT_CLASS} li::marker {{
  color: {link};
}}

.{CONTENT_CLASS} input[type=\"checkbox\"] {{
  margin-right: 0.5em;
  accent-color: {link};
}}

.{CONTENT_CLASS} li.task-list-item {{
  list-style: none;
}}
",
        link = config.link_color,
    );
}

fn write_media(css: &mut String, config: &ThemeConfig) {
    let _ = write!(
        css,
        "
.{CONTENT_CLASS} hr {{
  border: none;
  border-top: 1px solid {border}40;
  margin: 2em 0;
}}

.{CONTENT_CLASS} img {{
  max-width: 100%;
  height: auto;
  border-radius: 8px;
  margin: 1em 0;
}}

.{CONTENT_CLASS} .footnotes {{
  border-top: 1px solid {border}40;
  margin-top: 2em;
  font-size: 0.9em;
}}
",
        border = config.blockquote_border,
    );
}

fn write_callouts(css: &mut String) {
    let _ = write!(
        css,
        "
/* Callouts */
.{CONTENT_CLASS} .callout {{
  border-radius: 4px;
  padding: 1em;
  margin: 1em 0;
}}
"
    );
    for (kind, color) in CALLOUT_PALETTE {
        let _ = writeln!(
            css,
            ".{CONTENT_CLASS} .callout-{kind} {{ background-color: {color}20; border-left-color: {color}; }}"
        );
    }
}

fn write_diagrams(css: &mut String, config: &ThemeConfig) {
    let _ = write!(
        css,
        "
/* Diagrams */
.{CONTENT_CLASS} .diagram {{
  background-color: {code_bg};
  border-radius: 8px;
  padding: 1em;
  margin: 1em 0;
  text-align: center;
}}

.{CONTENT_CLASS} .diagram svg {{
  max-width: 100%;
  height: auto;
}}

.{CONTENT_CLASS} .diagram-error {{
  background-color: {ERROR_COLOR}20;
  border: 1px solid {ERROR_COLOR};
  color: {ERROR_COLOR};
  padding: 1em;
  border-radius: 8px;
  margin: 1em 0;
  font-family: monospace;
  font-size: 0.9em;
}}
",
        code_bg = config.code_background,
    );
}

fn write_math(css: &mut String, config: &ThemeConfig) {
    let _ = write!(
        css,
        "
/* Math */
.{CONTENT_CLASS} .math-display {{
  display: block;
  margin: 1em 0;
  overflow-x: auto;
  overflow-y: hidden;
}}

.{CONTENT_CLASS} .math-error {{
  color: {ERROR_COLOR};
  font-family: {MONO_FONT};
  background-color: {code_bg};
}}
",
        code_bg = config.code_background,
    );
}

fn write_print(css: &mut String, config: &ThemeConfig) {
    let _ = write!(
        css,
        "
/* Print */
@media print {{
  @page {{
    size: {size};
    margin: 0;
  }}

  html, body {{
    height: auto !important;
    overflow: visible !important;
  }}

  .{CONTENT_CLASS} {{
    position: relative !important;
    width: 100% !important;
    height: auto !important;
    overflow: visible !important;
    background-color: {background} !important;
    -webkit-print-color-adjust: exact !important;
    print-color-adjust: exact !important;
    color-adjust: exact !important;
  }}

  .{CONTENT_CLASS} * {{
    -webkit-print-color-adjust: exact !important;
    print-color-adjust: exact !important;
    color-adjust: exact !important;
  }}
}}
",
        size = config.page_size.css_size(),
        background = config.background_color,
    );
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{PageSize, ThemePatch};

    fn changed_lines(a: &str, b: &str) -> Vec<(String, String)> {
        assert_eq!(a.lines().count(), b.lines().count());
        a.lines()
            .zip(b.lines())
            .filter(|(x, y)| x != y)
            .map(|(x, y)| (x.to_owned(), y.to_owned()))
            .collect()
    }

    #[test]
    fn test_synthesize_is_deterministic() {
        let config = ThemeConfig::default();
        let overrides = ".preview-content p { margin: 0; }";
        assert_eq!(synthesize(&config, overrides), synthesize(&config, overrides));
    }

    #[test]
    fn test_heading_rules_one_per_line() {
        let css = synthesize(&ThemeConfig::default(), "");
        assert!(css.contains(".preview-content h1 { font-size: 2.5em; color: #ff9e64; }\n"));
        assert!(css.contains(".preview-content h2 { font-size: 2em; color: #9ece6a; }\n"));
        assert!(css.contains(".preview-content h6 { font-size: 1em; color: #7dcfff; }\n"));
    }

    #[test]
    fn test_changing_h2_color_touches_only_h2_rule() {
        let before = ThemeConfig::default();
        let mut after = before.clone();
        after.merge(&ThemePatch {
            h2_color: Some("#123456".to_owned()),
            ..Default::default()
        });

        let diff = changed_lines(&synthesize(&before, ""), &synthesize(&after, ""));
        assert_eq!(
            diff,
            vec![(
                ".preview-content h2 { font-size: 2em; color: #9ece6a; }".to_owned(),
                ".preview-content h2 { font-size: 2em; color: #123456; }".to_owned(),
            )]
        );
    }

    #[test]
    fn test_changing_h4_size_touches_only_h4_rule() {
        let before = ThemeConfig::default();
        let after = ThemeConfig {
            h4_size: 1.3,
            ..before.clone()
        };

        let diff = changed_lines(&synthesize(&before, ""), &synthesize(&after, ""));
        assert_eq!(diff.len(), 1);
        assert!(diff[0].1.starts_with(".preview-content h4 {"));
    }

    #[test]
    fn test_overrides_appended_last_verbatim() {
        let overrides = ".preview-content h1 { color: red; }";
        let css = synthesize(&ThemeConfig::default(), overrides);
        assert!(css.ends_with("/* Custom overrides */\n.preview-content h1 { color: red; }\n"));
        let generated = css.find(".preview-content h1 { font-size").unwrap();
        let custom = css.rfind(overrides).unwrap();
        assert!(generated < custom);
    }

    #[test]
    fn test_no_overrides_no_marker() {
        let css = synthesize(&ThemeConfig::default(), "");
        assert!(!css.contains("Custom overrides"));
    }

    #[test]
    fn test_page_size_in_print_block() {
        for size in PageSize::ALL {
            let config = ThemeConfig {
                page_size: size,
                ..Default::default()
            };
            let css = synthesize(&config, "");
            let expected = format!("@media print {{\n  @page {{\n    size: {};", size.css_size());
            assert!(css.contains(&expected), "{size:?}");
        }
    }

    #[test]
    fn test_print_forces_exact_colors() {
        let css = synthesize(&ThemeConfig::default(), "");
        let print = &css[css.find("@media print").unwrap()..];
        assert!(print.contains("print-color-adjust: exact !important;"));
        assert!(print.contains("background-color: #1a1b26 !important;"));
    }

    #[test]
    fn test_table_colors_derive_from_blockquote_border() {
        let config = ThemeConfig {
            blockquote_border: "#abcdef".to_owned(),
            code_background: "#010203".to_owned(),
            ..Default::default()
        };
        let css = synthesize(&config, "");
        assert!(css.contains("border: 1px solid #abcdef40;"));
        assert!(css.contains("tr:nth-child(even) {\n  background-color: #01020340;"));
    }

    #[test]
    fn test_callout_palettes_fixed_across_themes() {
        let light = ThemeConfig::from_preset("github-light").unwrap();
        let dark = ThemeConfig::from_preset("dracula").unwrap();
        let callouts = |css: &str| -> Vec<String> {
            css.lines()
                .filter(|line| line.contains(".callout-"))
                .map(str::to_owned)
                .collect()
        };
        let light_rules = callouts(&synthesize(&light, ""));
        assert_eq!(light_rules.len(), 5);
        assert_eq!(light_rules, callouts(&synthesize(&dark, "")));
        assert!(light_rules[3].contains("background-color: #ff9e6420;"));
    }

    #[test]
    fn test_invalid_values_passed_through() {
        let config = ThemeConfig {
            text_color: "not-a-color".to_owned(),
            font_family: "}{".to_owned(),
            ..Default::default()
        };
        let css = synthesize(&config, "");
        assert!(css.contains("color: not-a-color;"));
        assert!(css.contains("font-family: }{;"));
    }

    #[test]
    fn test_margins_become_padding() {
        let config = ThemeConfig {
            margin_top: 10.0,
            margin_right: 12.5,
            margin_bottom: 10.0,
            margin_left: 12.5,
            ..Default::default()
        };
        let css = synthesize(&config, "");
        assert!(css.contains("padding: 10mm 12.5mm 10mm 12.5mm;"));
    }

    #[test]
    fn test_diagram_background_tracks_code_background() {
        let config = ThemeConfig {
            code_background: "#333333".to_owned(),
            ..Default::default()
        };
        let css = synthesize(&config, "");
        assert!(css.contains(".preview-content .diagram {\n  background-color: #333333;"));
    }
}
