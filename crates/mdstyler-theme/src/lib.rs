//! Theme model and style synthesis for mdstyler.
//!
//! A [`ThemeConfig`] is a flat record of typography, palette and page
//! geometry. Named [`ThemePreset`]s supply partial values that are merged
//! into a configuration, and [`synthesize`] turns a configuration plus
//! free-form user overrides into the style sheet shared by the preview,
//! the print document and the PDF export.
//!
//! # Example
//!
//! ```
//! use mdstyler_theme::{ThemeConfig, synthesize};
//!
//! let mut config = ThemeConfig::default();
//! config.apply_preset("github-light").unwrap();
//! let css = synthesize(&config, ".preview-content h1 { color: red; }");
//! assert!(css.ends_with(".preview-content h1 { color: red; }\n"));
//! ```

mod config;
mod preset;
mod synthesis;

pub use config::{CodeTheme, PageSize, ThemeConfig, ThemeError, ThemePatch, mm_to_pt};
pub use preset::{DEFAULT_PRESET, ThemePreset, find_preset, presets};
pub use synthesis::{CALLOUT_PALETTE, CONTAINER_ID, CONTENT_CLASS, synthesize};
