//! Page setup for pagination.

use mdstyler_surface::Rgba;
use mdstyler_theme::{PageSize, ThemeConfig, mm_to_pt};

/// Default name of the exported file.
pub const DEFAULT_FILENAME: &str = "markdown-styled.pdf";

/// Fixed width of the off-screen layout, in CSS pixels.
pub const DEFAULT_CONTENT_WIDTH: f64 = 1000.0;

/// Default raster scale factor.
pub const DEFAULT_SCALE: f64 = 2.0;

/// Elements kept on one page when possible.
pub const DEFAULT_AVOID_SELECTORS: [&str; 10] = [
    "pre",
    "blockquote",
    "table",
    "img",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
];

/// Elements that start a new page.
pub const BREAK_BEFORE_SELECTOR: &str = ".page-break-before";

/// Elements after which a new page starts.
pub const BREAK_AFTER_SELECTOR: &str = ".page-break-after";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Everything the paginator needs besides the document itself.
#[derive(Clone, Debug, PartialEq)]
pub struct PaginationOptions {
    pub page_size: PageSize,
    pub orientation: Orientation,
    /// Top, right, bottom, left in millimetres.
    pub margins_mm: [f64; 4],
    /// Raster scale factor, recorded in the document info.
    pub scale: f64,
    /// Width the document is laid out at before scaling to the page.
    pub content_width_px: f64,
    pub avoid_selectors: Vec<String>,
    /// Page fill behind the content. Config values are kept verbatim.
    pub background_color: String,
    pub text_color: String,
    pub title: Option<String>,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self::from_config(&ThemeConfig::default())
    }
}

impl PaginationOptions {
    /// Page geometry and colors taken from a theme configuration.
    pub fn from_config(config: &ThemeConfig) -> Self {
        Self {
            page_size: config.page_size,
            orientation: Orientation::Portrait,
            margins_mm: config.margins_mm(),
            scale: DEFAULT_SCALE,
            content_width_px: DEFAULT_CONTENT_WIDTH,
            avoid_selectors: DEFAULT_AVOID_SELECTORS.iter().map(|s| (*s).to_owned()).collect(),
            background_color: config.background_color.clone(),
            text_color: config.text_color.clone(),
            title: None,
        }
    }

    /// Page width and height in points, after orientation.
    pub fn page_dimensions_pt(&self) -> (f64, f64) {
        let (width, height) = self.page_size.dimensions_pt();
        match self.orientation {
            Orientation::Portrait => (width, height),
            Orientation::Landscape => (height, width),
        }
    }

    /// Margins in points: top, right, bottom, left.
    pub fn margins_pt(&self) -> [f64; 4] {
        self.margins_mm.map(mm_to_pt)
    }

    /// Page fill color; white when the configured value is not a color.
    pub fn page_background(&self) -> Rgba {
        Rgba::parse(&self.background_color)
            .filter(|color| !color.is_transparent())
            .map_or(Rgba::WHITE, |color| color.over(Rgba::WHITE))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_from_config() {
        let config = ThemeConfig {
            page_size: PageSize::Letter,
            margin_top: 10.0,
            margin_right: 12.0,
            margin_bottom: 14.0,
            margin_left: 16.0,
            ..ThemeConfig::default()
        };

        let options = PaginationOptions::from_config(&config);

        assert_eq!(options.margins_mm, [10.0, 12.0, 14.0, 16.0]);
        assert_eq!(options.page_dimensions_pt(), (612.0, 792.0));
        assert_eq!(options.scale, 2.0);
        assert_eq!(options.content_width_px, 1000.0);
        assert_eq!(options.avoid_selectors.len(), 10);
    }

    #[test]
    fn test_landscape_swaps_dimensions() {
        let options = PaginationOptions {
            page_size: PageSize::Legal,
            orientation: Orientation::Landscape,
            ..PaginationOptions::default()
        };
        assert_eq!(options.page_dimensions_pt(), (1008.0, 612.0));
    }

    #[test]
    fn test_page_background_fallback() {
        let options = PaginationOptions {
            background_color: "not a color".to_owned(),
            ..PaginationOptions::default()
        };
        assert_eq!(options.page_background(), Rgba::WHITE);

        let options = PaginationOptions {
            background_color: "#1a1b26".to_owned(),
            ..PaginationOptions::default()
        };
        assert_eq!(options.page_background(), Rgba::rgb(0x1a, 0x1b, 0x26));
    }
}
