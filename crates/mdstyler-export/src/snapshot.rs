//! Computed-style snapshot and page-break policy.
//!
//! The export copy is laid out away from the live preview, so every value
//! the paginator depends on is written back onto the elements as an
//! explicit inline declaration.

use mdstyler_surface::{ComputedStyle, ComputedStyles, LineHeight, NodeId, Rgba, Surface, SurfaceError};

/// Elements that must not be split across pages.
pub const AVOID_INSIDE_TAGS: [&str; 5] = ["pre", "blockquote", "table", "img", "figure"];

/// Elements that must stay with the content that follows them.
pub const KEEP_WITH_NEXT_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Write the computed colors, box sizing and text metrics of every element
/// below `root` as inline styles. Returns the number of elements touched.
pub fn snapshot_styles(surface: &mut Surface, root: NodeId, styles: &ComputedStyles) -> Result<usize, SurfaceError> {
    let elements = elements_below(surface, root);
    let mut touched = 0;
    for id in elements {
        let Some(style) = styles.get(id) else {
            continue;
        };
        for (name, value) in snapshot_values(style) {
            surface.set_style_property(id, name, &value)?;
        }
        touched += 1;
    }
    Ok(touched)
}

fn snapshot_values(style: &ComputedStyle) -> Vec<(&'static str, String)> {
    let mut values = vec![
        ("color", style.color.to_string()),
        ("border-color", border_color(&style.border_color)),
    ];
    if !style.background_color.is_transparent() {
        values.push(("background-color", style.background_color.to_string()));
    }
    values.push(("box-sizing", "border-box".to_owned()));
    values.push(("font-size", format!("{}px", round(style.font_size))));
    values.push(("font-weight", style.font_weight.to_string()));
    values.push(("font-family", style.font_family.clone()));
    if !matches!(style.line_height, LineHeight::Normal) {
        values.push(("line-height", format!("{}px", round(style.line_height_px()))));
    }
    values.push(("text-align", style.text_align.as_str().to_owned()));
    values
}

fn border_color(sides: &[Rgba; 4]) -> String {
    if sides.iter().all(|side| *side == sides[0]) {
        sides[0].to_string()
    } else {
        sides.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
    }
}

fn round(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mark unsplittable blocks and headings for the paginator.
pub fn apply_break_policy(surface: &mut Surface, root: NodeId) -> Result<(), SurfaceError> {
    for id in elements_below(surface, root) {
        let Some(tag) = surface.tag(id).map(str::to_ascii_lowercase) else {
            continue;
        };
        if AVOID_INSIDE_TAGS.contains(&tag.as_str()) {
            surface.set_style_property(id, "page-break-inside", "avoid")?;
            surface.set_style_property(id, "break-inside", "avoid")?;
            surface.set_style_property(id, "display", "block")?;
            surface.set_style_property(id, "position", "relative")?;
        } else if KEEP_WITH_NEXT_TAGS.contains(&tag.as_str()) {
            surface.set_style_property(id, "page-break-after", "avoid")?;
            surface.set_style_property(id, "break-after", "avoid")?;
        }
    }
    Ok(())
}

fn elements_below(surface: &Surface, root: NodeId) -> Vec<NodeId> {
    surface
        .descendants(root)
        .into_iter()
        .filter(|&id| surface.is_element(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use mdstyler_renderer::parse_fragment;
    use mdstyler_surface::{Media, StyleResolver, Stylesheet};
    use pretty_assertions::assert_eq;

    use super::*;

    fn detached(html: &str) -> (Surface, NodeId) {
        let mut surface = Surface::new();
        let root = surface.create_element("div", vec![("class".to_owned(), "preview-content".to_owned())]);
        surface.append_markup(root, &parse_fragment(html).unwrap()).unwrap();
        let document = surface.document();
        surface.append_child(document, root).unwrap();
        (surface, root)
    }

    #[test]
    fn test_snapshot_writes_computed_values() {
        let (mut surface, root) = detached("<blockquote><p>Quote</p></blockquote>");
        let sheet = Stylesheet::parse(
            ".preview-content { color: #c0caf5; font-size: 16px; line-height: 1.5; }
             .preview-content blockquote { background-color: #24283b; border-left: 4px solid #7aa2f7; }",
        );
        let styles = StyleResolver::new(Media::Screen)
            .with_stylesheet(sheet)
            .resolve(&surface, root);

        let touched = snapshot_styles(&mut surface, root, &styles).unwrap();
        assert_eq!(touched, 2);

        let quote = surface.select(root, "blockquote").unwrap()[0];
        let style = surface.attr(quote, "style").unwrap();
        assert!(style.contains("color: rgb(192, 202, 245);"), "{style}");
        assert!(style.contains("background-color: rgb(36, 40, 59);"), "{style}");
        assert!(style.contains("box-sizing: border-box;"), "{style}");
        assert!(style.contains("line-height: 24px;"), "{style}");

        let paragraph = surface.select(root, "p").unwrap()[0];
        let style = surface.attr(paragraph, "style").unwrap();
        assert!(!style.contains("background-color"), "{style}");

        // Snapshotted values survive without the author sheet.
        let plain = StyleResolver::new(Media::Screen).resolve(&surface, root);
        assert_eq!(plain.get(quote).unwrap().background_color, Rgba::rgb(36, 40, 59));
        assert_eq!(plain.get(paragraph).unwrap().color, Rgba::rgb(192, 202, 245));
    }

    #[test]
    fn test_border_color_sides() {
        let sides = [Rgba::BLACK, Rgba::WHITE, Rgba::BLACK, Rgba::WHITE];
        assert_eq!(
            border_color(&sides),
            "rgb(0, 0, 0) rgb(255, 255, 255) rgb(0, 0, 0) rgb(255, 255, 255)"
        );
        assert_eq!(border_color(&[Rgba::BLACK; 4]), "rgb(0, 0, 0)");
    }

    #[test]
    fn test_break_policy() {
        let (mut surface, root) = detached("<h2>Title</h2><pre><code>x</code></pre><table><tr><td>1</td></tr></table><p>p</p>");

        apply_break_policy(&mut surface, root).unwrap();
        let styles = StyleResolver::new(Media::Print).resolve(&surface, root);

        let get = |selector: &str| styles.get(surface.select(root, selector).unwrap()[0]).unwrap();
        assert!(get("h2").break_after_avoid);
        assert!(!get("h2").break_inside_avoid);
        assert!(get("pre").break_inside_avoid);
        assert!(get("table").break_inside_avoid);
        assert!(!get("p").break_inside_avoid);
        assert!(!get("p").break_after_avoid);
    }
}
