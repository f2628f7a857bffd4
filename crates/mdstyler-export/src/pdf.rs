//! PDF page assembly.

use std::collections::HashSet;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use mdstyler_surface::{ComputedStyles, NodeId, Rgba, SelectorList, Surface};

use crate::error::ExportError;
use crate::layout::{BreakHints, Decoration, Flow, Font, TextLine, layout};
use crate::options::{BREAK_AFTER_SELECTOR, BREAK_BEFORE_SELECTOR, PaginationOptions};
use crate::paginate::page_starts;

/// A self-styled document ready to be split into pages.
#[derive(Clone, Copy)]
pub struct PaginationInput<'a> {
    pub surface: &'a Surface,
    pub root: NodeId,
    pub styles: &'a ComputedStyles,
}

/// Output of a paginator.
#[derive(Clone, Debug)]
pub struct PaginatedDocument {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// Turns a styled document into a paginated artifact.
pub trait Paginator: Send + Sync {
    fn paginate(
        &self,
        input: &PaginationInput<'_>,
        options: &PaginationOptions,
    ) -> Result<PaginatedDocument, ExportError>;
}

/// Lays the document out at the content width and writes vector PDF pages.
#[derive(Clone, Copy, Debug, Default)]
pub struct PdfPaginator;

impl Paginator for PdfPaginator {
    fn paginate(
        &self,
        input: &PaginationInput<'_>,
        options: &PaginationOptions,
    ) -> Result<PaginatedDocument, ExportError> {
        let (page_width, page_height) = options.page_dimensions_pt();
        let [margin_top, margin_right, margin_bottom, margin_left] = options.margins_pt();
        let content_width = page_width - margin_left - margin_right;
        let content_height = page_height - margin_top - margin_bottom;
        if content_width <= 0.0 || content_height <= 0.0 {
            return Err(ExportError::Paginate(format!(
                "margins leave no room on a {page_width}x{page_height}pt page"
            )));
        }
        if options.content_width_px <= 0.0 {
            return Err(ExportError::Paginate("content width must be positive".to_owned()));
        }

        let hints = break_hints(input.surface, input.root, options);
        let flow = layout(
            input.surface,
            input.root,
            input.styles,
            options.content_width_px,
            &hints,
        );

        let geometry = Geometry {
            scale: content_width / options.content_width_px,
            page_width,
            page_height,
            margin_top,
            margin_left,
        };
        let starts = page_starts(&flow.blocks, content_height / geometry.scale);
        tracing::debug!(
            pages = starts.len(),
            blocks = flow.blocks.len(),
            height = flow.height,
            "Paginated document"
        );

        let mut writer = PdfWriter::new(options);
        let background = options.page_background();
        for (index, &start) in starts.iter().enumerate() {
            let end = starts
                .get(index + 1)
                .copied()
                .unwrap_or(start + content_height / geometry.scale);
            let page = PageSlice { start, end };
            let content = page_content(&flow, &geometry, page, background);
            writer.add_page(content, &geometry, [margin_top, margin_right, margin_bottom, margin_left])?;
        }

        let pages = starts.len();
        let bytes = writer.finish()?;
        Ok(PaginatedDocument { bytes, pages })
    }
}

/// Elements matched by the avoid and break selectors.
fn break_hints(surface: &Surface, root: NodeId, options: &PaginationOptions) -> BreakHints {
    let select = |selector: &str| -> HashSet<NodeId> {
        match SelectorList::parse(selector) {
            Ok(list) => surface.select_parsed(root, &list).into_iter().collect(),
            Err(error) => {
                tracing::warn!(selector, %error, "Ignoring invalid page-break selector");
                HashSet::new()
            }
        }
    };

    BreakHints {
        avoid: options
            .avoid_selectors
            .iter()
            .flat_map(|selector| select(selector))
            .collect(),
        break_before: select(BREAK_BEFORE_SELECTOR),
        break_after: select(BREAK_AFTER_SELECTOR),
    }
}

/// Mapping from layout pixels to page points.
struct Geometry {
    /// Points per layout pixel.
    scale: f64,
    page_width: f64,
    page_height: f64,
    margin_top: f64,
    margin_left: f64,
}

impl Geometry {
    fn x(&self, px: f64) -> f64 {
        self.margin_left + px * self.scale
    }

    /// PDF y coordinate of a layout offset on the page starting at `start`.
    fn y(&self, px: f64, start: f64) -> f64 {
        self.page_height - self.margin_top - (px - start) * self.scale
    }

    fn len(&self, px: f64) -> f64 {
        px * self.scale
    }
}

/// Vertical range of the flow shown on one page.
#[derive(Clone, Copy)]
struct PageSlice {
    start: f64,
    end: f64,
}

fn page_content(flow: &Flow, geometry: &Geometry, page: PageSlice, background: Rgba) -> Content {
    let mut operations = Vec::new();

    fill(
        &mut operations,
        background,
        [0.0, 0.0, geometry.page_width, geometry.page_height],
    );

    for decoration in &flow.decorations {
        draw_decoration(&mut operations, decoration, geometry, page, background);
    }

    for line in flow.lines.iter().filter(|line| {
        let middle = line.top + line.height / 2.0;
        middle >= page.start && middle < page.end
    }) {
        draw_line(&mut operations, line, geometry, page.start, background);
    }

    Content { operations }
}

fn fill(operations: &mut Vec<Operation>, color: Rgba, [x, y, width, height]: [f64; 4]) {
    operations.push(Operation::new("rg", color_operands(color)));
    operations.push(Operation::new(
        "re",
        vec![real(x), real(y), real(width), real(height)],
    ));
    operations.push(Operation::new("f", vec![]));
}

fn draw_decoration(
    operations: &mut Vec<Operation>,
    decoration: &Decoration,
    geometry: &Geometry,
    page: PageSlice,
    backdrop: Rgba,
) {
    let bottom = decoration.top + decoration.height;
    let visible_top = decoration.top.max(page.start);
    let visible_bottom = bottom.min(page.end);
    if visible_bottom <= visible_top {
        return;
    }

    let x = geometry.x(decoration.x);
    let width = geometry.len(decoration.width);
    let y_bottom = geometry.y(visible_bottom, page.start);
    let height = geometry.len(visible_bottom - visible_top);

    if let Some(background) = decoration.background {
        fill(operations, background.over(backdrop), [x, y_bottom, width, height]);
    }

    let [top_border, right_border, bottom_border, left_border] = decoration.borders;
    if let Some((size, color)) = top_border.filter(|_| decoration.top >= page.start) {
        let size = geometry.len(size);
        fill(
            operations,
            color.over(backdrop),
            [x, geometry.y(decoration.top, page.start) - size, width, size],
        );
    }
    if let Some((size, color)) = bottom_border.filter(|_| bottom <= page.end) {
        fill(operations, color.over(backdrop), [x, y_bottom, width, geometry.len(size)]);
    }
    if let Some((size, color)) = left_border {
        fill(operations, color.over(backdrop), [x, y_bottom, geometry.len(size), height]);
    }
    if let Some((size, color)) = right_border {
        let size = geometry.len(size);
        fill(operations, color.over(backdrop), [x + width - size, y_bottom, size, height]);
    }
}

fn draw_line(operations: &mut Vec<Operation>, line: &TextLine, geometry: &Geometry, start: f64, backdrop: Rgba) {
    for run in &line.runs {
        if run.text.trim().is_empty() {
            continue;
        }
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![
                run.style.font.resource_name().into(),
                real(geometry.len(run.style.size)),
            ],
        ));
        operations.push(Operation::new("rg", color_operands(run.style.color.over(backdrop))));
        operations.push(Operation::new(
            "Td",
            vec![
                real(geometry.x(run.x)),
                real(geometry.y(line.top + run.baseline, start)),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encode_text(&run.text), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
}

#[allow(clippy::cast_possible_truncation)]
fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn color_operands(color: Rgba) -> Vec<Object> {
    let (r, g, b) = color.unit_channels();
    vec![real(r), real(g), real(b)]
}

/// Encode text for the standard fonts' WinAnsi encoding.
fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\u{20ac}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{a0}' => b' ',
            c => u8::try_from(u32::from(c))
                .ok()
                .filter(|byte| !(0x80..0xa0).contains(byte) && *byte >= 0x20)
                .unwrap_or(b'?'),
        })
        .collect()
}

struct PdfWriter {
    document: Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    page_ids: Vec<ObjectId>,
    info: Dictionary,
}

impl PdfWriter {
    fn new(options: &PaginationOptions) -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();

        let mut fonts = Dictionary::new();
        for font in Font::ALL {
            let font_id = document.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource_name(), font_id);
        }
        let resources_id = document.add_object(dictionary! {
            "Font" => fonts,
        });

        let mut info = dictionary! {
            "Producer" => Object::string_literal("mdstyler"),
            "RasterScale" => real(options.scale),
        };
        if let Some(title) = &options.title {
            info.set("Title", Object::string_literal(title.as_str()));
        }

        Self {
            document,
            pages_id,
            resources_id,
            page_ids: Vec::new(),
            info,
        }
    }

    fn add_page(&mut self, content: Content, geometry: &Geometry, margins: [f64; 4]) -> Result<(), ExportError> {
        let [top, right, bottom, left] = margins;
        let stream = Stream::new(dictionary! {}, content.encode()?);
        let content_id = self.document.add_object(stream);
        let page_id = self.document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Resources" => self.resources_id,
            "Contents" => content_id,
            "MediaBox" => vec![real(0.0), real(0.0), real(geometry.page_width), real(geometry.page_height)],
            "ArtBox" => vec![
                real(left),
                real(bottom),
                real(geometry.page_width - right),
                real(geometry.page_height - top),
            ],
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>, ExportError> {
        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::from(*id)).collect();
        #[allow(clippy::cast_possible_wrap)]
        let count = self.page_ids.len() as i64;
        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);
        let info_id = self.document.add_object(self.info);
        self.document.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        self.document.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use mdstyler_renderer::parse_fragment;
    use mdstyler_surface::{Media, StyleResolver, Stylesheet};
    use mdstyler_theme::PageSize;
    use pretty_assertions::assert_eq;

    use super::*;

    fn styled(html: &str, css: &str) -> (Surface, NodeId, ComputedStyles) {
        let mut surface = Surface::new();
        let root = surface.create_element("div", Vec::new());
        surface.append_markup(root, &parse_fragment(html).unwrap()).unwrap();
        let document = surface.document();
        surface.append_child(document, root).unwrap();
        let styles = StyleResolver::new(Media::Screen)
            .with_stylesheet(Stylesheet::parse(css))
            .resolve(&surface, root);
        (surface, root, styles)
    }

    fn floats(object: &Object) -> Vec<f64> {
        object
            .as_array()
            .unwrap()
            .iter()
            .map(|value| f64::from(value.as_float().unwrap()))
            .collect()
    }

    #[test]
    fn test_letter_page_boxes() {
        let (surface, root, styles) = styled("<p>Hello</p>", "");
        let options = PaginationOptions {
            page_size: PageSize::Letter,
            margins_mm: [10.0; 4],
            title: Some("Notes".to_owned()),
            ..PaginationOptions::default()
        };
        let input = PaginationInput {
            surface: &surface,
            root,
            styles: &styles,
        };

        let output = PdfPaginator.paginate(&input, &options).unwrap();
        assert_eq!(output.pages, 1);

        let document = Document::load_mem(&output.bytes).unwrap();
        let pages = document.get_pages();
        assert_eq!(pages.len(), 1);
        let page = document.get_object(pages[&1]).unwrap().as_dict().unwrap();

        assert_eq!(floats(page.get(b"MediaBox").unwrap()), vec![0.0, 0.0, 612.0, 792.0]);
        let art_box = floats(page.get(b"ArtBox").unwrap());
        let inset = 10.0 * 72.0 / 25.4;
        assert!((art_box[0] - inset).abs() < 0.01);
        assert!((art_box[1] - inset).abs() < 0.01);
        assert!((art_box[2] - (612.0 - inset)).abs() < 0.01);
        assert!((art_box[3] - (792.0 - inset)).abs() < 0.01);
    }

    #[test]
    fn test_long_document_spans_pages() {
        let paragraphs = (0..80).map(|i| format!("<p>Paragraph {i}</p>")).collect::<String>();
        let (surface, root, styles) = styled(&paragraphs, "p { margin: 0; line-height: 40px; }");
        let input = PaginationInput {
            surface: &surface,
            root,
            styles: &styles,
        };

        let output = PdfPaginator.paginate(&input, &PaginationOptions::default()).unwrap();
        let document = Document::load_mem(&output.bytes).unwrap();
        assert!(output.pages > 1);
        assert_eq!(document.get_pages().len(), output.pages);
    }

    #[test]
    fn test_margins_too_large() {
        let (surface, root, styles) = styled("<p>x</p>", "");
        let options = PaginationOptions {
            margins_mm: [200.0; 4],
            ..PaginationOptions::default()
        };
        let input = PaginationInput {
            surface: &surface,
            root,
            styles: &styles,
        };
        assert!(matches!(
            PdfPaginator.paginate(&input, &options),
            Err(ExportError::Paginate(_))
        ));
    }

    #[test]
    fn test_break_before_class_starts_page() {
        let (surface, root, styles) = styled(
            "<p>One</p><p class=\"page-break-before\">Two</p>",
            "",
        );
        let input = PaginationInput {
            surface: &surface,
            root,
            styles: &styles,
        };
        let output = PdfPaginator.paginate(&input, &PaginationOptions::default()).unwrap();
        assert_eq!(output.pages, 2);
    }

    #[test]
    fn test_encode_text() {
        assert_eq!(encode_text("a\u{2022}b"), vec![b'a', 0x95, b'b']);
        assert_eq!(encode_text("caf\u{e9}"), vec![b'c', b'a', b'f', 0xe9]);
        assert_eq!(encode_text("\u{4e2d}"), vec![b'?']);
    }
}
