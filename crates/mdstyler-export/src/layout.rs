//! Flow layout of a self-styled document at a fixed width.
//!
//! Produces positioned text lines, box decorations and the list of
//! vertical blocks the paginator may break between. All lengths are CSS
//! pixels measured from the top of the document.

use std::collections::HashSet;

use mdstyler_surface::{
    ComputedStyle, ComputedStyles, Display, FontStyle, NodeData, NodeId, Rgba, Surface, TextAlign,
    WhiteSpace,
};

/// Height given to images and diagrams without intrinsic dimensions.
const REPLACED_DEFAULT_HEIGHT: f64 = 150.0;

const PLACEHOLDER_BORDER: Rgba = Rgba::rgb(0xcc, 0xcc, 0xcc);

const TAB: &str = "    ";

/// Standard PDF fonts used for text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Font {
    Regular,
    Bold,
    Italic,
    BoldItalic,
    Mono,
    MonoBold,
}

impl Font {
    pub(crate) const ALL: [Self; 6] = [
        Self::Regular,
        Self::Bold,
        Self::Italic,
        Self::BoldItalic,
        Self::Mono,
        Self::MonoBold,
    ];

    fn for_style(style: &ComputedStyle) -> Self {
        let family = style.font_family.to_ascii_lowercase();
        let mono = ["mono", "courier", "consolas", "menlo"]
            .iter()
            .any(|name| family.contains(name));
        let bold = style.font_weight >= 600;
        match (mono, bold, style.font_style) {
            (true, false, _) => Self::Mono,
            (true, true, _) => Self::MonoBold,
            (false, false, FontStyle::Normal) => Self::Regular,
            (false, true, FontStyle::Normal) => Self::Bold,
            (false, false, FontStyle::Italic) => Self::Italic,
            (false, true, FontStyle::Italic) => Self::BoldItalic,
        }
    }

    /// Name in the page resource dictionary.
    pub(crate) fn resource_name(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
            Self::Italic => "F3",
            Self::BoldItalic => "F4",
            Self::Mono => "F5",
            Self::MonoBold => "F6",
        }
    }

    pub(crate) fn base_font(self) -> &'static str {
        match self {
            Self::Regular => "Helvetica",
            Self::Bold => "Helvetica-Bold",
            Self::Italic => "Helvetica-Oblique",
            Self::BoldItalic => "Helvetica-BoldOblique",
            Self::Mono => "Courier",
            Self::MonoBold => "Courier-Bold",
        }
    }

    /// Approximate advance width of `c` in em.
    fn advance(self, c: char) -> f64 {
        let bold = matches!(self, Self::Bold | Self::BoldItalic);
        let base = match (self, c) {
            (Self::Mono | Self::MonoBold, _) => return 0.6,
            (_, ' ' | 'i' | 'j' | 'l' | '.' | ',' | '\'' | '|' | '!' | ':' | ';') => 0.278,
            (_, 'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-') => 0.333,
            (_, 'm' | 'M' | 'W') => 0.833,
            (_, 'w') => 0.722,
            (_, c) if c.is_ascii_uppercase() => 0.667,
            (_, c) if c.is_ascii_digit() => 0.556,
            _ => 0.5,
        };
        if bold { base * 1.05 } else { base }
    }

    pub(crate) fn text_width(self, text: &str, size: f64) -> f64 {
        text.chars().map(|c| self.advance(c)).sum::<f64>() * size
    }
}

/// Text attributes shared by a run of characters.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RunStyle {
    pub font: Font,
    pub size: f64,
    pub color: Rgba,
    pub line_height: f64,
}

impl RunStyle {
    fn of(style: &ComputedStyle) -> Self {
        Self {
            font: Font::for_style(style),
            size: style.font_size,
            color: style.color,
            line_height: style.line_height_px(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PlacedRun {
    pub x: f64,
    /// Baseline offset from the top of the line.
    pub baseline: f64,
    pub text: String,
    pub style: RunStyle,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TextLine {
    pub top: f64,
    pub height: f64,
    pub runs: Vec<PlacedRun>,
}

/// Background and borders of one box.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Decoration {
    pub x: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub background: Option<Rgba>,
    /// Width and color per side: top, right, bottom, left.
    pub borders: [Option<(f64, Rgba)>; 4],
}

/// A vertical span the paginator keeps on one page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FlowBlock {
    pub top: f64,
    pub bottom: f64,
    pub keep_with_next: bool,
    pub break_before: bool,
    pub break_after: bool,
}

impl FlowBlock {
    fn new(top: f64, bottom: f64) -> Self {
        Self {
            top,
            bottom,
            keep_with_next: false,
            break_before: false,
            break_after: false,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Flow {
    pub lines: Vec<TextLine>,
    pub decorations: Vec<Decoration>,
    /// Blocks in document order.
    pub blocks: Vec<FlowBlock>,
    pub height: f64,
}

/// Elements with page-break behavior forced by selector.
#[derive(Debug, Default)]
pub(crate) struct BreakHints {
    pub avoid: HashSet<NodeId>,
    pub break_before: HashSet<NodeId>,
    pub break_after: HashSet<NodeId>,
}

/// Lay out `root` and its descendants `width` pixels wide.
pub(crate) fn layout(
    surface: &Surface,
    root: NodeId,
    styles: &ComputedStyles,
    width: f64,
    hints: &BreakHints,
) -> Flow {
    let mut layout = Layout {
        surface,
        styles,
        hints,
        flow: Flow::default(),
        marker: None,
    };
    let placed = layout.block(root, 0.0, width, 0.0);
    let mut flow = layout.flow;
    flow.height = placed.bottom;
    flow
}

enum Inline {
    Text(String, RunStyle),
    Break,
}

struct Atom {
    text: String,
    style: RunStyle,
    width: f64,
    space: bool,
}

enum Piece {
    Atom(Atom),
    Break,
}

struct Placed {
    bottom: f64,
    decoration: Option<usize>,
}

struct Marker {
    text: String,
    style: RunStyle,
}

struct Layout<'a> {
    surface: &'a Surface,
    styles: &'a ComputedStyles,
    hints: &'a BreakHints,
    flow: Flow,
    /// List marker waiting for the first line of its item.
    marker: Option<Marker>,
}

impl Layout<'_> {
    fn block(&mut self, id: NodeId, x: f64, width: f64, y: f64) -> Placed {
        let styles = self.styles;
        let Some(style) = styles.get(id).filter(|style| style.display != Display::None) else {
            return Placed {
                bottom: y,
                decoration: None,
            };
        };

        let top = y + style.margin.top;
        let box_x = x + style.margin.left;
        let box_width = (width - style.margin.horizontal()).max(0.0);
        let decoration = self.decorate(style, box_x, top, box_width);
        let first_block = self.flow.blocks.len();

        let inner_x = box_x + style.border_width.left + style.padding.left;
        let inner_width =
            (box_width - style.border_width.horizontal() - style.padding.horizontal()).max(1.0);
        let content_top = top + style.border_width.top + style.padding.top;

        if style.display == Display::ListItem {
            self.marker = Some(self.list_marker(id, style));
        }

        let content_bottom = if is_replaced(self.surface, id) {
            self.replaced(id, inner_x, inner_width, content_top)
        } else if style.display == Display::TableRow {
            self.row(id, inner_x, inner_width, content_top)
        } else {
            self.children(id, style, inner_x, inner_width, content_top)
        };
        if style.display == Display::ListItem {
            self.marker = None;
        }

        let bottom = content_bottom + style.padding.bottom + style.border_width.bottom;
        if let Some(index) = decoration {
            self.flow.decorations[index].height = bottom - top;
        }
        if self.flow.blocks.len() == first_block && bottom > top {
            self.flow.blocks.push(FlowBlock::new(top, bottom));
        }
        self.mark_breaks(id, style, first_block);

        Placed {
            bottom: bottom + style.margin.bottom,
            decoration,
        }
    }

    fn decorate(&mut self, style: &ComputedStyle, x: f64, top: f64, width: f64) -> Option<usize> {
        let background = (!style.background_color.is_transparent()).then_some(style.background_color);
        let widths = [
            style.border_width.top,
            style.border_width.right,
            style.border_width.bottom,
            style.border_width.left,
        ];
        let borders: [Option<(f64, Rgba)>; 4] = std::array::from_fn(|side| {
            let color = style.border_color[side];
            (widths[side] > 0.0 && !color.is_transparent()).then_some((widths[side], color))
        });
        if background.is_none() && borders.iter().all(Option::is_none) {
            return None;
        }
        self.flow.decorations.push(Decoration {
            x,
            top,
            width,
            height: 0.0,
            background,
            borders,
        });
        Some(self.flow.decorations.len() - 1)
    }

    fn mark_breaks(&mut self, id: NodeId, style: &ComputedStyle, first: usize) {
        let blocks = &mut self.flow.blocks;
        if blocks.len() <= first {
            return;
        }

        if style.break_inside_avoid || self.hints.avoid.contains(&id) {
            let merged = blocks[first..].iter().fold(blocks[first], |acc, block| FlowBlock {
                top: acc.top.min(block.top),
                bottom: acc.bottom.max(block.bottom),
                keep_with_next: block.keep_with_next,
                break_before: acc.break_before,
                break_after: block.break_after,
            });
            blocks.truncate(first);
            blocks.push(merged);
        }

        if style.break_before_page || self.hints.break_before.contains(&id) {
            blocks[first].break_before = true;
        }
        if let Some(last) = blocks.last_mut() {
            if style.break_after_avoid {
                last.keep_with_next = true;
            }
            if style.break_after_page || self.hints.break_after.contains(&id) {
                last.break_after = true;
            }
        }
    }

    fn list_marker(&self, id: NodeId, style: &ComputedStyle) -> Marker {
        let surface = self.surface;
        let ordered = surface
            .parent_element(id)
            .and_then(|parent| surface.tag(parent))
            .is_some_and(|tag| tag.eq_ignore_ascii_case("ol"));
        let text = if ordered {
            let start = surface
                .parent_element(id)
                .and_then(|parent| surface.attr(parent, "start"))
                .and_then(|start| start.trim().parse::<usize>().ok())
                .unwrap_or(1);
            let (position, _) = surface.element_position(id);
            format!("{}.", start + position - 1)
        } else {
            "\u{2022}".to_owned()
        };
        Marker {
            text,
            style: RunStyle::of(style),
        }
    }

    fn children(&mut self, id: NodeId, style: &ComputedStyle, x: f64, width: f64, mut cursor: f64) -> f64 {
        let surface = self.surface;
        let styles = self.styles;
        let mut inline = Vec::new();

        for &child in surface.children(id) {
            match surface.data(child) {
                Some(NodeData::Text(text)) => inline.push(Inline::Text(text.clone(), RunStyle::of(style))),
                Some(NodeData::Element { .. }) => {
                    let Some(child_style) = styles.get(child) else {
                        continue;
                    };
                    if child_style.display == Display::None {
                        continue;
                    }
                    if child_style.display.is_block_level() || is_replaced(surface, child) {
                        cursor = self.flush(&mut inline, style, x, width, cursor);
                        cursor = self.block(child, x, width, cursor).bottom;
                    } else {
                        self.collect_inline(child, &mut inline);
                    }
                }
                _ => {}
            }
        }

        self.flush(&mut inline, style, x, width, cursor)
    }

    fn collect_inline(&self, id: NodeId, out: &mut Vec<Inline>) {
        let surface = self.surface;
        let Some(style) = self.styles.get(id) else {
            return;
        };
        let run = RunStyle::of(style);

        match surface.tag(id).map(str::to_ascii_lowercase).as_deref() {
            Some("br") => {
                out.push(Inline::Break);
                return;
            }
            Some("input") if surface.attr(id, "type") == Some("checkbox") => {
                let mark = if surface.attr(id, "checked").is_some() { "[x] " } else { "[ ] " };
                out.push(Inline::Text(mark.to_owned(), run));
                return;
            }
            Some("img" | "svg") => {
                let label = placeholder_label(surface, id);
                out.push(Inline::Text(label, run));
                return;
            }
            _ => {}
        }

        for &child in surface.children(id) {
            match surface.data(child) {
                Some(NodeData::Text(text)) => out.push(Inline::Text(text.clone(), run.clone())),
                Some(NodeData::Element { .. }) => {
                    if self.styles.get(child).is_some_and(|s| s.display != Display::None) {
                        self.collect_inline(child, out);
                    }
                }
                _ => {}
            }
        }
    }

    /// Break pending inline content into lines starting at `cursor`.
    fn flush(&mut self, items: &mut Vec<Inline>, style: &ComputedStyle, x: f64, width: f64, mut cursor: f64) -> f64 {
        let items = std::mem::take(items);
        if items.is_empty() {
            return cursor;
        }

        let wrap_width = if style.white_space == WhiteSpace::NoWrap {
            f64::INFINITY
        } else {
            width
        };
        let lines = break_lines(atoms(&items, style.white_space), wrap_width);
        if lines.is_empty() {
            return cursor;
        }

        let marker = self.marker.take();
        for (index, atoms) in lines.into_iter().enumerate() {
            let height = atoms
                .iter()
                .map(|atom| atom.style.line_height)
                .fold(style.line_height_px(), f64::max);
            let line_width: f64 = atoms.iter().map(|atom| atom.width).sum();
            let offset = match style.text_align {
                TextAlign::Center => (width - line_width) / 2.0,
                TextAlign::Right => width - line_width,
                TextAlign::Start | TextAlign::Left | TextAlign::Justify => 0.0,
            }
            .max(0.0);

            let mut runs = Vec::new();
            if index == 0
                && let Some(marker) = &marker
            {
                let marker_width = marker.style.font.text_width(&marker.text, marker.style.size);
                runs.push(PlacedRun {
                    x: x - marker_width - marker.style.size * 0.5,
                    baseline: baseline(height, marker.style.size),
                    text: marker.text.clone(),
                    style: marker.style.clone(),
                });
            }

            let mut pen = x + offset;
            for atom in atoms {
                match runs.last_mut() {
                    Some(last) if last.style == atom.style && is_content_run(last, x) => {
                        last.text.push_str(&atom.text);
                    }
                    _ => runs.push(PlacedRun {
                        x: pen,
                        baseline: baseline(height, atom.style.size),
                        text: atom.text.clone(),
                        style: atom.style.clone(),
                    }),
                }
                pen += atom.width;
            }

            self.flow.lines.push(TextLine {
                top: cursor,
                height,
                runs,
            });
            self.flow.blocks.push(FlowBlock::new(cursor, cursor + height));
            cursor += height;
        }
        cursor
    }

    fn row(&mut self, id: NodeId, x: f64, width: f64, top: f64) -> f64 {
        let surface = self.surface;
        let cells: Vec<NodeId> = surface.element_children(id).collect();
        if cells.is_empty() {
            return top;
        }

        #[allow(clippy::cast_precision_loss)]
        let cell_width = width / cells.len() as f64;
        let first = self.flow.blocks.len();
        let mut bottom = top;
        let mut decorations = Vec::new();
        for (index, cell) in cells.into_iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let cell_x = x + cell_width * index as f64;
            let placed = self.block(cell, cell_x, cell_width, top);
            bottom = bottom.max(placed.bottom);
            decorations.extend(placed.decoration);
        }
        for index in decorations {
            let decoration = &mut self.flow.decorations[index];
            decoration.height = bottom - decoration.top;
        }

        let blocks = &mut self.flow.blocks;
        blocks.truncate(first);
        if bottom > top {
            blocks.push(FlowBlock::new(top, bottom));
        }
        bottom
    }

    fn replaced(&mut self, id: NodeId, x: f64, width: f64, top: f64) -> f64 {
        let surface = self.surface;
        let (intrinsic_width, intrinsic_height) = intrinsic_size(surface, id);
        let mut box_width = intrinsic_width.unwrap_or(width);
        let mut box_height = intrinsic_height.unwrap_or(REPLACED_DEFAULT_HEIGHT);
        if box_width > width {
            box_height *= width / box_width;
            box_width = width;
        }

        self.flow.decorations.push(Decoration {
            x,
            top,
            width: box_width,
            height: box_height,
            background: None,
            borders: [Some((1.0, PLACEHOLDER_BORDER)); 4],
        });

        if let Some(style) = self.styles.get(id) {
            let run = RunStyle {
                color: PLACEHOLDER_BORDER,
                ..RunStyle::of(style)
            };
            let text = placeholder_label(surface, id);
            let text_width = run.font.text_width(&text, run.size);
            let line_top = top + ((box_height - run.line_height) / 2.0).max(0.0);
            self.flow.lines.push(TextLine {
                top: line_top,
                height: run.line_height,
                runs: vec![PlacedRun {
                    x: x + ((box_width - text_width) / 2.0).max(0.0),
                    baseline: baseline(run.line_height, run.size),
                    text,
                    style: run,
                }],
            });
        }

        self.flow.blocks.push(FlowBlock::new(top, top + box_height));
        top + box_height
    }
}

/// Runs after the list marker may be merged; the marker itself may not.
fn is_content_run(run: &PlacedRun, x: f64) -> bool {
    run.x >= x
}

fn baseline(line_height: f64, size: f64) -> f64 {
    (line_height - size) / 2.0 + size * 0.8
}

fn is_replaced(surface: &Surface, id: NodeId) -> bool {
    surface
        .tag(id)
        .is_some_and(|tag| tag.eq_ignore_ascii_case("img") || tag.eq_ignore_ascii_case("svg"))
}

fn placeholder_label(surface: &Surface, id: NodeId) -> String {
    if let Some(alt) = surface.attr(id, "alt").filter(|alt| !alt.trim().is_empty()) {
        return format!("[{}]", alt.trim());
    }
    match surface.tag(id) {
        Some(tag) if tag.eq_ignore_ascii_case("svg") => "[diagram]".to_owned(),
        _ => "[image]".to_owned(),
    }
}

fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number.parse::<f64>().ok().filter(|n| *n > 0.0)
}

/// Width and height from attributes, falling back to an SVG `viewBox`.
fn intrinsic_size(surface: &Surface, id: NodeId) -> (Option<f64>, Option<f64>) {
    let width = surface.attr(id, "width").and_then(parse_length);
    let height = surface.attr(id, "height").and_then(parse_length);
    if width.is_some() && height.is_some() {
        return (width, height);
    }

    let view_box: Vec<f64> = surface
        .attr(id, "viewBox")
        .map(|value| {
            value
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter_map(|part| part.parse().ok())
                .collect()
        })
        .unwrap_or_default();
    match (view_box.as_slice(), width, height) {
        ([_, _, w, h], None, None) if *w > 0.0 && *h > 0.0 => (Some(*w), Some(*h)),
        ([_, _, w, h], Some(width), None) if *w > 0.0 => (Some(width), Some(width * h / w)),
        ([_, _, w, h], None, Some(height)) if *h > 0.0 => (Some(height * w / h), Some(height)),
        _ => (width, height),
    }
}

/// Split inline content into atoms according to `white-space`.
fn atoms(items: &[Inline], white_space: WhiteSpace) -> Vec<Piece> {
    let preserve_spaces = matches!(white_space, WhiteSpace::Pre | WhiteSpace::PreWrap);
    let preserve_newlines = white_space.preserves_newlines();
    let mut pieces = Vec::new();

    for item in items {
        let (text, style) = match item {
            Inline::Break => {
                pieces.push(Piece::Break);
                continue;
            }
            Inline::Text(text, style) => (text, style),
        };

        let mut segments = text.split('\n').peekable();
        while let Some(segment) = segments.next() {
            if preserve_spaces {
                if !segment.is_empty() {
                    let text = segment.replace('\t', TAB);
                    pieces.push(atom(text, style, false));
                }
            } else {
                push_collapsed(&mut pieces, segment, style);
            }

            if segments.peek().is_some() {
                if preserve_newlines {
                    pieces.push(Piece::Break);
                } else {
                    push_space(&mut pieces, style);
                }
            }
        }
    }
    pieces
}

fn atom(text: String, style: &RunStyle, space: bool) -> Piece {
    Piece::Atom(Atom {
        width: style.font.text_width(&text, style.size),
        text,
        style: style.clone(),
        space,
    })
}

fn push_space(pieces: &mut Vec<Piece>, style: &RunStyle) {
    if !matches!(pieces.last(), Some(Piece::Atom(Atom { space: true, .. }))) {
        pieces.push(atom(" ".to_owned(), style, true));
    }
}

fn push_collapsed(pieces: &mut Vec<Piece>, text: &str, style: &RunStyle) {
    let mut word = String::new();
    for c in text.chars() {
        if c.is_whitespace() {
            if !word.is_empty() {
                pieces.push(atom(std::mem::take(&mut word), style, false));
            }
            push_space(pieces, style);
        } else {
            word.push(c);
        }
    }
    if !word.is_empty() {
        pieces.push(atom(word, style, false));
    }
}

/// Greedy line breaking. Atoms wider than a line are split by character.
fn break_lines(pieces: Vec<Piece>, width: f64) -> Vec<Vec<Atom>> {
    let mut lines = Vec::new();
    let mut line: Vec<Atom> = Vec::new();
    let mut line_width = 0.0;
    let mut has_break = false;

    let finish = |line: &mut Vec<Atom>, lines: &mut Vec<Vec<Atom>>| {
        while line.last().is_some_and(|atom| atom.space) {
            line.pop();
        }
        lines.push(std::mem::take(line));
    };

    for piece in pieces {
        match piece {
            Piece::Break => {
                has_break = true;
                finish(&mut line, &mut lines);
                line_width = 0.0;
            }
            Piece::Atom(atom) if atom.space => {
                if !line.is_empty() {
                    line_width += atom.width;
                    line.push(atom);
                }
            }
            Piece::Atom(atom) => {
                if line_width + atom.width > width && !line.is_empty() {
                    finish(&mut line, &mut lines);
                    line_width = 0.0;
                }
                if atom.width > width {
                    for chunk in split_atom(atom, width) {
                        if !line.is_empty() {
                            finish(&mut line, &mut lines);
                        }
                        line_width = chunk.width;
                        line.push(chunk);
                    }
                } else {
                    line_width += atom.width;
                    line.push(atom);
                }
            }
        }
    }

    while line.last().is_some_and(|atom| atom.space) {
        line.pop();
    }
    if !line.is_empty() {
        lines.push(line);
    }
    if !has_break && lines.iter().all(Vec::is_empty) {
        lines.clear();
    }
    lines
}

fn split_atom(atom: Atom, width: f64) -> Vec<Atom> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0;
    for c in atom.text.chars() {
        let advance = atom.style.font.advance(c) * atom.style.size;
        if current_width + advance > width && !current.is_empty() {
            chunks.push(Atom {
                text: std::mem::take(&mut current),
                style: atom.style.clone(),
                width: current_width,
                space: false,
            });
            current_width = 0.0;
        }
        current.push(c);
        current_width += advance;
    }
    if !current.is_empty() {
        chunks.push(Atom {
            text: current,
            style: atom.style,
            width: current_width,
            space: false,
        });
    }
    chunks
}
