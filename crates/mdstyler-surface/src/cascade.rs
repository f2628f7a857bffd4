//! Cascade and computed styles.
//!
//! [`StyleResolver`] resolves the properties the export path needs: colors,
//! box edges, typography, display and fragmentation hints. Declarations are
//! ordered by origin and importance, then specificity, then source order,
//! the way browsers do it. A small user agent sheet supplies element
//! defaults.

use std::collections::HashMap;
use std::sync::LazyLock;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag_no_case,
    combinator::{all_consuming, opt, value},
};

use crate::color::Rgba;
use crate::css::{Declaration, Media, Stylesheet, number, split_components};
use crate::selector::{SelectorList, Specificity};
use crate::tree::{NodeId, Surface};

/// Initial font size in pixels.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

const USER_AGENT_CSS: &str = r#"
address, article, aside, blockquote, details, div, dl, dd, dt, figure,
figcaption, footer, form, h1, h2, h3, h4, h5, h6, header, hr, main, nav,
ol, p, pre, section, summary, ul, math[display="block"] { display: block; }
head, link, meta, script, style, template, title { display: none; }
li { display: list-item; }
table { display: table; }
thead, tbody, tfoot { display: table-row-group; }
tr { display: table-row; }
td, th { display: table-cell; padding: 1px; }
th { font-weight: bold; text-align: center; }
p, pre, dl { margin-top: 1em; margin-bottom: 1em; }
blockquote, figure { margin: 1em 40px; }
ul, ol { margin-top: 1em; margin-bottom: 1em; padding-left: 40px; }
li ul, li ol { margin-top: 0; margin-bottom: 0; }
h1 { font-size: 2em; margin-top: 0.67em; margin-bottom: 0.67em; font-weight: bold; }
h2 { font-size: 1.5em; margin-top: 0.83em; margin-bottom: 0.83em; font-weight: bold; }
h3 { font-size: 1.17em; margin-top: 1em; margin-bottom: 1em; font-weight: bold; }
h4 { margin-top: 1.33em; margin-bottom: 1.33em; font-weight: bold; }
h5 { font-size: 0.83em; margin-top: 1.67em; margin-bottom: 1.67em; font-weight: bold; }
h6 { font-size: 0.67em; margin-top: 2.33em; margin-bottom: 2.33em; font-weight: bold; }
pre, code, kbd, samp { font-family: monospace; }
pre { white-space: pre; }
strong, b { font-weight: bolder; }
em, i, cite { font-style: italic; }
sup, sub { font-size: smaller; }
hr { border: 1px inset gray; margin-top: 0.5em; margin-bottom: 0.5em; }
"#;

static USER_AGENT_SHEET: LazyLock<Stylesheet> = LazyLock::new(|| Stylesheet::parse(USER_AGENT_CSS));

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "dotted", "dashed", "solid", "double", "groove", "ridge", "inset", "outset",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Display {
    Inline,
    Block,
    InlineBlock,
    ListItem,
    Table,
    TableRowGroup,
    TableRow,
    TableCell,
    None,
}

impl Display {
    fn parse(value: &str) -> Option<Self> {
        Some(match value.to_ascii_lowercase().as_str() {
            "inline" => Self::Inline,
            "block" | "flex" | "grid" | "flow-root" => Self::Block,
            "inline-block" | "inline-flex" | "inline-grid" => Self::InlineBlock,
            "list-item" => Self::ListItem,
            "table" => Self::Table,
            "table-row-group" | "table-header-group" | "table-footer-group" => Self::TableRowGroup,
            "table-row" => Self::TableRow,
            "table-cell" => Self::TableCell,
            "none" => Self::None,
            _ => return None,
        })
    }

    /// Whether the box starts on a new line.
    pub fn is_block_level(self) -> bool {
        !matches!(self, Self::Inline | Self::InlineBlock | Self::None)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Block => "block",
            Self::InlineBlock => "inline-block",
            Self::ListItem => "list-item",
            Self::Table => "table",
            Self::TableRowGroup => "table-row-group",
            Self::TableRow => "table-row",
            Self::TableCell => "table-cell",
            Self::None => "none",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAlign {
    Start,
    Left,
    Right,
    Center,
    Justify,
}

impl TextAlign {
    fn parse(value: &str) -> Option<Self> {
        Some(match value.to_ascii_lowercase().as_str() {
            "start" => Self::Start,
            "left" => Self::Left,
            "right" | "end" => Self::Right,
            "center" => Self::Center,
            "justify" => Self::Justify,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Left => "left",
            Self::Right => "right",
            Self::Center => "center",
            Self::Justify => "justify",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WhiteSpace {
    Normal,
    NoWrap,
    Pre,
    PreWrap,
    PreLine,
}

impl WhiteSpace {
    fn parse(value: &str) -> Option<Self> {
        Some(match value.to_ascii_lowercase().as_str() {
            "normal" => Self::Normal,
            "nowrap" => Self::NoWrap,
            "pre" => Self::Pre,
            "pre-wrap" | "break-spaces" => Self::PreWrap,
            "pre-line" => Self::PreLine,
            _ => return None,
        })
    }

    pub fn preserves_newlines(self) -> bool {
        matches!(self, Self::Pre | Self::PreWrap | Self::PreLine)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoxSizing {
    ContentBox,
    BorderBox,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LineHeight {
    Normal,
    /// Multiple of the element's own font size; inherited as a factor.
    Number(f64),
    Px(f64),
}

/// Per-side lengths in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }

    fn side_mut(&mut self, index: usize) -> &mut f64 {
        match index {
            0 => &mut self.top,
            1 => &mut self.right,
            2 => &mut self.bottom,
            _ => &mut self.left,
        }
    }
}

/// Resolved values of one element.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputedStyle {
    pub display: Display,
    pub color: Rgba,
    pub background_color: Rgba,
    /// Top, right, bottom, left.
    pub border_color: [Rgba; 4],
    pub border_width: Edges,
    pub margin: Edges,
    pub padding: Edges,
    pub font_size: f64,
    pub font_weight: u16,
    pub font_style: FontStyle,
    pub font_family: String,
    pub line_height: LineHeight,
    pub text_align: TextAlign,
    pub white_space: WhiteSpace,
    pub box_sizing: BoxSizing,
    pub break_inside_avoid: bool,
    pub break_before_page: bool,
    pub break_after_avoid: bool,
    pub break_after_page: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Inline,
            color: Rgba::BLACK,
            background_color: Rgba::TRANSPARENT,
            border_color: [Rgba::BLACK; 4],
            border_width: Edges::default(),
            margin: Edges::default(),
            padding: Edges::default(),
            font_size: DEFAULT_FONT_SIZE,
            font_weight: 400,
            font_style: FontStyle::Normal,
            font_family: "serif".to_owned(),
            line_height: LineHeight::Normal,
            text_align: TextAlign::Start,
            white_space: WhiteSpace::Normal,
            box_sizing: BoxSizing::ContentBox,
            break_inside_avoid: false,
            break_before_page: false,
            break_after_avoid: false,
            break_after_page: false,
        }
    }
}

impl ComputedStyle {
    /// Used line height in pixels.
    pub fn line_height_px(&self) -> f64 {
        match self.line_height {
            LineHeight::Normal => self.font_size * 1.2,
            LineHeight::Number(factor) => self.font_size * factor,
            LineHeight::Px(px) => px,
        }
    }

    /// Initial values with inherited properties taken from `parent`.
    fn inherit(parent: &Self) -> Self {
        Self {
            color: parent.color,
            font_size: parent.font_size,
            font_weight: parent.font_weight,
            font_style: parent.font_style,
            font_family: parent.font_family.clone(),
            line_height: parent.line_height,
            text_align: parent.text_align,
            white_space: parent.white_space,
            ..Self::default()
        }
    }
}

/// Computed styles of every element in a tree.
#[derive(Clone, Debug, Default)]
pub struct ComputedStyles {
    styles: HashMap<NodeId, ComputedStyle>,
}

impl ComputedStyles {
    pub fn get(&self, id: NodeId) -> Option<&ComputedStyle> {
        self.styles.get(&id)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    UserAgent,
    Author,
    Inline,
}

fn rank(origin: Origin, important: bool) -> u8 {
    match (origin, important) {
        (Origin::UserAgent, false) => 0,
        (Origin::Author, false) => 1,
        (Origin::Inline, false) => 2,
        (Origin::Author, true) => 3,
        (Origin::Inline, true) => 4,
        (Origin::UserAgent, true) => 5,
    }
}

struct RuleEntry<'a> {
    origin: Origin,
    selectors: &'a SelectorList,
    declarations: &'a [Declaration],
}

/// Resolves computed styles for a media type and a set of author sheets.
#[derive(Clone, Debug, Default)]
pub struct StyleResolver {
    media: Media,
    sheets: Vec<Stylesheet>,
}

impl StyleResolver {
    pub fn new(media: Media) -> Self {
        Self {
            media,
            sheets: Vec::new(),
        }
    }

    /// Add an author sheet. Later sheets win ties.
    #[must_use]
    pub fn with_stylesheet(mut self, sheet: Stylesheet) -> Self {
        self.sheets.push(sheet);
        self
    }

    pub fn media(&self) -> Media {
        self.media
    }

    fn rule_entries(&self) -> Vec<RuleEntry<'_>> {
        let user_agent = USER_AGENT_SHEET
            .style_rules(self.media)
            .into_iter()
            .map(|rule| (Origin::UserAgent, rule));
        let author = self
            .sheets
            .iter()
            .flat_map(|sheet| sheet.style_rules(self.media))
            .map(|rule| (Origin::Author, rule));
        user_agent
            .chain(author)
            .map(|(origin, rule)| RuleEntry {
                origin,
                selectors: &rule.selectors,
                declarations: &rule.declarations,
            })
            .collect()
    }

    /// Compute styles for every element of the tree containing `node`.
    ///
    /// Inheritance starts at the topmost ancestor of `node`, so a detached
    /// subtree is styled as if it were a document of its own.
    pub fn resolve(&self, surface: &Surface, node: NodeId) -> ComputedStyles {
        let mut top = node;
        while let Some(parent) = surface.parent(top) {
            top = parent;
        }

        let entries = self.rule_entries();
        let mut styles = ComputedStyles::default();
        self.walk(surface, top, &ComputedStyle::default(), &entries, &mut styles);
        styles
    }

    fn walk(
        &self,
        surface: &Surface,
        id: NodeId,
        parent: &ComputedStyle,
        entries: &[RuleEntry<'_>],
        out: &mut ComputedStyles,
    ) {
        if !surface.is_element(id) {
            for &child in surface.children(id) {
                self.walk(surface, child, parent, entries, out);
            }
            return;
        }

        let specified = specified_values(surface, id, entries);
        let style = compute(&specified, parent);
        for &child in surface.children(id) {
            self.walk(surface, child, &style, entries, out);
        }
        out.styles.insert(id, style);
    }
}

/// Longhand values after the cascade, keyed by property name.
fn specified_values(surface: &Surface, id: NodeId, entries: &[RuleEntry<'_>]) -> HashMap<String, String> {
    let inline = surface.inline_style(id);
    let mut matched: Vec<(u8, Specificity, usize, &Declaration)> = Vec::new();
    let mut order = 0usize;
    for entry in entries {
        let Some(specificity) = entry.selectors.match_specificity(surface, id) else {
            order += entry.declarations.len();
            continue;
        };
        for declaration in entry.declarations {
            matched.push((rank(entry.origin, declaration.important), specificity, order, declaration));
            order += 1;
        }
    }

    for declaration in &inline {
        matched.push((rank(Origin::Inline, declaration.important), (0, 0, 0), order, declaration));
        order += 1;
    }

    matched.sort_by_key(|&(level, specificity, position, _)| (level, specificity, position));

    let mut specified = HashMap::new();
    for (_, _, _, declaration) in matched {
        for (name, value) in expand_shorthand(&declaration.name, &declaration.value) {
            specified.insert(name, value);
        }
    }
    specified
}

/// Expand shorthands into longhands; other properties pass through.
fn expand_shorthand(name: &str, value: &str) -> Vec<(String, String)> {
    let components = split_components(value);
    match name {
        "margin" | "padding" | "border-width" | "border-style" | "border-color" => {
            let (prefix, suffix) = match name {
                "margin" => ("margin", ""),
                "padding" => ("padding", ""),
                other => ("border", other.trim_start_matches("border")),
            };
            let Some(values) = four_sides(&components) else {
                return Vec::new();
            };
            SIDES
                .iter()
                .zip(values)
                .map(|(side, value)| (format!("{prefix}-{side}{suffix}"), value.to_owned()))
                .collect()
        }
        "border" => SIDES
            .iter()
            .flat_map(|side| border_side(side, &components))
            .collect(),
        "border-top" | "border-right" | "border-bottom" | "border-left" => {
            border_side(name.trim_start_matches("border-"), &components)
        }
        "background" => {
            let color = components
                .iter()
                .find(|component| {
                    Rgba::parse(component).is_some() || component.eq_ignore_ascii_case("currentcolor")
                })
                .map_or("transparent", |component| *component);
            vec![("background-color".to_owned(), color.to_owned())]
        }
        "page-break-inside" => vec![("break-inside".to_owned(), value.to_owned())],
        "page-break-before" => vec![("break-before".to_owned(), legacy_break(value))],
        "page-break-after" => vec![("break-after".to_owned(), legacy_break(value))],
        _ => vec![(name.to_owned(), value.to_owned())],
    }
}

fn legacy_break(value: &str) -> String {
    if value.eq_ignore_ascii_case("always") {
        "page".to_owned()
    } else {
        value.to_owned()
    }
}

/// Expand 1-4 box values to top, right, bottom, left.
fn four_sides<'a>(components: &[&'a str]) -> Option<[&'a str; 4]> {
    match *components {
        [all] => Some([all; 4]),
        [vertical, horizontal] => Some([vertical, horizontal, vertical, horizontal]),
        [top, horizontal, bottom] => Some([top, horizontal, bottom, horizontal]),
        [top, right, bottom, left] => Some([top, right, bottom, left]),
        _ => None,
    }
}

/// Longhands for one side of a `border` shorthand. Omitted parts reset.
fn border_side(side: &str, components: &[&str]) -> Vec<(String, String)> {
    let mut width = "medium";
    let mut style = "none";
    let mut color = "currentcolor";
    for &component in components {
        if BORDER_STYLES.contains(&component.to_ascii_lowercase().as_str()) {
            style = component;
        } else if border_width(component, DEFAULT_FONT_SIZE).is_some() {
            width = component;
        } else {
            color = component;
        }
    }
    vec![
        (format!("border-{side}-width"), width.to_owned()),
        (format!("border-{side}-style"), style.to_owned()),
        (format!("border-{side}-color"), color.to_owned()),
    ]
}

fn border_width(value: &str, font_size: f64) -> Option<f64> {
    match value.to_ascii_lowercase().as_str() {
        "thin" => Some(1.0),
        "medium" => Some(3.0),
        "thick" => Some(5.0),
        _ => length(value, font_size),
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Unit {
    Px,
    Pt,
    Mm,
    Cm,
    In,
    Em,
    Rem,
    Percent,
}

fn unit(input: &str) -> IResult<&str, Unit> {
    alt((
        value(Unit::Px, tag_no_case("px")),
        value(Unit::Pt, tag_no_case("pt")),
        value(Unit::Mm, tag_no_case("mm")),
        value(Unit::Cm, tag_no_case("cm")),
        value(Unit::In, tag_no_case("in")),
        value(Unit::Rem, tag_no_case("rem")),
        value(Unit::Em, tag_no_case("em")),
        value(Unit::Percent, tag_no_case("%")),
    ))
    .parse(input)
}

fn dimension(input: &str) -> IResult<&str, (f64, Option<Unit>)> {
    all_consuming((number, opt(unit))).parse(input)
}

/// Resolve a length to pixels. Percentages resolve against `font_size`.
fn length_with_percent(value: &str, font_size: f64) -> Option<f64> {
    let (_, (number, unit)) = dimension(value.trim()).ok()?;
    Some(match unit {
        Some(Unit::Px) => number,
        Some(Unit::Pt) => number * 4.0 / 3.0,
        Some(Unit::Mm) => number * 96.0 / 25.4,
        Some(Unit::Cm) => number * 96.0 / 2.54,
        Some(Unit::In) => number * 96.0,
        Some(Unit::Em) => number * font_size,
        Some(Unit::Rem) => number * DEFAULT_FONT_SIZE,
        Some(Unit::Percent) => number * font_size / 100.0,
        None if number == 0.0 => 0.0,
        None => return None,
    })
}

/// Resolve a length to pixels. Percentages are not supported here.
fn length(value: &str, font_size: f64) -> Option<f64> {
    if value.trim_end().ends_with('%') {
        return None;
    }
    length_with_percent(value, font_size)
}

/// Box edge value; `auto` and percentages use zero.
fn edge_length(value: &str, font_size: f64) -> f64 {
    length(value, font_size).unwrap_or(0.0)
}

fn font_size(value: &str, parent: f64) -> Option<f64> {
    let keyword = match value.to_ascii_lowercase().as_str() {
        "xx-small" => Some(9.0),
        "x-small" => Some(10.0),
        "small" => Some(13.0),
        "medium" => Some(DEFAULT_FONT_SIZE),
        "large" => Some(18.0),
        "x-large" => Some(24.0),
        "xx-large" => Some(32.0),
        "smaller" => Some(parent / 1.2),
        "larger" => Some(parent * 1.2),
        _ => None,
    };
    keyword.or_else(|| length_with_percent(value, parent))
}

fn font_weight(value: &str, parent: u16) -> Option<u16> {
    match value.to_ascii_lowercase().as_str() {
        "normal" => Some(400),
        "bold" => Some(700),
        "bolder" => Some(match parent {
            0..400 => 400,
            400..600 => 700,
            _ => 900,
        }),
        "lighter" => Some(match parent {
            0..600 => 100,
            600..800 => 400,
            _ => 700,
        }),
        number => number.parse().ok().filter(|weight| (1..=1000).contains(weight)),
    }
}

fn line_height(value: &str, font_size: f64) -> Option<LineHeight> {
    if value.eq_ignore_ascii_case("normal") {
        return Some(LineHeight::Normal);
    }
    if let Ok(number) = value.trim().parse::<f64>() {
        return Some(LineHeight::Number(number));
    }
    length_with_percent(value, font_size).map(LineHeight::Px)
}

fn color(value: &str, current: Rgba) -> Option<Rgba> {
    if value.trim().eq_ignore_ascii_case("currentcolor") {
        Some(current)
    } else {
        Rgba::parse(value)
    }
}

fn compute(specified: &HashMap<String, String>, parent: &ComputedStyle) -> ComputedStyle {
    let get = |name: &str| specified.get(name).map(String::as_str);
    let mut style = ComputedStyle::inherit(parent);
    let initial = ComputedStyle::default();

    // Font size first: em lengths of other properties depend on it.
    match get("font-size") {
        Some("initial") => style.font_size = initial.font_size,
        Some(value) => {
            if let Some(size) = font_size(value, parent.font_size) {
                style.font_size = size;
            }
        }
        None => {}
    }
    let em = style.font_size;

    match get("color") {
        Some("initial") => style.color = initial.color,
        Some(value) => {
            if let Some(resolved) = color(value, parent.color) {
                style.color = resolved;
            }
        }
        None => {}
    }

    if let Some(value) = get("font-weight") {
        style.font_weight = font_weight(value, parent.font_weight).unwrap_or(style.font_weight);
    }
    if let Some(value) = get("font-style") {
        style.font_style = if matches!(value.to_ascii_lowercase().as_str(), "italic" | "oblique") {
            FontStyle::Italic
        } else {
            FontStyle::Normal
        };
    }
    if let Some(value) = get("font-family").filter(|v| !matches!(*v, "inherit" | "unset")) {
        value.clone_into(&mut style.font_family);
    }
    if let Some(value) = get("line-height") {
        style.line_height = line_height(value, em).unwrap_or(style.line_height);
    }
    if let Some(value) = get("text-align") {
        style.text_align = TextAlign::parse(value).unwrap_or(style.text_align);
    }
    if let Some(value) = get("white-space") {
        style.white_space = WhiteSpace::parse(value).unwrap_or(style.white_space);
    }

    if let Some(value) = get("display") {
        style.display = match value {
            "inherit" => parent.display,
            other => Display::parse(other).unwrap_or(style.display),
        };
    }
    if let Some(value) = get("background-color") {
        style.background_color = match value {
            "inherit" => parent.background_color,
            other => color(other, style.color).unwrap_or(style.background_color),
        };
    }
    if let Some(value) = get("box-sizing") {
        style.box_sizing = match value {
            "border-box" => BoxSizing::BorderBox,
            "inherit" => parent.box_sizing,
            _ => BoxSizing::ContentBox,
        };
    }

    for (index, side) in SIDES.iter().enumerate() {
        if let Some(value) = get(&format!("margin-{side}")) {
            *style.margin.side_mut(index) = edge_length(value, em);
        }
        if let Some(value) = get(&format!("padding-{side}")) {
            *style.padding.side_mut(index) = edge_length(value, em).max(0.0);
        }

        let border_style = get(&format!("border-{side}-style")).unwrap_or("none");
        let width = if matches!(border_style, "none" | "hidden") {
            0.0
        } else {
            get(&format!("border-{side}-width"))
                .map_or(Some(3.0), |value| border_width(value, em))
                .unwrap_or(3.0)
        };
        *style.border_width.side_mut(index) = width;
        style.border_color[index] = get(&format!("border-{side}-color"))
            .and_then(|value| color(value, style.color))
            .unwrap_or(style.color);
    }

    style.break_inside_avoid = get("break-inside").is_some_and(|v| v.starts_with("avoid"));
    style.break_before_page = get("break-before").is_some_and(|v| matches!(v, "page" | "left" | "right"));
    match get("break-after") {
        Some(value) if value.starts_with("avoid") => style.break_after_avoid = true,
        Some("page" | "left" | "right") => style.break_after_page = true,
        _ => {}
    }

    style
}

#[cfg(test)]
mod tests {
    use mdstyler_renderer::parse_fragment;
    use mdstyler_theme::{ThemeConfig, synthesize};
    use pretty_assertions::assert_eq;

    use super::*;

    fn styled(html: &str, css: &str, media: Media) -> (Surface, ComputedStyles) {
        let mut surface = Surface::preview();
        let content = surface.preview_content().unwrap();
        surface
            .set_children_markup(content, &parse_fragment(html).unwrap())
            .unwrap();
        let styles = StyleResolver::new(media)
            .with_stylesheet(Stylesheet::parse(css))
            .resolve(&surface, content);
        (surface, styles)
    }

    fn style_of<'a>(surface: &Surface, styles: &'a ComputedStyles, selector: &str) -> &'a ComputedStyle {
        let id = surface.select(surface.document(), selector).unwrap()[0];
        styles.get(id).unwrap()
    }

    #[test]
    fn test_order_specificity_and_importance() {
        let css = "p { color: red } p { color: blue } .a { color: green } p.b { color: #010203 !important } .b.c { color: white }";
        let (surface, styles) = styled(r#"<p>x</p><p class="a">y</p><p class="b c">z</p>"#, css, Media::Screen);
        let colors: Vec<_> = surface
            .select(surface.document(), "p")
            .unwrap()
            .into_iter()
            .map(|id| styles.get(id).unwrap().color.to_string())
            .collect();
        assert_eq!(colors, vec!["rgb(0, 0, 255)", "rgb(0, 128, 0)", "rgb(1, 2, 3)"]);
    }

    #[test]
    fn test_inline_style_wins_over_rules() {
        let (surface, styles) = styled(
            r#"<p style="color: red">a</p><p class="x" style="color: red">b</p>"#,
            "p { color: blue } .x { color: green !important }",
            Media::Screen,
        );
        assert_eq!(style_of(&surface, &styles, "p").color, Rgba::rgb(255, 0, 0));
        assert_eq!(style_of(&surface, &styles, ".x").color, Rgba::rgb(0, 128, 0));
    }

    #[test]
    fn test_inheritance_and_em() {
        let (surface, styles) = styled(
            "<h2>Title <em>emph</em></h2><p><code>c</code></p>",
            ".preview-content { font-size: 20px; color: #a9b1d6; line-height: 1.5 } h2 { font-size: 1.5em } code { font-size: 0.875em; color: currentColor }",
            Media::Screen,
        );
        let heading = style_of(&surface, &styles, "h2");
        assert_eq!(heading.font_size, 30.0);
        assert_eq!(heading.font_weight, 700);
        assert_eq!(heading.line_height_px(), 45.0);
        let emphasis = style_of(&surface, &styles, "em");
        assert_eq!(emphasis.font_size, 30.0);
        assert_eq!(emphasis.font_style, FontStyle::Italic);
        let code = style_of(&surface, &styles, "code");
        assert_eq!(code.font_size, 17.5);
        assert_eq!(code.color, Rgba::rgb(0xa9, 0xb1, 0xd6));
        assert_eq!(code.font_family, "monospace");
    }

    #[test]
    fn test_borders_and_backgrounds() {
        let (surface, styles) = styled(
            "<blockquote>q</blockquote><hr><pre>p</pre>",
            "blockquote { background: #24283b; border-left: 4px solid #565f89; color: white } hr { border: none; border-top: 1px solid #56 } pre { background: none }",
            Media::Screen,
        );
        let quote = style_of(&surface, &styles, "blockquote");
        assert_eq!(quote.background_color, Rgba::rgb(0x24, 0x28, 0x3b));
        assert_eq!(quote.border_width.left, 4.0);
        assert_eq!(quote.border_width.top, 0.0);
        assert_eq!(quote.border_color[3], Rgba::rgb(0x56, 0x5f, 0x89));
        assert_eq!(quote.border_color[0], Rgba::WHITE);

        let rule = style_of(&surface, &styles, "hr");
        assert_eq!(rule.border_width.top, 1.0);
        assert_eq!(rule.border_width.bottom, 0.0);

        let pre = style_of(&surface, &styles, "pre");
        assert!(pre.background_color.is_transparent());
        assert!(pre.white_space.preserves_newlines());
    }

    #[test]
    fn test_print_media_rules() {
        let css = "p { color: red } @media print { p { color: black } } @media screen { p { margin: 0 } }";
        let (surface, screen) = styled("<p>x</p>", css, Media::Screen);
        assert_eq!(style_of(&surface, &screen, "p").color, Rgba::rgb(255, 0, 0));
        assert_eq!(style_of(&surface, &screen, "p").margin.top, 0.0);

        let (surface, print) = styled("<p>x</p>", css, Media::Print);
        assert_eq!(style_of(&surface, &print, "p").color, Rgba::BLACK);
        assert_eq!(style_of(&surface, &print, "p").margin.top, 16.0);
    }

    #[test]
    fn test_break_properties() {
        let (surface, styles) = styled(
            r#"<pre style="page-break-inside: avoid">x</pre><h2 style="break-after: avoid">h</h2><div style="page-break-before: always">d</div>"#,
            "",
            Media::Screen,
        );
        assert!(style_of(&surface, &styles, "pre").break_inside_avoid);
        assert!(style_of(&surface, &styles, "h2").break_after_avoid);
        assert!(style_of(&surface, &styles, ".preview-content > div").break_before_page);
    }

    #[test]
    fn test_synthesized_sheet() {
        let config = ThemeConfig::default();
        let css = synthesize(&config, ".preview-content h2 { color: #ff0000; }");
        let (surface, styles) = styled(
            "<h2>h</h2><blockquote class=\"callout callout-note\" data-callout=\"note\"><p>n</p></blockquote><table><tr><td>1</td></tr><tr><td>2</td></tr></table>",
            &css,
            Media::Screen,
        );

        let content = style_of(&surface, &styles, ".preview-content");
        assert_eq!(content.background_color, Rgba::parse(&config.background_color).unwrap());
        assert_eq!(content.padding.top, config.margin_top * 96.0 / 25.4);

        assert_eq!(style_of(&surface, &styles, "h2").color, Rgba::rgb(255, 0, 0));

        let note = style_of(&surface, &styles, ".callout-note");
        assert_eq!(note.background_color.to_string(), "rgba(122, 162, 247, 0.125)");
        assert_eq!(note.border_color[3], Rgba::rgb(0x7a, 0xa2, 0xf7));

        let rows = surface.select(surface.document(), "tr").unwrap();
        assert!(styles.get(rows[0]).unwrap().background_color.is_transparent());
        assert!(!styles.get(rows[1]).unwrap().background_color.is_transparent());
    }

    #[test]
    fn test_shorthand_expansion() {
        assert_eq!(
            expand_shorthand("margin", "1em 2px"),
            vec![
                ("margin-top".to_owned(), "1em".to_owned()),
                ("margin-right".to_owned(), "2px".to_owned()),
                ("margin-bottom".to_owned(), "1em".to_owned()),
                ("margin-left".to_owned(), "2px".to_owned()),
            ]
        );
        assert_eq!(
            expand_shorthand("border-color", "red")[3],
            ("border-left-color".to_owned(), "red".to_owned())
        );
        assert!(expand_shorthand("padding", "1px 2px 3px 4px 5px").is_empty());
    }

    #[test]
    fn test_lengths() {
        assert_eq!(length("12pt", 16.0), Some(16.0));
        assert_eq!(length("0", 16.0), Some(0.0));
        assert_eq!(length("2", 16.0), None);
        assert_eq!(length("1.5em", 10.0), Some(15.0));
        assert_eq!(font_size("150%", 16.0), Some(24.0));
        assert_eq!(font_weight("bolder", 600), Some(900));
    }
}
