//! Styled markup tree.
//!
//! The pipeline lowers the syntax tree into [`MarkupNode`]s, rewrites them
//! in later passes and finally serializes them with [`to_html`]. Markup text
//! coming from outside the tree (raw HTML in the source, diagram SVG,
//! highlighter output) is turned back into nodes by [`parse_fragment`].

use std::borrow::Cow;
use std::fmt::Write;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// Elements that never have children or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Errors from parsing a markup fragment.
#[derive(Debug, thiserror::Error)]
pub enum MarkupError {
    #[error("Markup parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Markup encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
}

/// A node of the styled markup tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkupNode {
    Element(Element),
    Text(String),
    /// Markup emitted verbatim on serialization.
    Raw(String),
    Comment(String),
}

/// An element with ordered attributes and children.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: MarkupNode) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(MarkupNode::Text(text.into()))
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<MarkupNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Get an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    /// Append a class to the `class` attribute.
    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let classes = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_owned(),
        };
        self.set_attr("class", classes);
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        collect_text(&self.children, &mut text);
        text
    }
}

fn collect_text(nodes: &[MarkupNode], out: &mut String) {
    for node in nodes {
        match node {
            MarkupNode::Element(element) => collect_text(&element.children, out),
            MarkupNode::Text(text) => out.push_str(text),
            MarkupNode::Raw(_) | MarkupNode::Comment(_) => {}
        }
    }
}

/// Check whether `tag` is a void element.
pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(tag))
}

/// Visit every element depth-first, parents before children.
pub fn visit_elements_mut(nodes: &mut [MarkupNode], f: &mut impl FnMut(&mut Element)) {
    for node in nodes {
        if let MarkupNode::Element(element) = node {
            f(element);
            visit_elements_mut(&mut element.children, f);
        }
    }
}

/// Serialize nodes to HTML.
pub fn to_html(nodes: &[MarkupNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

/// Serialize a single node to `out`.
pub fn write_node(out: &mut String, node: &MarkupNode) {
    match node {
        MarkupNode::Element(element) => {
            write_start_tag(out, &element.tag, &element.attrs);
            if is_void(&element.tag) {
                return;
            }
            for child in &element.children {
                write_node(out, child);
            }
            let _ = write!(out, "</{}>", element.tag);
        }
        MarkupNode::Text(text) => out.push_str(&escape_html(text)),
        MarkupNode::Raw(raw) => out.push_str(raw),
        MarkupNode::Comment(comment) => {
            let _ = write!(out, "<!--{comment}-->");
        }
    }
}

/// Write `<tag attr="value">`.
pub fn write_start_tag(out: &mut String, tag: &str, attrs: &[(String, String)]) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attrs {
        let _ = write!(out, r#" {name}="{}""#, escape_html(value));
    }
    out.push('>');
}

/// Escape HTML special characters.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Parse an HTML fragment into markup nodes.
///
/// Parsing is lenient: end tags close the nearest matching open element,
/// unmatched end tags are ignored, void elements never take children and
/// elements still open at the end of input are closed implicitly. A `&`
/// that does not start a reference and a `<` that does not start a tag are
/// text. The content of raw-text elements (`script`, `style`, `textarea`,
/// `title`) is kept as a single [`MarkupNode::Raw`] child.
pub fn parse_fragment(html: &str) -> Result<Vec<MarkupNode>, MarkupError> {
    let mut builder = TreeBuilder::default();
    let mut rest = html;
    while let Some(split) = split_raw_text(rest) {
        parse_markup(&mut builder, &escape_stray(split.markup))?;
        if !split.text.is_empty() {
            builder.append(MarkupNode::Raw(split.text.to_owned()));
        }
        builder.close(split.tag);
        rest = split.rest;
    }
    parse_markup(&mut builder, &escape_stray(rest))?;

    Ok(builder.finish())
}

fn parse_markup(builder: &mut TreeBuilder, html: &str) -> Result<(), MarkupError> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let element = decode_element(&reader, &e);
                builder.open(element);
            }
            Event::Empty(e) => {
                let element = decode_element(&reader, &e);
                builder.append(MarkupNode::Element(element));
            }
            Event::End(e) => {
                let name = decode_lossy(&reader, e.name().as_ref());
                builder.close(&name);
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                builder.push_text(&text);
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?;
                builder.push_text(&decode_entity(&entity));
            }
            Event::CData(e) => builder.push_text(&String::from_utf8_lossy(&e)),
            Event::Comment(e) => {
                let comment = reader.decoder().decode(&e)?.into_owned();
                builder.append(MarkupNode::Comment(comment));
            }
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => return Ok(()),
        }
    }
}

/// Elements whose content is text, never markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

pub fn is_raw_text(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|raw| raw.eq_ignore_ascii_case(tag))
}

/// Input cut around the content of the first raw-text element.
struct RawTextSplit<'a> {
    /// Everything up to and including the element's start tag.
    markup: &'a str,
    tag: &'a str,
    text: &'a str,
    /// Everything after the element's end tag.
    rest: &'a str,
}

fn split_raw_text(input: &str) -> Option<RawTextSplit<'_>> {
    let mut pos = 0;
    while let Some(offset) = input[pos..].find('<') {
        let start = pos + offset;
        let after = &input[start + 1..];
        if after.starts_with("!--") {
            pos = start + 1 + after.find("-->")? + 3;
            continue;
        }
        pos = start + 1;

        let name_len = after.bytes().take_while(u8::is_ascii_alphanumeric).count();
        let tag = &after[..name_len];
        let boundary = after.as_bytes().get(name_len);
        if name_len == 0
            || !is_raw_text(tag)
            || !boundary.is_some_and(|&c| c == b'>' || c == b'/' || c.is_ascii_whitespace())
        {
            continue;
        }

        let tag_end = start + 1 + name_len + start_tag_end(&after[name_len..])?;
        if input[..tag_end].ends_with('/') {
            pos = tag_end + 1;
            continue;
        }

        let body = &input[tag_end + 1..];
        let (text, rest) = match find_end_tag(body, tag) {
            Some((text_end, rest_start)) => (&body[..text_end], &body[rest_start..]),
            None => (body, ""),
        };
        return Some(RawTextSplit {
            markup: &input[..=tag_end],
            tag,
            text,
            rest,
        });
    }
    None
}

/// Offset of the `>` closing a start tag, skipping quoted attribute values.
fn start_tag_end(tag: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in tag.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(open), _) if c == open => quote = None,
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}

/// Start of `</tag` in `body` and the offset just past its `>`.
fn find_end_tag(body: &str, tag: &str) -> Option<(usize, usize)> {
    let lower = body.to_ascii_lowercase();
    let needle = format!("</{}", tag.to_ascii_lowercase());
    let mut from = 0;
    while let Some(offset) = lower[from..].find(&needle) {
        let start = from + offset;
        let after = start + needle.len();
        match lower.as_bytes().get(after) {
            None => return Some((start, body.len())),
            Some(&c) if c == b'>' || c == b'/' || c.is_ascii_whitespace() => {
                let close = lower[after..].find('>').map_or(body.len(), |i| after + i + 1);
                return Some((start, close));
            }
            Some(_) => from = after,
        }
    }
    None
}

/// Escape `&` and `<` that HTML reads as text but an XML reader rejects.
fn escape_stray(markup: &str) -> Cow<'_, str> {
    let mut escaped = String::new();
    let mut copied = 0;
    let mut pos = 0;
    while let Some(offset) = markup[pos..].find(['<', '&']) {
        let at = pos + offset;
        let tail = &markup[at + 1..];
        if markup[at..].starts_with("<!--") {
            pos = tail.find("-->").map_or(markup.len(), |end| at + 1 + end + 3);
            continue;
        }

        let replacement = if markup[at..].starts_with('&') {
            (!starts_reference(tail)).then_some("&amp;")
        } else {
            (!starts_tag(tail)).then_some("&lt;")
        };
        if let Some(replacement) = replacement {
            escaped.push_str(&markup[copied..at]);
            escaped.push_str(replacement);
            copied = at + 1;
        }
        pos = at + 1;
    }

    if copied == 0 {
        Cow::Borrowed(markup)
    } else {
        escaped.push_str(&markup[copied..]);
        Cow::Owned(escaped)
    }
}

/// Whether the text after `&` is `name;`, `#123;` or `#x1F;`.
fn starts_reference(tail: &str) -> bool {
    let Some(end) = tail.find(';') else {
        return false;
    };
    let body = &tail[..end];
    match body.strip_prefix('#') {
        Some(number) => match number.strip_prefix(['x', 'X']) {
            Some(hex) => !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()),
            None => !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()),
        },
        None => {
            body.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
                && body.chars().all(|c| c.is_ascii_alphanumeric())
        }
    }
}

/// Whether the text after `<` opens a tag, end tag, comment or declaration.
fn starts_tag(tail: &str) -> bool {
    let mut chars = tail.chars();
    match chars.next() {
        Some('!' | '?') => true,
        Some('/') => chars.next().is_some_and(|c| c.is_ascii_alphabetic()),
        Some(c) => c.is_ascii_alphabetic(),
        None => false,
    }
}

#[derive(Default)]
struct TreeBuilder {
    roots: Vec<MarkupNode>,
    open: Vec<Element>,
}

impl TreeBuilder {
    fn append(&mut self, node: MarkupNode) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let siblings = match self.open.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.roots,
        };
        if let Some(MarkupNode::Text(last)) = siblings.last_mut() {
            last.push_str(text);
        } else {
            siblings.push(MarkupNode::Text(text.to_owned()));
        }
    }

    fn open(&mut self, element: Element) {
        if is_void(&element.tag) {
            self.append(MarkupNode::Element(element));
        } else {
            self.open.push(element);
        }
    }

    fn close(&mut self, name: &str) {
        let Some(position) = self
            .open
            .iter()
            .rposition(|element| element.tag.eq_ignore_ascii_case(name))
        else {
            return;
        };
        while self.open.len() > position {
            if let Some(element) = self.open.pop() {
                self.append(MarkupNode::Element(element));
            }
        }
    }

    fn finish(mut self) -> Vec<MarkupNode> {
        while let Some(element) = self.open.pop() {
            self.append(MarkupNode::Element(element));
        }
        self.roots
    }
}

fn decode_element(reader: &Reader<&[u8]>, e: &BytesStart) -> Element {
    let mut element = Element::new(decode_lossy(reader, e.name().as_ref()));
    for attr in e.html_attributes().flatten() {
        let name = decode_lossy(reader, attr.key.as_ref());
        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            Cow::into_owned,
        );
        element.attrs.push((name, value));
    }
    element
}

fn decode_lossy(reader: &Reader<&[u8]>, bytes: &[u8]) -> String {
    reader.decoder().decode(bytes).map_or_else(
        |_| String::from_utf8_lossy(bytes).into_owned(),
        Cow::into_owned,
    )
}

/// Decode an entity reference body (`amp`, `#160`, `#xA0`, `nbsp`).
///
/// Unknown entities are preserved literally.
fn decode_entity(entity: &str) -> String {
    if let Some(number) = entity.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => number.parse::<u32>().ok(),
        };
        return code
            .and_then(char::from_u32)
            .map_or_else(|| format!("&{entity};"), |c| c.to_string());
    }

    let decoded = match entity {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "apos" => "'",
        "quot" => "\"",
        "nbsp" => "\u{00a0}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "hellip" => "\u{2026}",
        "middot" => "\u{00b7}",
        "bull" => "\u{2022}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "laquo" => "\u{00ab}",
        "raquo" => "\u{00bb}",
        "larr" => "\u{2190}",
        "rarr" => "\u{2192}",
        "uarr" => "\u{2191}",
        "darr" => "\u{2193}",
        "times" => "\u{00d7}",
        "divide" => "\u{00f7}",
        "plusmn" => "\u{00b1}",
        "le" => "\u{2264}",
        "ge" => "\u{2265}",
        "ne" => "\u{2260}",
        "deg" => "\u{00b0}",
        "copy" => "\u{00a9}",
        "reg" => "\u{00ae}",
        "trade" => "\u{2122}",
        "sect" => "\u{00a7}",
        "para" => "\u{00b6}",
        "euro" => "\u{20ac}",
        "pound" => "\u{00a3}",
        _ => return format!("&{entity};"),
    };
    decoded.to_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn element(node: &MarkupNode) -> &Element {
        match node {
            MarkupNode::Element(element) => element,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<script>"), "&lt;script&gt;");
        assert_eq!(escape_html("a & b"), "a &amp; b");
        assert_eq!(escape_html(r#""quoted""#), "&quot;quoted&quot;");
        assert_eq!(escape_html("it's"), "it&#x27;s");
    }

    #[test]
    fn test_serialize_element() {
        let node = MarkupNode::Element(
            Element::new("p")
                .with_attr("class", "lead")
                .with_text("a < b")
                .with_child(MarkupNode::Element(Element::new("br"))),
        );
        assert_eq!(to_html(&[node]), r#"<p class="lead">a &lt; b<br></p>"#);
    }

    #[test]
    fn test_serialize_raw_and_comment() {
        let nodes = vec![
            MarkupNode::Raw("<b>x</b>".to_owned()),
            MarkupNode::Comment(" note ".to_owned()),
        ];
        assert_eq!(to_html(&nodes), "<b>x</b><!-- note -->");
    }

    #[test]
    fn test_parse_nested() {
        let nodes = parse_fragment(r#"<div class="box"><span>Hi</span> there</div>"#).unwrap();
        assert_eq!(nodes.len(), 1);
        let div = element(&nodes[0]);
        assert_eq!(div.tag, "div");
        assert_eq!(div.attr("class"), Some("box"));
        assert_eq!(div.children.len(), 2);
        assert_eq!(div.text_content(), "Hi there");
    }

    #[test]
    fn test_parse_void_elements_without_slash() {
        let nodes = parse_fragment("<p>a<br>b<img src=x.png></p>").unwrap();
        let p = element(&nodes[0]);
        assert_eq!(p.children.len(), 4);
        assert_eq!(element(&p.children[1]).tag, "br");
        assert_eq!(element(&p.children[3]).attr("src"), Some("x.png"));
    }

    #[test]
    fn test_parse_valueless_attribute() {
        let nodes = parse_fragment("<input type=checkbox checked>").unwrap();
        let input = element(&nodes[0]);
        assert_eq!(input.attr("type"), Some("checkbox"));
        assert_eq!(input.attr("checked"), Some(""));
    }

    #[test]
    fn test_parse_unmatched_end_ignored() {
        let nodes = parse_fragment("<b>bold</i></b>tail").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(element(&nodes[0]).text_content(), "bold");
        assert_eq!(nodes[1], MarkupNode::Text("tail".to_owned()));
    }

    #[test]
    fn test_parse_unclosed_elements_closed_at_end() {
        let nodes = parse_fragment("<div><em>open").unwrap();
        let div = element(&nodes[0]);
        assert_eq!(element(&div.children[0]).text_content(), "open");
    }

    #[test]
    fn test_parse_entities() {
        let nodes = parse_fragment("<p>a&nbsp;&amp;&#65;&#x42;&bogus;</p>").unwrap();
        assert_eq!(element(&nodes[0]).text_content(), "a\u{a0}&AB&bogus;");
    }

    #[test]
    fn test_parse_stray_ampersand_and_angle() {
        let nodes = parse_fragment(r#"<p title="a&b">R&D &amp; 3 < 4 &#65 </p>"#).unwrap();
        let p = element(&nodes[0]);
        assert_eq!(p.attr("title"), Some("a&b"));
        assert_eq!(p.text_content(), "R&D & 3 < 4 &#65 ");
    }

    #[test]
    fn test_parse_raw_text_elements() {
        let nodes =
            parse_fragment("<title>A <b>&amp;</b></title><textarea rows=2></p></textarea>tail").unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(
            element(&nodes[0]).children,
            vec![MarkupNode::Raw("A <b>&amp;</b>".to_owned())]
        );
        assert_eq!(
            element(&nodes[1]).children,
            vec![MarkupNode::Raw("</p>".to_owned())]
        );
        assert_eq!(nodes[2], MarkupNode::Text("tail".to_owned()));
    }

    #[test]
    fn test_parse_unclosed_raw_text_runs_to_end() {
        let nodes = parse_fragment("<script>let x = '<div>';").unwrap();
        assert_eq!(
            element(&nodes[0]).children,
            vec![MarkupNode::Raw("let x = '<div>';".to_owned())]
        );
    }

    #[test]
    fn test_raw_text_tag_in_comment_ignored() {
        let nodes = parse_fragment("<!-- <style> --><p>a &amp; b</p>").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(element(&nodes[1]).text_content(), "a & b");
    }

    #[test]
    fn test_parse_svg_keeps_case_and_namespaces() {
        let svg = r#"<?xml version="1.0"?><svg xmlns="http://www.w3.org/2000/svg"><linearGradient id="g"/><path d="M0 0"/></svg>"#;
        let nodes = parse_fragment(svg).unwrap();
        assert_eq!(nodes.len(), 1);
        let root = element(&nodes[0]);
        assert_eq!(root.tag, "svg");
        assert_eq!(element(&root.children[0]).tag, "linearGradient");
    }

    #[test]
    fn test_parse_comment() {
        let nodes = parse_fragment("<!-- hidden --><p>x</p>").unwrap();
        assert_eq!(nodes[0], MarkupNode::Comment(" hidden ".to_owned()));
    }

    #[test]
    fn test_add_class() {
        let mut el = Element::new("blockquote");
        el.add_class("callout");
        el.add_class("callout-note");
        el.add_class("callout");
        assert_eq!(el.attr("class"), Some("callout callout-note"));
        assert!(el.has_class("callout-note"));
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let html = r#"<ul><li class="task-list-item"><input type="checkbox" disabled="">done</li></ul>"#;
        let nodes = parse_fragment(html).unwrap();
        assert_eq!(to_html(&nodes), html);
    }
}
