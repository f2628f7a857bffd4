//! Lowering of the syntax tree into the markup tree.

use std::collections::HashMap;

use crate::markup::{Element, MarkupNode};
use crate::syntax::{Alignment, NodeKind, SyntaxNode};
use crate::toc::{HeadingState, TocEntry, slugify};

/// Output of [`lower`].
#[derive(Debug)]
pub struct Lowered {
    pub nodes: Vec<MarkupNode>,
    pub title: Option<String>,
    pub toc: Vec<TocEntry>,
}

/// Lower a syntax tree into markup nodes.
///
/// With `allow_raw_html`, raw markup in the source becomes
/// [`MarkupNode::Raw`] and reaches the output unescaped. Without it the
/// markup is kept as text and escaped on serialization.
pub fn lower(root: &SyntaxNode, allow_raw_html: bool) -> Lowered {
    let mut lowerer = Lowerer {
        allow_raw_html,
        headings: HeadingState::default(),
        footnote_numbers: HashMap::new(),
        footnotes: Vec::new(),
    };

    let mut nodes = lowerer.lower_children(root);
    if let Some(section) = lowerer.footnote_section() {
        nodes.push(section);
    }

    let (title, toc) = lowerer.headings.finish();
    Lowered { nodes, title, toc }
}

struct Lowerer {
    allow_raw_html: bool,
    headings: HeadingState,
    /// Footnote label to display number, in order of first reference.
    footnote_numbers: HashMap<String, usize>,
    footnotes: Vec<(String, Vec<MarkupNode>)>,
}

impl Lowerer {
    fn lower_children(&mut self, node: &SyntaxNode) -> Vec<MarkupNode> {
        let mut out = Vec::with_capacity(node.children.len());
        for child in &node.children {
            self.lower_node(child, &mut out);
        }
        out
    }

    fn lower_node(&mut self, node: &SyntaxNode, out: &mut Vec<MarkupNode>) {
        let mut element = match &node.kind {
            NodeKind::Root | NodeKind::Fragment => {
                out.extend(self.lower_children(node));
                return;
            }
            NodeKind::Text(text) => {
                out.push(MarkupNode::Text(text.clone()));
                return;
            }
            NodeKind::Html(html) | NodeKind::InlineHtml(html) => {
                out.push(if self.allow_raw_html {
                    MarkupNode::Raw(html.clone())
                } else {
                    MarkupNode::Text(html.clone())
                });
                return;
            }
            NodeKind::FootnoteDefinition(label) => {
                let children = self.lower_children(node);
                self.footnotes.push((label.clone(), children));
                return;
            }
            NodeKind::Paragraph => self.container("p", node),
            NodeKind::Heading { level } => {
                let id = self.headings.register(*level, &node.plain_text());
                self.container(&format!("h{level}"), node).with_attr("id", id)
            }
            NodeKind::BlockQuote => self.container("blockquote", node),
            NodeKind::List { start } => self.list(*start, node),
            NodeKind::ListItem { checked } => self.list_item(*checked, node),
            NodeKind::CodeBlock { language, value } => code_block(language.as_deref(), value),
            NodeKind::Table { alignments } => self.table(alignments, node),
            NodeKind::TableHead | NodeKind::TableRow | NodeKind::TableCell => {
                self.container("tr", node)
            }
            NodeKind::Emphasis => self.container("em", node),
            NodeKind::Strong => self.container("strong", node),
            NodeKind::Strikethrough => self.container("del", node),
            NodeKind::Link { url, title } => {
                let mut link = self.container("a", node).with_attr("href", url.as_str());
                if !title.is_empty() {
                    link.set_attr("title", title.as_str());
                }
                link
            }
            NodeKind::Image { url, title } => {
                let mut image = Element::new("img")
                    .with_attr("src", url.as_str())
                    .with_attr("alt", node.plain_text());
                if !title.is_empty() {
                    image.set_attr("title", title.as_str());
                }
                image
            }
            NodeKind::InlineCode(code) => Element::new("code").with_text(code.as_str()),
            NodeKind::InlineMath(tex) => Element::new("span")
                .with_attr("class", "math math-inline")
                .with_text(tex.as_str()),
            NodeKind::DisplayMath(tex) => Element::new("span")
                .with_attr("class", "math math-display")
                .with_text(tex.as_str()),
            NodeKind::FootnoteReference(label) => self.footnote_reference(label),
            NodeKind::ThematicBreak => Element::new("hr"),
            NodeKind::HardBreak => Element::new("br"),
        };

        apply_attributes(&mut element, node);
        out.push(MarkupNode::Element(element));
    }

    fn container(&mut self, tag: &str, node: &SyntaxNode) -> Element {
        Element::new(tag).with_children(self.lower_children(node))
    }

    fn list(&mut self, start: Option<u64>, node: &SyntaxNode) -> Element {
        let mut list = match start {
            Some(start) => {
                let list = self.container("ol", node);
                if start == 1 {
                    list
                } else {
                    list.with_attr("start", start.to_string())
                }
            }
            None => self.container("ul", node),
        };
        let has_tasks = node
            .children
            .iter()
            .any(|item| matches!(item.kind, NodeKind::ListItem { checked: Some(_) }));
        if has_tasks {
            list.add_class("contains-task-list");
        }
        list
    }

    fn list_item(&mut self, checked: Option<bool>, node: &SyntaxNode) -> Element {
        let mut item = self.container("li", node);
        let Some(checked) = checked else {
            return item;
        };

        item.add_class("task-list-item");
        let mut checkbox = Element::new("input")
            .with_attr("type", "checkbox")
            .with_attr("disabled", "");
        if checked {
            checkbox.set_attr("checked", "");
        }
        let checkbox = MarkupNode::Element(checkbox);

        match item.children.first_mut() {
            Some(MarkupNode::Element(paragraph)) if paragraph.is("p") => {
                paragraph.children.insert(0, checkbox);
            }
            _ => item.children.insert(0, checkbox),
        }
        item
    }

    fn table(&mut self, alignments: &[Alignment], node: &SyntaxNode) -> Element {
        let mut table = Element::new("table");
        let mut body = Element::new("tbody");

        for part in &node.children {
            match part.kind {
                NodeKind::TableHead => {
                    let row = self.table_row(part, alignments, "th");
                    table
                        .children
                        .push(MarkupNode::Element(Element::new("thead").with_child(row)));
                }
                NodeKind::TableRow => {
                    let row = self.table_row(part, alignments, "td");
                    body.children.push(row);
                }
                _ => {}
            }
        }

        if !body.children.is_empty() {
            table.children.push(MarkupNode::Element(body));
        }
        table
    }

    fn table_row(&mut self, row: &SyntaxNode, alignments: &[Alignment], cell_tag: &str) -> MarkupNode {
        let mut tr = Element::new("tr");
        for (index, cell) in row.children.iter().enumerate() {
            let mut td = self.container(cell_tag, cell);
            if let Some(style) = alignment_style(alignments.get(index).copied()) {
                td.set_attr("style", style);
            }
            tr.children.push(MarkupNode::Element(td));
        }
        MarkupNode::Element(tr)
    }

    fn footnote_reference(&mut self, label: &str) -> Element {
        let next = self.footnote_numbers.len() + 1;
        let is_first = !self.footnote_numbers.contains_key(label);
        let number = *self.footnote_numbers.entry(label.to_owned()).or_insert(next);

        let id = footnote_id(label);
        let mut link = Element::new("a")
            .with_attr("href", format!("#fn-{id}"))
            .with_text(number.to_string());
        if is_first {
            link.set_attr("id", format!("fnref-{id}"));
        }
        Element::new("sup")
            .with_attr("class", "footnote-ref")
            .with_child(MarkupNode::Element(link))
    }

    fn footnote_section(&mut self) -> Option<MarkupNode> {
        if self.footnotes.is_empty() {
            return None;
        }

        let mut definitions = std::mem::take(&mut self.footnotes);
        let unreferenced = self.footnote_numbers.len() + 1;
        definitions.sort_by_key(|(label, _)| {
            self.footnote_numbers
                .get(label)
                .copied()
                .unwrap_or(unreferenced)
        });

        let mut list = Element::new("ol");
        for (label, mut children) in definitions {
            let id = footnote_id(&label);
            let backref = MarkupNode::Element(
                Element::new("a")
                    .with_attr("href", format!("#fnref-{id}"))
                    .with_attr("class", "footnote-backref")
                    .with_text("\u{21a9}"),
            );
            match children.last_mut() {
                Some(MarkupNode::Element(last)) if last.is("p") => {
                    last.children.push(MarkupNode::Text(" ".to_owned()));
                    last.children.push(backref);
                }
                _ => children.push(backref),
            }
            list.children.push(MarkupNode::Element(
                Element::new("li")
                    .with_attr("id", format!("fn-{id}"))
                    .with_children(children),
            ));
        }

        Some(MarkupNode::Element(
            Element::new("section")
                .with_attr("class", "footnotes")
                .with_child(MarkupNode::Element(list)),
        ))
    }
}

fn code_block(language: Option<&str>, value: &str) -> Element {
    let mut code = Element::new("code").with_text(value);
    if let Some(language) = language {
        code.set_attr("class", format!("language-{language}"));
    }
    Element::new("pre").with_child(MarkupNode::Element(code))
}

fn alignment_style(alignment: Option<Alignment>) -> Option<&'static str> {
    match alignment {
        Some(Alignment::Left) => Some("text-align:left"),
        Some(Alignment::Center) => Some("text-align:center"),
        Some(Alignment::Right) => Some("text-align:right"),
        Some(Alignment::None) | None => None,
    }
}

fn footnote_id(label: &str) -> String {
    let slug = slugify(label);
    if slug.is_empty() { label.to_owned() } else { slug }
}

/// Copy rendering attributes from a syntax node; classes are merged.
fn apply_attributes(element: &mut Element, node: &SyntaxNode) {
    for (name, value) in &node.attributes {
        if name == "class" {
            for class in value.split_whitespace() {
                element.add_class(class);
            }
        } else {
            element.set_attr(name.as_str(), value.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::callout::annotate_callouts;
    use crate::markup::to_html;
    use crate::syntax::parse;

    fn lower_html(source: &str) -> String {
        let mut root = parse(source);
        annotate_callouts(&mut root);
        to_html(&lower(&root, true).nodes)
    }

    #[test]
    fn test_paragraph_and_inline() {
        assert_eq!(
            lower_html("Some **bold**, *em* and ~~gone~~ `code`."),
            "<p>Some <strong>bold</strong>, <em>em</em> and <del>gone</del> <code>code</code>.</p>"
        );
    }

    #[test]
    fn test_heading_ids_and_toc() {
        let root = parse("# Title\n\n## Setup\n\n## Setup");
        let lowered = lower(&root, true);
        assert_eq!(lowered.title.as_deref(), Some("Title"));
        assert_eq!(
            to_html(&lowered.nodes),
            r#"<h1 id="title">Title</h1><h2 id="setup">Setup</h2><h2 id="setup-1">Setup</h2>"#
        );
        assert_eq!(lowered.toc.len(), 2);
        assert_eq!(lowered.toc[1].id, "setup-1");
    }

    #[test]
    fn test_callout_attributes() {
        assert_eq!(
            lower_html("> [!WARNING]\nBe careful"),
            r#"<blockquote class="callout callout-warning" data-callout="warning"><p>Be careful</p></blockquote>"#
        );
    }

    #[test]
    fn test_code_block_language_class() {
        assert_eq!(
            lower_html("```mermaid\ngraph TD; A-->B\n```"),
            "<pre><code class=\"language-mermaid\">graph TD; A--&gt;B\n</code></pre>"
        );
    }

    #[test]
    fn test_task_list() {
        assert_eq!(
            lower_html("- [x] done\n- [ ] todo"),
            concat!(
                r#"<ul class="contains-task-list">"#,
                r#"<li class="task-list-item"><input type="checkbox" disabled="" checked="">done</li>"#,
                r#"<li class="task-list-item"><input type="checkbox" disabled="">todo</li>"#,
                "</ul>"
            )
        );
    }

    #[test]
    fn test_ordered_list_start() {
        assert_eq!(lower_html("3. c\n4. d"), r#"<ol start="3"><li>c</li><li>d</li></ol>"#);
        assert_eq!(lower_html("1. a"), "<ol><li>a</li></ol>");
    }

    #[test]
    fn test_table_alignment() {
        assert_eq!(
            lower_html("| a | b |\n|:--|--:|\n| 1 | 2 |"),
            concat!(
                "<table><thead><tr>",
                r#"<th style="text-align:left">a</th><th style="text-align:right">b</th>"#,
                "</tr></thead><tbody><tr>",
                r#"<td style="text-align:left">1</td><td style="text-align:right">2</td>"#,
                "</tr></tbody></table>"
            )
        );
    }

    #[test]
    fn test_link_and_image() {
        assert_eq!(
            lower_html(r#"[Docs](https://docs.rs "Rust docs") ![Logo *x*](logo.png)"#),
            concat!(
                r#"<p><a href="https://docs.rs" title="Rust docs">Docs</a> "#,
                r#"<img src="logo.png" alt="Logo x"></p>"#
            )
        );
    }

    #[test]
    fn test_math_placeholders() {
        assert_eq!(
            lower_html("$a+b$"),
            r#"<p><span class="math math-inline">a+b</span></p>"#
        );
    }

    #[test]
    fn test_raw_html_passthrough() {
        assert_eq!(
            lower_html("<div class=\"x\">hi</div>\n"),
            "<div class=\"x\">hi</div>\n"
        );
    }

    #[test]
    fn test_raw_html_escaped_when_disabled() {
        let root = parse("<b>hi</b>");
        let html = to_html(&lower(&root, false).nodes);
        assert_eq!(html, "<p>&lt;b&gt;hi&lt;/b&gt;</p>");
    }

    #[test]
    fn test_footnotes_section() {
        let html = lower_html("A[^b] B[^a].\n\n[^a]: First def.\n\n[^b]: Second def.");
        assert_eq!(
            html,
            concat!(
                r##"<p>A<sup class="footnote-ref"><a href="#fn-b" id="fnref-b">1</a></sup>"##,
                r##" B<sup class="footnote-ref"><a href="#fn-a" id="fnref-a">2</a></sup>.</p>"##,
                r#"<section class="footnotes"><ol>"#,
                r##"<li id="fn-b"><p>Second def. <a href="#fnref-b" class="footnote-backref">↩</a></p></li>"##,
                r##"<li id="fn-a"><p>First def. <a href="#fnref-a" class="footnote-backref">↩</a></p></li>"##,
                "</ol></section>"
            )
        );
    }

    #[test]
    fn test_thematic_break_and_hard_break() {
        assert_eq!(lower_html("a  \nb\n\n---"), "<p>a<br>b</p><hr>");
    }
}
