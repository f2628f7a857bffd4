//! Syntax tree built from pulldown-cmark events.
//!
//! The tree is produced fresh for every render. Adjacent text events and
//! soft breaks are merged into a single [`NodeKind::Text`] run, so passes
//! see `[!NOTE]` as one string even though the parser splits it at `[`.

use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;

/// Bare URLs recognized in text runs (GFM autolink literals).
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:https?://|www\.)[^\s<>]*[^\s<>.,:;!?'\x22)\]]").expect("invalid URL regex")
});

/// Column alignment of a table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl From<pulldown_cmark::Alignment> for Alignment {
    fn from(alignment: pulldown_cmark::Alignment) -> Self {
        match alignment {
            pulldown_cmark::Alignment::None => Self::None,
            pulldown_cmark::Alignment::Left => Self::Left,
            pulldown_cmark::Alignment::Center => Self::Center,
            pulldown_cmark::Alignment::Right => Self::Right,
        }
    }
}

/// Node variants of the syntax tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Paragraph,
    Heading { level: u8 },
    List { start: Option<u64> },
    ListItem { checked: Option<bool> },
    BlockQuote,
    CodeBlock { language: Option<String>, value: String },
    Table { alignments: Vec<Alignment> },
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Strikethrough,
    Link { url: String, title: String },
    Image { url: String, title: String },
    InlineCode(String),
    InlineMath(String),
    DisplayMath(String),
    FootnoteReference(String),
    FootnoteDefinition(String),
    ThematicBreak,
    /// Raw markup block.
    Html(String),
    /// Raw inline markup.
    InlineHtml(String),
    Text(String),
    HardBreak,
    /// Container for constructs without a dedicated variant; lowers to its children.
    Fragment,
}

/// A node of the syntax tree.
///
/// `attributes` are rendering attributes attached by syntax passes and
/// copied onto the lowered element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub children: Vec<SyntaxNode>,
    pub attributes: Vec<(String, String)>,
}

impl SyntaxNode {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Text(value.into()))
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_owned(), value)),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Plain text of this node and its descendants.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text(text) | NodeKind::InlineCode(text) | NodeKind::InlineMath(text) => {
                out.push_str(text);
            }
            _ => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(SyntaxNode {
            kind: NodeKind::Text(last),
            ..
        }) = self.children.last_mut()
        {
            last.push_str(text);
        } else {
            self.children.push(Self::text(text));
        }
    }
}

/// Parser options: CommonMark plus tables, strikethrough, task lists,
/// footnotes and `$` math.
///
/// GFM alert parsing is deliberately left off; callout markers stay in
/// the text for the callout pass.
pub fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_MATH
}

/// Parse source text into a syntax tree.
pub fn parse(source: &str) -> SyntaxNode {
    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(source, parser_options()) {
        builder.event(event);
    }
    let mut root = builder.finish();
    linkify(&mut root);
    root
}

struct TreeBuilder {
    stack: Vec<SyntaxNode>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![SyntaxNode::new(NodeKind::Root)],
        }
    }

    fn current(&mut self) -> &mut SyntaxNode {
        // The root is never popped, see `end`.
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                let current = self.current();
                if let NodeKind::CodeBlock { value, .. } = &mut current.kind {
                    value.push_str(&text);
                } else {
                    current.push_text(&text);
                }
            }
            Event::SoftBreak => self.current().push_text("\n"),
            Event::HardBreak => self.leaf(NodeKind::HardBreak),
            Event::Code(code) => self.leaf(NodeKind::InlineCode(code.into_string())),
            Event::InlineMath(tex) => self.leaf(NodeKind::InlineMath(tex.into_string())),
            Event::DisplayMath(tex) => self.leaf(NodeKind::DisplayMath(tex.into_string())),
            Event::Html(html) => {
                let current = self.current();
                if let NodeKind::Html(block) = &mut current.kind {
                    block.push_str(&html);
                } else {
                    current.children.push(SyntaxNode::new(NodeKind::Html(html.into_string())));
                }
            }
            Event::InlineHtml(html) => self.leaf(NodeKind::InlineHtml(html.into_string())),
            Event::FootnoteReference(label) => {
                self.leaf(NodeKind::FootnoteReference(label.into_string()));
            }
            Event::Rule => self.leaf(NodeKind::ThematicBreak),
            Event::TaskListMarker(checked) => {
                if let Some(item) = self
                    .stack
                    .iter_mut()
                    .rev()
                    .find(|node| matches!(node.kind, NodeKind::ListItem { .. }))
                {
                    item.kind = NodeKind::ListItem {
                        checked: Some(checked),
                    };
                }
            }
        }
    }

    fn leaf(&mut self, kind: NodeKind) {
        self.current().children.push(SyntaxNode::new(kind));
    }

    fn start(&mut self, tag: Tag<'_>) {
        let kind = match tag {
            Tag::Paragraph => NodeKind::Paragraph,
            Tag::Heading { level, .. } => NodeKind::Heading {
                level: heading_level_to_num(level),
            },
            Tag::BlockQuote(_) => NodeKind::BlockQuote,
            Tag::CodeBlock(kind) => NodeKind::CodeBlock {
                language: match kind {
                    CodeBlockKind::Fenced(info) => fence_language(&info),
                    CodeBlockKind::Indented => None,
                },
                value: String::new(),
            },
            Tag::HtmlBlock => NodeKind::Html(String::new()),
            Tag::List(start) => NodeKind::List { start },
            Tag::Item => NodeKind::ListItem { checked: None },
            Tag::FootnoteDefinition(label) => NodeKind::FootnoteDefinition(label.into_string()),
            Tag::Table(alignments) => NodeKind::Table {
                alignments: alignments.into_iter().map(Alignment::from).collect(),
            },
            Tag::TableHead => NodeKind::TableHead,
            Tag::TableRow => NodeKind::TableRow,
            Tag::TableCell => NodeKind::TableCell,
            Tag::Emphasis => NodeKind::Emphasis,
            Tag::Strong => NodeKind::Strong,
            Tag::Strikethrough => NodeKind::Strikethrough,
            Tag::Link {
                dest_url, title, ..
            } => NodeKind::Link {
                url: dest_url.into_string(),
                title: title.into_string(),
            },
            Tag::Image {
                dest_url, title, ..
            } => NodeKind::Image {
                url: dest_url.into_string(),
                title: title.into_string(),
            },
            _ => NodeKind::Fragment,
        };
        self.stack.push(SyntaxNode::new(kind));
    }

    fn end(&mut self, _tag: TagEnd) {
        if self.stack.len() > 1
            && let Some(node) = self.stack.pop()
        {
            self.current().children.push(node);
        }
    }

    fn finish(mut self) -> SyntaxNode {
        while self.stack.len() > 1 {
            if let Some(node) = self.stack.pop() {
                self.current().children.push(node);
            }
        }
        self.stack.pop().unwrap_or_else(|| SyntaxNode::new(NodeKind::Root))
    }
}

fn heading_level_to_num(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Language token of a fenced code block info string.
///
/// Takes the first whitespace-separated word and drops attribute braces
/// (` ```rust {linenums} `), returning `None` for an empty info string.
pub fn fence_language(info: &str) -> Option<String> {
    let token = info.split_whitespace().next()?;
    let token = token.split('{').next().unwrap_or(token).trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_owned())
    }
}

/// Turn bare URLs in text runs into links, outside links and code.
fn linkify(node: &mut SyntaxNode) {
    if matches!(node.kind, NodeKind::Link { .. } | NodeKind::Image { .. }) {
        return;
    }

    let mut children = Vec::with_capacity(node.children.len());
    for mut child in std::mem::take(&mut node.children) {
        match &child.kind {
            NodeKind::Text(text) if URL_PATTERN.is_match(text) => {
                split_urls(text, &mut children);
            }
            _ => {
                linkify(&mut child);
                children.push(child);
            }
        }
    }
    node.children = children;
}

fn split_urls(text: &str, out: &mut Vec<SyntaxNode>) {
    let mut last = 0;
    for found in URL_PATTERN.find_iter(text) {
        if found.start() > last {
            out.push(SyntaxNode::text(&text[last..found.start()]));
        }
        let shown = found.as_str();
        let url = if shown.starts_with("www.") {
            format!("http://{shown}")
        } else {
            shown.to_owned()
        };
        let mut link = SyntaxNode::new(NodeKind::Link {
            url,
            title: String::new(),
        });
        link.children.push(SyntaxNode::text(shown));
        out.push(link);
        last = found.end();
    }
    if last < text.len() {
        out.push(SyntaxNode::text(&text[last..]));
    }
}
