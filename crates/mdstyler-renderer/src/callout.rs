//! Callout blocks.
//!
//! A blockquote whose first paragraph starts with `[!NOTE]`, `[!TIP]`,
//! `[!IMPORTANT]`, `[!WARNING]` or `[!CAUTION]` (any letter case) becomes a
//! callout: the marker is stripped and the blockquote gets
//! `class="callout callout-<kind>"` and `data-callout="<kind>"`.

use std::sync::LazyLock;

use regex::Regex;

use crate::pipeline::SyntaxPass;
use crate::syntax::{NodeKind, SyntaxNode};

static MARKER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\[!(NOTE|TIP|IMPORTANT|WARNING|CAUTION)\]\s*")
        .expect("invalid callout marker regex")
});

/// Base class shared by all callouts.
pub const CALLOUT_CLASS: &str = "callout";

/// Callout kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CalloutKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl CalloutKind {
    /// Parse a kind name, ignoring case.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "note" => Some(Self::Note),
            "tip" => Some(Self::Tip),
            "important" => Some(Self::Important),
            "warning" => Some(Self::Warning),
            "caution" => Some(Self::Caution),
            _ => None,
        }
    }

    /// Lowercase name used in classes and data attributes.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Tip => "tip",
            Self::Important => "important",
            Self::Warning => "warning",
            Self::Caution => "caution",
        }
    }
}

/// Match a callout marker at the start of `text`.
///
/// Returns the kind and the byte length of the marker including trailing
/// whitespace.
pub fn match_marker(text: &str) -> Option<(CalloutKind, usize)> {
    let captures = MARKER_PATTERN.captures(text)?;
    let kind = CalloutKind::parse(&captures[1])?;
    Some((kind, captures.get(0)?.end()))
}

/// Annotate every callout blockquote in the tree, nested ones included.
pub fn annotate_callouts(node: &mut SyntaxNode) {
    if node.kind == NodeKind::BlockQuote
        && let Some(kind) = strip_marker(node)
    {
        node.set_attribute("class", format!("{CALLOUT_CLASS} {CALLOUT_CLASS}-{}", kind.as_str()));
        node.set_attribute("data-callout", kind.as_str());
    }

    for child in &mut node.children {
        annotate_callouts(child);
    }
}

/// Strip the marker from the first text run of the first paragraph.
///
/// The text node is kept even when the marker was its only content.
fn strip_marker(blockquote: &mut SyntaxNode) -> Option<CalloutKind> {
    let paragraph = blockquote.children.first_mut()?;
    if paragraph.kind != NodeKind::Paragraph {
        return None;
    }
    let NodeKind::Text(text) = &mut paragraph.children.first_mut()?.kind else {
        return None;
    };
    let (kind, len) = match_marker(text)?;
    text.replace_range(..len, "");
    Some(kind)
}

/// Syntax pass wrapper for [`annotate_callouts`].
#[derive(Debug, Default)]
pub struct CalloutPass;

impl SyntaxPass for CalloutPass {
    fn name(&self) -> &'static str {
        "callouts"
    }

    fn run(&self, root: &mut SyntaxNode) {
        annotate_callouts(root);
    }
}
