//! Syntax highlighting for code blocks.
//!
//! Tagged blocks are looked up by language token. Untagged blocks are
//! detected from their first line (shebangs, XML declarations, modelines)
//! and then from keyword signatures over the opening lines. Blocks whose
//! language is unknown or cannot be detected stay plain text.

use std::sync::LazyLock;

use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::markup::{Element, MarkupNode, parse_fragment, visit_elements_mut};
use crate::pipeline::{MarkupPass, PassContext};

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// Lines sampled when guessing the language of an untagged block.
const SAMPLE_LINES: usize = 20;

/// Distinct markers a block must contain before a signature counts.
const MIN_SIGNATURE_HITS: usize = 2;

/// Keyword signatures keyed by file extension, in priority order for ties.
const SIGNATURES: &[(&str, &[&str])] = &[
    (
        "rs",
        &["fn ", "let mut ", "impl ", "pub ", "use std", "println!", "-> ", "::"],
    ),
    (
        "py",
        &["def ", "import ", "elif ", "self.", "print(", "__init__", "None"],
    ),
    (
        "go",
        &["func ", "package ", ":= ", "fmt."],
    ),
    (
        "js",
        &["function", "const ", "=> ", "console.", "require(", "===", "undefined"],
    ),
    (
        "java",
        &["public class", "System.out", "void ", "private ", "import java"],
    ),
    (
        "c",
        &["#include", "int main", "printf(", "NULL", "sizeof("],
    ),
    (
        "sql",
        &["SELECT ", "FROM ", "WHERE ", "INSERT INTO", "CREATE TABLE", "JOIN "],
    ),
];

/// Class prefix of highlighted token spans.
pub const HIGHLIGHT_CLASS_PREFIX: &str = "hl-";

/// Highlight `pre > code` blocks.
#[derive(Debug, Default)]
pub struct HighlightPass;

impl MarkupPass for HighlightPass {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn run(&self, nodes: &mut Vec<MarkupNode>, _context: &mut PassContext) {
        visit_elements_mut(nodes, &mut |element| {
            if !element.is("pre") {
                return;
            }
            if let Some(MarkupNode::Element(code)) = element.children.first_mut()
                && code.is("code")
            {
                highlight_block(code);
            }
        });
    }
}

/// Language token from a `language-*` class.
pub fn code_language(code: &Element) -> Option<&str> {
    code.classes().find_map(|class| class.strip_prefix("language-"))
}

fn highlight_block(code: &mut Element) {
    let [MarkupNode::Text(source)] = code.children.as_slice() else {
        return;
    };

    let declared = code_language(code);
    let Some(syntax) = find_syntax(declared, source) else {
        return;
    };

    let Some(nodes) = highlight(source, syntax) else {
        tracing::debug!(language = %syntax.name, "Highlighting failed, keeping plain text");
        return;
    };

    let detected = declared.is_none().then(|| language_token(syntax));
    code.children = nodes;
    if let Some(token) = detected {
        code.add_class(&format!("language-{token}"));
    }
}

fn find_syntax(declared: Option<&str>, source: &str) -> Option<&'static SyntaxReference> {
    let syntax = match declared {
        Some(token) => SYNTAX_SET.find_syntax_by_token(token),
        None => SYNTAX_SET
            .find_syntax_by_first_line(source.lines().next()?)
            .or_else(|| guess_syntax(source)),
    }?;
    (syntax.name != "Plain Text").then_some(syntax)
}

/// Best keyword signature over the opening lines, if any scores enough.
fn guess_syntax(source: &str) -> Option<&'static SyntaxReference> {
    let sample: String = source
        .lines()
        .take(SAMPLE_LINES)
        .collect::<Vec<_>>()
        .join("\n");

    let extension = SIGNATURES
        .iter()
        .enumerate()
        .map(|(rank, (extension, markers))| {
            let hits = markers.iter().filter(|m| sample.contains(**m)).count();
            (rank, extension, hits)
        })
        .filter(|(_, _, hits)| *hits >= MIN_SIGNATURE_HITS)
        .min_by_key(|(rank, _, hits)| (std::cmp::Reverse(*hits), *rank))
        .map(|(_, extension, _)| *extension)?;

    SYNTAX_SET.find_syntax_by_extension(extension)
}

fn language_token(syntax: &SyntaxReference) -> String {
    syntax
        .file_extensions
        .first()
        .cloned()
        .unwrap_or_else(|| syntax.name.to_lowercase().replace(' ', "-"))
}

fn highlight(source: &str, syntax: &SyntaxReference) -> Option<Vec<MarkupNode>> {
    let mut generator = ClassedHTMLGenerator::new_with_class_style(
        syntax,
        &SYNTAX_SET,
        ClassStyle::SpacedPrefixed {
            prefix: HIGHLIGHT_CLASS_PREFIX,
        },
    );
    for line in LinesWithEndings::from(source) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .ok()?;
    }
    parse_fragment(&generator.finalize()).ok()
}
