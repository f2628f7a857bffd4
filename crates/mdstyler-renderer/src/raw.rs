//! Raw markup re-parsing.
//!
//! Raw fragments from the source are stored as [`MarkupNode::Raw`] during
//! lowering. This pass serializes every sibling run that contains raw
//! fragments and parses it back, so an opening tag in one fragment and its
//! closing tag in another end up as one element wrapping the markdown
//! between them.
//!
//! Raw markup is trusted: nothing is sanitized. Disable
//! [`RenderOptions::allow_raw_html`](crate::RenderOptions) to escape it
//! instead.

use crate::markup::{MarkupNode, is_raw_text, parse_fragment, to_html};
use crate::pipeline::{MarkupPass, PassContext};

/// Re-parse raw markup fragments into first-class nodes.
#[derive(Debug, Default)]
pub struct RawMarkupPass;

impl MarkupPass for RawMarkupPass {
    fn name(&self) -> &'static str {
        "raw-markup"
    }

    fn run(&self, nodes: &mut Vec<MarkupNode>, context: &mut PassContext) {
        reparse(nodes, context);
    }
}

fn reparse(nodes: &mut Vec<MarkupNode>, context: &mut PassContext) {
    for node in nodes.iter_mut() {
        if let MarkupNode::Element(element) = node
            && !is_raw_text(&element.tag)
        {
            reparse(&mut element.children, context);
        }
    }

    if !nodes.iter().any(|node| matches!(node, MarkupNode::Raw(_))) {
        return;
    }

    let html = to_html(nodes);
    match parse_fragment(&html) {
        Ok(parsed) => *nodes = parsed,
        Err(err) => {
            tracing::warn!(error = %err, "Keeping raw markup unparsed");
            context.warn(format!("Raw markup kept verbatim: {err}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::markup::Element;

    fn run(mut nodes: Vec<MarkupNode>) -> (Vec<MarkupNode>, PassContext) {
        let mut context = PassContext::default();
        RawMarkupPass.run(&mut nodes, &mut context);
        (nodes, context)
    }

    #[test]
    fn test_inline_fragments_become_element() {
        let paragraph = Element::new("p").with_children(vec![
            MarkupNode::Raw(r#"<span class="k">"#.to_owned()),
            MarkupNode::Text("key".to_owned()),
            MarkupNode::Raw("</span>".to_owned()),
        ]);
        let (nodes, context) = run(vec![MarkupNode::Element(paragraph)]);

        let expected = Element::new("p").with_child(MarkupNode::Element(
            Element::new("span").with_attr("class", "k").with_text("key"),
        ));
        assert_eq!(nodes, vec![MarkupNode::Element(expected)]);
        assert!(context.warnings.is_empty());
    }

    #[test]
    fn test_block_fragments_wrap_markdown() {
        let (nodes, _) = run(vec![
            MarkupNode::Raw("<details>\n<summary>More</summary>\n".to_owned()),
            MarkupNode::Element(Element::new("p").with_text("Body")),
            MarkupNode::Raw("</details>\n".to_owned()),
        ]);
        assert_eq!(
            to_html(&nodes),
            "<details>\n<summary>More</summary>\n<p>Body</p></details>\n"
        );
        let MarkupNode::Element(details) = &nodes[0] else {
            panic!("expected details element");
        };
        assert_eq!(details.tag, "details");
    }

    #[test]
    fn test_without_raw_nodes_untouched() {
        let original = vec![MarkupNode::Element(Element::new("p").with_text("a < b"))];
        let (nodes, _) = run(original.clone());
        assert_eq!(nodes, original);
    }

    #[test]
    fn test_style_block_passes_through() {
        let css = "<style>\n.preview-content h1 > span { font-family: 'Inter'; }\n</style>\n";
        let (nodes, context) = run(vec![MarkupNode::Raw(css.to_owned())]);

        assert_eq!(to_html(&nodes), css);
        let MarkupNode::Element(style) = &nodes[0] else {
            panic!("expected style element");
        };
        assert_eq!(style.tag, "style");
        assert!(context.warnings.is_empty());
    }

    #[test]
    fn test_script_block_passes_through() {
        let script = "<script>\nif (a < b && c) { x(); }\n</script>\n";
        let (nodes, context) = run(vec![MarkupNode::Raw(script.to_owned())]);

        assert_eq!(to_html(&nodes), script);
        assert!(context.warnings.is_empty());
    }

    #[test]
    fn test_style_block_survives_second_pass() {
        let css = "<STYLE media=\"print\">p > a { color: red; }</Style>";
        let (nodes, _) = run(vec![MarkupNode::Raw(css.to_owned())]);
        let (nodes, _) = run(nodes);
        assert_eq!(
            to_html(&nodes),
            "<STYLE media=\"print\">p > a { color: red; }</STYLE>"
        );
    }

    #[test]
    fn test_bare_ampersand_and_angle_are_text() {
        let (nodes, context) = run(vec![
            MarkupNode::Raw("<div>\nTom & Jerry, 1 < 2\n</div>\n".to_owned()),
        ]);

        let MarkupNode::Element(div) = &nodes[0] else {
            panic!("expected div element");
        };
        assert_eq!(div.text_content(), "\nTom & Jerry, 1 < 2\n");
        assert_eq!(
            to_html(&nodes),
            "<div>\nTom &amp; Jerry, 1 &lt; 2\n</div>\n"
        );
        assert!(context.warnings.is_empty());
    }

    #[test]
    fn test_unparseable_markup_kept_verbatim() {
        let original = vec![MarkupNode::Raw("<!-- never closed".to_owned())];
        let (nodes, context) = run(original.clone());
        assert_eq!(nodes, original);
        assert_eq!(context.warnings.len(), 1);
    }
}
