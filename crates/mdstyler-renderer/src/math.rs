//! Math typesetting.
//!
//! Lowering leaves `$...$` and `$$...$$` as `span.math-inline` and
//! `span.math-display` holding the TeX source. This pass converts the
//! source to MathML. Conversion errors keep the source text and mark the
//! span with `math-error`.

use latex2mathml::{DisplayStyle, latex_to_mathml};

use crate::markup::{Element, MarkupNode, parse_fragment, visit_elements_mut};
use crate::pipeline::{MarkupPass, PassContext};

/// Expand math spans into MathML.
#[derive(Debug, Default)]
pub struct MathPass;

impl MarkupPass for MathPass {
    fn name(&self) -> &'static str {
        "math"
    }

    fn run(&self, nodes: &mut Vec<MarkupNode>, context: &mut PassContext) {
        visit_elements_mut(nodes, &mut |element| {
            if element.is("span") && element.has_class("math") {
                typeset(element, context);
            }
        });
    }
}

fn typeset(element: &mut Element, context: &mut PassContext) {
    let tex = element.text_content();
    let style = if element.has_class("math-display") {
        DisplayStyle::Block
    } else {
        DisplayStyle::Inline
    };

    let converted = latex_to_mathml(tex.trim(), style)
        .map_err(|err| err.to_string())
        .and_then(|mathml| parse_fragment(&mathml).map_err(|err| err.to_string()));

    match converted {
        Ok(nodes) => element.children = nodes,
        Err(message) => {
            tracing::debug!(tex = %tex, error = %message, "Math conversion failed");
            element.add_class("math-error");
            element.set_attr("title", message.as_str());
            context.warn(format!("Math error in `{tex}`: {message}"));
        }
    }
}
