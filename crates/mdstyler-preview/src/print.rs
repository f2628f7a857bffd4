//! Standalone print document.

use mdstyler_renderer::escape_html;
use mdstyler_theme::{CONTAINER_ID, CONTENT_CLASS};

/// Title used when the document has no H1.
pub const DEFAULT_TITLE: &str = "Document";

/// Wrap rendered content and its style sheet in a complete HTML document.
///
/// The content sits in `#preview-container > .preview-content`, the same
/// structure the style sheet targets in the live preview, so printing the
/// document reproduces the preview.
pub fn print_document(title: Option<&str>, stylesheet: &str, content_html: &str) -> String {
    let title = escape_html(title.unwrap_or(DEFAULT_TITLE));
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title}</title>\n\
         <style>\n{stylesheet}\n</style>\n\
         </head>\n\
         <body>\n\
         <div id=\"{CONTAINER_ID}\"><div class=\"{CONTENT_CLASS}\">{content_html}</div></div>\n\
         </body>\n\
         </html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_document_structure() {
        let html = print_document(Some("A & B"), "p { color: red; }", "<p>Hi</p>");
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>A &amp; B</title>"));
        assert!(html.contains("p { color: red; }"));
        assert!(html.contains(
            r#"<div id="preview-container"><div class="preview-content"><p>Hi</p></div></div>"#
        ));
    }

    #[test]
    fn test_default_title() {
        assert!(print_document(None, "", "").contains("<title>Document</title>"));
    }
}
