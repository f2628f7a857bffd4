//! Heading ids, document title and table of contents.

use std::collections::HashMap;

/// Table of contents entry.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TocEntry {
    /// Heading level (1-6).
    pub level: u8,
    /// Heading text.
    pub title: String,
    /// Anchor id for linking.
    pub id: String,
}

/// Collects heading ids while a document is lowered.
///
/// The first H1 becomes the document title and is left out of the table
/// of contents. Every heading still gets a unique id.
#[derive(Debug, Default)]
pub(crate) struct HeadingState {
    title: Option<String>,
    toc: Vec<TocEntry>,
    id_counts: HashMap<String, usize>,
}

impl HeadingState {
    /// Register a heading and return its id.
    pub(crate) fn register(&mut self, level: u8, text: &str) -> String {
        let text = text.trim();
        let id = self.generate_id(text);

        if level == 1 && self.title.is_none() {
            self.title = Some(text.to_owned());
        } else {
            self.toc.push(TocEntry {
                level,
                title: text.to_owned(),
                id: id.clone(),
            });
        }

        id
    }

    fn generate_id(&mut self, text: &str) -> String {
        let mut base_id = slugify(text);
        if base_id.is_empty() {
            base_id = "section".to_owned();
        }
        let count = self.id_counts.entry(base_id.clone()).or_default();
        let id = match *count {
            0 => base_id,
            n => format!("{base_id}-{n}"),
        };
        *count += 1;
        id
    }

    pub(crate) fn finish(self) -> (Option<String>, Vec<TocEntry>) {
        (self.title, self.toc)
    }
}

/// Convert text to a URL-safe slug.
///
/// Lowercases, collapses whitespace, dashes and underscores into single
/// dashes, and drops every other non-alphanumeric character.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut result = String::new();
    let mut last_was_dash = true;

    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            result.extend(c.to_lowercase());
            last_was_dash = false;
        } else if !last_was_dash && (c.is_whitespace() || c == '-' || c == '_') {
            result.push('-');
            last_was_dash = true;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}
