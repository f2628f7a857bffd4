//! The rendered surface.
//!
//! A [`Surface`] is a mutable document tree that rendered markup is mounted
//! into. Later stages address nodes by [`NodeId`]: diagram rendering
//! replaces code blocks in place and export clones the content into a
//! scratch tree. [`StyleResolver`] runs the CSS cascade over a surface to
//! produce [`ComputedStyle`]s.
//!
//! # Example
//!
//! ```
//! use mdstyler_renderer::parse_fragment;
//! use mdstyler_surface::{Media, StyleResolver, Stylesheet, Surface};
//!
//! let mut surface = Surface::preview();
//! let content = surface.preview_content().unwrap();
//! surface
//!     .set_children_markup(content, &parse_fragment("<p>Hello</p>").unwrap())
//!     .unwrap();
//!
//! let styles = StyleResolver::new(Media::Screen)
//!     .with_stylesheet(Stylesheet::parse(".preview-content p { color: #ff0000; }"))
//!     .resolve(&surface, content);
//! let paragraph = surface.select(content, "p").unwrap()[0];
//! assert_eq!(styles.get(paragraph).unwrap().color.to_string(), "rgb(255, 0, 0)");
//! ```

mod cascade;
mod color;
mod css;
mod selector;
mod tree;

pub use cascade::{
    BoxSizing, ComputedStyle, ComputedStyles, DEFAULT_FONT_SIZE, Display, Edges, FontStyle,
    LineHeight, StyleResolver, TextAlign, WhiteSpace,
};
pub use color::Rgba;
pub use css::{Declaration, Media, MediaRule, Rule, StyleRule, Stylesheet, parse_declarations};
pub use selector::{Combinator, Selector, SelectorList, Specificity};
pub use tree::{NodeData, NodeId, Surface, SurfaceError};
