//! Arena-backed document tree.
//!
//! Detaching or replacing a node unlinks it from its parent but keeps its id
//! valid, so callers holding a [`NodeId`] can still inspect it and check
//! [`Surface::is_attached`]. Nodes are only freed by [`Surface::truncate`],
//! which drops everything created after a known point.

use std::fmt::Write;

use mdstyler_renderer::markup::{MarkupNode, escape_html, is_void, parse_fragment, write_start_tag};
use mdstyler_renderer::{Element, MarkupError};
use mdstyler_theme::{CONTAINER_ID, CONTENT_CLASS};

use crate::css::{Declaration, parse_declarations};
use crate::selector::{SelectorList, matches_any};

/// Handle to a node of a [`Surface`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Errors from surface operations.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("Node {0:?} has no parent")]
    Detached(NodeId),

    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("Invalid selector `{0}`")]
    Selector(String),

    #[error(transparent)]
    Markup(#[from] MarkupError),
}

/// Node payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    Document,
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
    /// Markup kept verbatim, never interpreted.
    Raw(String),
}

#[derive(Clone, Debug)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A mutable document tree.
#[derive(Clone, Debug)]
pub struct Surface {
    nodes: Vec<Node>,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface {
    /// Create a surface holding only the document node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Create the preview layout: `div#preview-container > div.preview-content`.
    pub fn preview() -> Self {
        let mut surface = Self::new();
        let container = surface.create_element("div", vec![("id".to_owned(), CONTAINER_ID.to_owned())]);
        let content = surface.create_element("div", vec![("class".to_owned(), CONTENT_CLASS.to_owned())]);
        surface.link(surface.document(), container);
        surface.link(container, content);
        surface
    }

    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    /// First `.preview-content` element in the document.
    pub fn preview_content(&self) -> Option<NodeId> {
        self.descendants(self.document())
            .into_iter()
            .find(|&id| self.has_class(id, CONTENT_CLASS))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    fn node(&self, id: NodeId) -> Result<&Node, SurfaceError> {
        self.nodes.get(id.0).ok_or(SurfaceError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, SurfaceError> {
        self.nodes.get_mut(id.0).ok_or(SurfaceError::UnknownNode(id))
    }

    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0).map(|node| &node.data)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    /// Parent, if it is an element.
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|&parent| self.is_element(parent))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map_or(&[][..], |node| node.children.as_slice())
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
    }

    /// Element siblings before `id`, nearest first.
    pub fn previous_element_siblings(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let siblings = self.parent(id).map_or(&[][..], |parent| self.children(parent));
        let position = siblings.iter().position(|&sibling| sibling == id).unwrap_or(0);
        siblings[..position]
            .iter()
            .rev()
            .copied()
            .filter(|&sibling| self.is_element(sibling))
    }

    /// 1-based position among element siblings, and the sibling count.
    pub fn element_position(&self, id: NodeId) -> (usize, usize) {
        let Some(parent) = self.parent(id) else {
            return (1, 1);
        };
        let mut index = 0;
        let mut count = 0;
        for sibling in self.element_children(parent) {
            count += 1;
            if sibling == id {
                index = count;
            }
        }
        (index, count)
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        result
    }

    /// Whether `id` is reachable from the document node.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.document() {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), Some(NodeData::Element { .. }))
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.data(id)? {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match self.data(id) {
            Some(NodeData::Element { attrs, .. }) => attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> Result<(), SurfaceError> {
        let NodeData::Element { attrs, .. } = &mut self.node_mut(id)?.data else {
            return Err(SurfaceError::NotAnElement(id));
        };
        let value = value.into();
        match attrs.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
            Some(slot) => slot.1 = value,
            None => attrs.push((name.to_owned(), value)),
        }
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<(), SurfaceError> {
        if let NodeData::Element { attrs, .. } = &mut self.node_mut(id)?.data {
            attrs.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        }
        Ok(())
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str, attrs: Vec<(String, String)>) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.to_owned(),
            attrs,
        })
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Number of nodes created so far, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Free every node created after the surface held `len` nodes.
    ///
    /// Links from older nodes to freed ones are removed. Ids of freed nodes
    /// are handed out again by later insertions.
    pub fn truncate(&mut self, len: usize) {
        let len = len.max(1);
        if len >= self.nodes.len() {
            return;
        }
        self.nodes.truncate(len);
        for node in &mut self.nodes {
            node.children.retain(|child| child.0 < len);
            if node.parent.is_some_and(|parent| parent.0 >= len) {
                node.parent = None;
            }
        }
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Unlink `id` from its parent. Detached nodes are left as they are.
    pub fn detach(&mut self, id: NodeId) -> Result<(), SurfaceError> {
        if let Some(parent) = self.node(id)?.parent {
            self.nodes[parent.0].children.retain(|&child| child != id);
            self.nodes[id.0].parent = None;
        }
        Ok(())
    }

    /// Move `child` to the end of `parent`'s children.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SurfaceError> {
        self.node(parent)?;
        self.detach(child)?;
        self.link(parent, child);
        Ok(())
    }

    /// Detach every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) -> Result<(), SurfaceError> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        Ok(())
    }

    /// Build markup nodes as new detached subtrees.
    fn build(&mut self, nodes: &[MarkupNode]) -> Vec<NodeId> {
        nodes.iter().map(|node| self.build_node(node)).collect()
    }

    fn build_node(&mut self, node: &MarkupNode) -> NodeId {
        match node {
            MarkupNode::Element(element) => {
                let id = self.create_element(&element.tag, element.attrs.clone());
                for child in self.build(&element.children) {
                    self.link(id, child);
                }
                id
            }
            MarkupNode::Text(text) => self.push(NodeData::Text(text.clone())),
            MarkupNode::Raw(raw) => self.push(NodeData::Raw(raw.clone())),
            MarkupNode::Comment(comment) => self.push(NodeData::Comment(comment.clone())),
        }
    }

    /// Append markup nodes under `parent`.
    pub fn append_markup(&mut self, parent: NodeId, nodes: &[MarkupNode]) -> Result<Vec<NodeId>, SurfaceError> {
        self.node(parent)?;
        let ids = self.build(nodes);
        for &id in &ids {
            self.link(parent, id);
        }
        Ok(ids)
    }

    /// Replace the children of `parent` with markup nodes.
    pub fn set_children_markup(&mut self, parent: NodeId, nodes: &[MarkupNode]) -> Result<Vec<NodeId>, SurfaceError> {
        self.clear_children(parent)?;
        self.append_markup(parent, nodes)
    }

    /// Replace `target` in its parent by markup nodes.
    ///
    /// `target` becomes detached; the new node ids are returned in order.
    pub fn replace_with_markup(&mut self, target: NodeId, nodes: &[MarkupNode]) -> Result<Vec<NodeId>, SurfaceError> {
        let parent = self.node(target)?.parent.ok_or(SurfaceError::Detached(target))?;
        let ids = self.build(nodes);
        for &id in &ids {
            self.nodes[id.0].parent = Some(parent);
        }
        let siblings = &mut self.nodes[parent.0].children;
        let position = siblings
            .iter()
            .position(|&child| child == target)
            .ok_or(SurfaceError::Detached(target))?;
        siblings.splice(position..=position, ids.iter().copied());
        self.nodes[target.0].parent = None;
        Ok(ids)
    }

    /// Replace `target` in its parent by parsed HTML.
    pub fn replace_with_html(&mut self, target: NodeId, html: &str) -> Result<Vec<NodeId>, SurfaceError> {
        let nodes = parse_fragment(html)?;
        self.replace_with_markup(target, &nodes)
    }

    /// Deep-copy a subtree of `source` into this surface as a detached node.
    pub fn import(&mut self, source: &Surface, id: NodeId) -> Result<NodeId, SurfaceError> {
        let data = source.node(id)?.data.clone();
        let copy = self.push(data);
        for &child in source.children(id) {
            let child_copy = self.import(source, child)?;
            self.link(copy, child_copy);
        }
        Ok(copy)
    }

    /// Deep-copy a subtree within this surface. The copy is detached.
    pub fn clone_subtree(&mut self, id: NodeId) -> Result<NodeId, SurfaceError> {
        let node = self.node(id)?;
        let (data, children) = (node.data.clone(), node.children.clone());
        let copy = self.push(data);
        for child in children {
            let child_copy = self.clone_subtree(child)?;
            self.link(copy, child_copy);
        }
        Ok(copy)
    }

    /// Convert a subtree back into markup nodes.
    pub fn to_markup(&self, id: NodeId) -> Vec<MarkupNode> {
        match self.data(id) {
            Some(NodeData::Document) => self
                .children(id)
                .iter()
                .flat_map(|&child| self.to_markup(child))
                .collect(),
            Some(NodeData::Element { tag, attrs }) => vec![MarkupNode::Element(Element {
                tag: tag.clone(),
                attrs: attrs.clone(),
                children: self
                    .children(id)
                    .iter()
                    .flat_map(|&child| self.to_markup(child))
                    .collect(),
            })],
            Some(NodeData::Text(text)) => vec![MarkupNode::Text(text.clone())],
            Some(NodeData::Raw(raw)) => vec![MarkupNode::Raw(raw.clone())],
            Some(NodeData::Comment(comment)) => vec![MarkupNode::Comment(comment.clone())],
            None => Vec::new(),
        }
    }

    /// Concatenated descendant text.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        if let Some(NodeData::Text(own)) = self.data(id) {
            text.push_str(own);
        }
        for node in self.descendants(id) {
            if let Some(NodeData::Text(own)) = self.data(node) {
                text.push_str(own);
            }
        }
        text
    }

    /// Serialize `id` including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(&mut out, id);
        out
    }

    /// Serialize the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_html(&mut out, child);
        }
        out
    }

    fn write_html(&self, out: &mut String, id: NodeId) {
        match self.data(id) {
            Some(NodeData::Document) => {
                for &child in self.children(id) {
                    self.write_html(out, child);
                }
            }
            Some(NodeData::Element { tag, attrs }) => {
                write_start_tag(out, tag, attrs);
                if is_void(tag) {
                    return;
                }
                for &child in self.children(id) {
                    self.write_html(out, child);
                }
                let _ = write!(out, "</{tag}>");
            }
            Some(NodeData::Text(text)) => out.push_str(&escape_html(text)),
            Some(NodeData::Raw(raw)) => out.push_str(raw),
            Some(NodeData::Comment(comment)) => {
                let _ = write!(out, "<!--{comment}-->");
            }
            None => {}
        }
    }

    /// Elements under `scope` matching a CSS selector, in document order.
    pub fn select(&self, scope: NodeId, selector: &str) -> Result<Vec<NodeId>, SurfaceError> {
        let selectors =
            SelectorList::parse(selector).map_err(|_| SurfaceError::Selector(selector.to_owned()))?;
        Ok(self.select_parsed(scope, &selectors))
    }

    pub fn select_parsed(&self, scope: NodeId, selectors: &SelectorList) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&id| self.is_element(id) && matches_any(self, id, selectors))
            .collect()
    }

    /// Declarations of the `style` attribute.
    pub fn inline_style(&self, id: NodeId) -> Vec<Declaration> {
        self.attr(id, "style").map(parse_declarations).unwrap_or_default()
    }

    /// Set one property in the `style` attribute, replacing earlier values.
    pub fn set_style_property(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), SurfaceError> {
        let mut declarations = self.inline_style(id);
        declarations.retain(|declaration| !declaration.name.eq_ignore_ascii_case(name));
        declarations.push(Declaration::new(name, value));

        let style = declarations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(id, "style", style)
    }
}
