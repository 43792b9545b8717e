//! In-memory document tree
//!
//! Backed by a parsed `scraper::Html`, so markup goes through the same HTML5
//! parser and serializer a browser uses. Removed nodes are only detached from
//! the tree, so a [`NodeId`] stays valid for the lifetime of the document.
//! That mirrors how the browser keeps a removed element alive while something
//! still references it.
//!
//! Elements are immutable in `scraper`; an attribute, class or style change
//! re-parses the element's opening tag and swaps the node value in place.

use super::{Dom, ScrollError, ScrollSurface, Selector};
use crate::error::{Error, Result};
use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node};
use std::collections::{HashMap, HashSet};
use tracing::debug;

const BLANK_DOCUMENT: &str = "<!DOCTYPE html><html><head></head><body></body></html>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(ego_tree::NodeId);

/// A scroll request issued against the document, in order
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollCommand {
    pub surface: ScrollSurface<NodeId>,
    pub top: f64,
    pub smooth: bool,
}

#[derive(Debug, Clone)]
pub struct MemoryDom {
    html: Html,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    page_scroll_top: f64,
    scroll_tops: HashMap<NodeId, f64>,
    no_smooth_scroll: HashSet<NodeId>,
    scroll_log: Vec<ScrollCommand>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// Create a document with `<html>`, `<head>` and `<body>` in place
    pub fn new() -> Self {
        let html = Html::parse_document(BLANK_DOCUMENT);
        let root_element = html.root_element();
        let root = NodeId(root_element.id());
        let child = |name: &str| {
            root_element
                .children()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == name)
                .map(|e| NodeId(e.id()))
                .unwrap_or(root)
        };
        let head = child("head");
        let body = child("body");

        Self {
            html,
            root,
            head,
            body,
            page_scroll_top: 0.0,
            scroll_tops: HashMap::new(),
            no_smooth_scroll: HashSet::new(),
            scroll_log: Vec::new(),
        }
    }

    pub fn body_id(&self) -> NodeId {
        self.body
    }

    /// Create an element, set its attributes and append it under `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> Result<NodeId> {
        let attributes: Vec<(String, String)> = attributes
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        if let Some((name, _)) = attributes.iter().find(|(name, _)| !is_attribute_name(name)) {
            return Err(Error::Dom(format!("invalid attribute name {:?} on <{}>", name, tag)));
        }
        let value = parse_element(tag, &attributes)?;
        let node = NodeId(self.html.tree.orphan(value).id());
        self.append_child(&parent, &node);
        Ok(node)
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        self.graft_markup(parent, &escape_text(text));
    }

    /// Replace the children of `node` with parsed markup
    pub fn set_inner_html(&mut self, node: NodeId, html: &str) {
        self.clear_children(node);
        self.graft_markup(node, html);
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|e| e.value().name())
    }

    /// One property from the inline `style` attribute
    pub fn style(&self, node: NodeId, property: &str) -> Option<String> {
        let style = self.element(node)?.value().attr("style")?;
        parse_declarations(style)
            .into_iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    /// Whether the element is displayed (no `display: none` inline style)
    pub fn is_displayed(&self, node: NodeId) -> bool {
        self.style(node, "display").as_deref() != Some("none")
    }

    pub fn text_content(&self, node: NodeId) -> String {
        self.element(node).map(|e| e.text().collect()).unwrap_or_default()
    }

    /// Mark a node as lacking smooth `scrollTo` support
    pub fn set_smooth_scroll_supported(&mut self, node: NodeId, supported: bool) {
        if supported {
            self.no_smooth_scroll.remove(&node);
        } else {
            self.no_smooth_scroll.insert(node);
        }
    }

    /// Simulate the user scrolling a surface without going through the controller
    pub fn scroll_surface(&mut self, surface: &ScrollSurface<NodeId>, top: f64) {
        self.write_scroll_top(surface, top);
    }

    pub fn scroll_log(&self) -> &[ScrollCommand] {
        &self.scroll_log
    }

    pub fn clear_scroll_log(&mut self) {
        self.scroll_log.clear();
    }

    fn element(&self, node: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(node.0).and_then(ElementRef::wrap)
    }

    /// Element descendants of `root` in document order, excluding `root`
    fn elements_under(&self, root: ego_tree::NodeId) -> impl Iterator<Item = ElementRef<'_>> {
        self.html
            .tree
            .get(root)
            .into_iter()
            .flat_map(|node| node.descendants().skip(1))
            .filter_map(ElementRef::wrap)
    }

    fn document_id(&self) -> ego_tree::NodeId {
        self.html.tree.root().id()
    }

    /// Apply `edit` to the element's attribute list and swap in the rebuilt node
    fn rewrite_attributes(&mut self, node: NodeId, edit: impl FnOnce(&mut Vec<(String, String)>)) {
        let Some(element) = self.element(node) else {
            return;
        };
        let tag = element.value().name().to_string();
        let mut attributes: Vec<(String, String)> = element
            .value()
            .attrs()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        edit(&mut attributes);

        match parse_element(&tag, &attributes) {
            Ok(value) => {
                if let Some(mut target) = self.html.tree.get_mut(node.0) {
                    *target.value() = value;
                }
            }
            Err(e) => debug!("attribute change on <{}> dropped: {}", tag, e),
        }
    }

    fn clear_children(&mut self, node: NodeId) {
        let children: Vec<ego_tree::NodeId> = match self.html.tree.get(node.0) {
            Some(parent) => parent.children().map(|c| c.id()).collect(),
            None => return,
        };
        for child in children {
            if let Some(mut child) = self.html.tree.get_mut(child) {
                child.detach();
            }
        }
    }

    /// Parse `markup` in a body context and copy the resulting nodes under `parent`
    fn graft_markup(&mut self, parent: NodeId, markup: &str) {
        if markup.is_empty() {
            return;
        }
        let fragment = Html::parse_fragment(markup);
        let source = fragment.root_element();
        self.graft(parent.0, *source);
    }

    fn graft(&mut self, parent: ego_tree::NodeId, source: NodeRef<'_, Node>) {
        for child in source.children() {
            let Some(mut target) = self.html.tree.get_mut(parent) else {
                return;
            };
            let id = target.append(child.value().clone()).id();
            self.graft(id, child);
        }
    }

    fn write_scroll_top(&mut self, surface: &ScrollSurface<NodeId>, top: f64) {
        match surface {
            ScrollSurface::Page => self.page_scroll_top = top,
            ScrollSurface::Element(node) => {
                self.scroll_tops.insert(*node, top);
            }
        }
    }
}

impl Dom for MemoryDom {
    type Node = NodeId;

    fn body(&self) -> Option<NodeId> {
        Some(self.body)
    }

    fn head(&self) -> Option<NodeId> {
        Some(self.head)
    }

    fn document_element(&self) -> Option<NodeId> {
        Some(self.root)
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements_under(self.document_id())
            .find(|e| e.value().id() == Some(id))
            .map(|e| NodeId(e.id()))
    }

    fn query(&self, selector: &Selector) -> Option<NodeId> {
        self.elements_under(self.document_id())
            .find(|e| selector.matches(e))
            .map(|e| NodeId(e.id()))
    }

    fn query_all(&self, selector: &Selector) -> Vec<NodeId> {
        self.elements_under(self.document_id())
            .filter(|e| selector.matches(e))
            .map(|e| NodeId(e.id()))
            .collect()
    }

    fn query_in(&self, root: &NodeId, selector: &Selector) -> Option<NodeId> {
        self.elements_under(root.0)
            .find(|e| selector.matches(e))
            .map(|e| NodeId(e.id()))
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.html
            .tree
            .get(node.0)?
            .parent()
            .and_then(ElementRef::wrap)
            .map(|e| NodeId(e.id()))
    }

    fn matches(&self, node: &NodeId, selector: &Selector) -> bool {
        self.element(*node).map(|e| selector.matches(&e)).unwrap_or(false)
    }

    fn attribute(&self, node: &NodeId, name: &str) -> Option<String> {
        self.element(*node)?.value().attr(name).map(str::to_string)
    }

    fn inner_html(&self, node: &NodeId) -> String {
        self.element(*node).map(|e| e.inner_html()).unwrap_or_default()
    }

    fn has_class(&self, node: &NodeId, class: &str) -> bool {
        self.element(*node)
            .map(|e| e.value().classes().any(|c| c == class))
            .unwrap_or(false)
    }

    fn is_attached(&self, node: &NodeId) -> bool {
        let document = self.document_id();
        self.html
            .tree
            .get(node.0)
            .map(|n| n.ancestors().any(|a| a.id() == document))
            .unwrap_or(false)
    }

    fn create_element(&mut self, tag: &str) -> Result<NodeId> {
        let value = parse_element(tag, &[])?;
        Ok(NodeId(self.html.tree.orphan(value).id()))
    }

    fn set_attribute(&mut self, node: &NodeId, name: &str, value: &str) {
        if !is_attribute_name(name) {
            debug!("ignoring invalid attribute name {:?}", name);
            return;
        }
        let name = name.to_ascii_lowercase();
        self.rewrite_attributes(*node, |attributes| {
            match attributes.iter_mut().find(|(n, _)| *n == name) {
                Some((_, current)) => *current = value.to_string(),
                None => attributes.push((name, value.to_string())),
            }
        });
    }

    fn set_text(&mut self, node: &NodeId, text: &str) {
        self.clear_children(*node);
        self.append_text(*node, text);
    }

    fn set_style(&mut self, node: &NodeId, property: &str, value: &str) {
        let current = self.attribute(node, "style").unwrap_or_default();
        let mut declarations = parse_declarations(&current);
        match declarations.iter_mut().find(|(name, _)| name == property) {
            Some((_, v)) => *v = value.to_string(),
            None => declarations.push((property.to_string(), value.to_string())),
        }
        let css: Vec<String> = declarations.iter().map(|(k, v)| format!("{}: {};", k, v)).collect();
        self.set_attribute(node, "style", &css.join(" "));
    }

    fn set_class(&mut self, node: &NodeId, class: &str, present: bool) {
        let current = self.attribute(node, "class").unwrap_or_default();
        let mut classes: Vec<&str> = current.split_whitespace().filter(|c| *c != class).collect();
        if present {
            classes.push(class);
        }
        self.set_attribute(node, "class", &classes.join(" "));
    }

    fn append_child(&mut self, parent: &NodeId, child: &NodeId) {
        // Appending a node under itself or its own subtree is refused
        let cyclic = match self.html.tree.get(parent.0) {
            Some(p) => p.id() == child.0 || p.ancestors().any(|a| a.id() == child.0),
            None => true,
        };
        if cyclic || self.html.tree.get(child.0).is_none() {
            return;
        }
        if let Some(mut node) = self.html.tree.get_mut(child.0) {
            node.detach();
        }
        if let Some(mut parent) = self.html.tree.get_mut(parent.0) {
            parent.append_id(child.0);
        }
    }

    fn remove(&mut self, node: &NodeId) {
        if let Some(mut node) = self.html.tree.get_mut(node.0) {
            node.detach();
        }
    }

    fn scroll_top(&self, surface: &ScrollSurface<NodeId>) -> f64 {
        match surface {
            ScrollSurface::Page => self.page_scroll_top,
            ScrollSurface::Element(node) => self.scroll_tops.get(node).copied().unwrap_or(0.0),
        }
    }

    fn smooth_scroll_to(&mut self, surface: &ScrollSurface<NodeId>, top: f64) -> std::result::Result<(), ScrollError> {
        if let ScrollSurface::Element(node) = surface {
            if self.no_smooth_scroll.contains(node) {
                return Err(ScrollError::Unsupported);
            }
        }
        // No animation here: the scroll lands immediately
        self.write_scroll_top(surface, top);
        self.scroll_log.push(ScrollCommand {
            surface: surface.clone(),
            top,
            smooth: true,
        });
        Ok(())
    }

    fn set_scroll_top(&mut self, surface: &ScrollSurface<NodeId>, top: f64) {
        self.write_scroll_top(surface, top);
        self.scroll_log.push(ScrollCommand {
            surface: surface.clone(),
            top,
            smooth: false,
        });
    }
}

/// Build a standalone element node by parsing its opening tag as a document
fn parse_element(tag: &str, attributes: &[(String, String)]) -> Result<Node> {
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(Error::Dom(format!("invalid tag name {:?}", tag)));
    }
    let mut markup = format!("<{}", tag);
    for (name, value) in attributes {
        markup.push_str(&format!(" {}=\"{}\"", name, escape_attribute(value)));
    }
    markup.push('>');

    let tag = tag.to_ascii_lowercase();
    let document = Html::parse_document(&markup);
    let element = document
        .tree
        .root()
        .descendants()
        .find(|n| n.value().as_element().map(|e| e.name() == tag).unwrap_or(false))
        .map(|n| n.value().clone());
    element.ok_or_else(|| Error::Dom(format!("<{}> cannot stand alone in a document", tag)))
}

fn is_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| !c.is_whitespace() && !c.is_control() && !matches!(c, '"' | '\'' | '>' | '/' | '=' | '<'))
}

/// `prop: value;` pairs of an inline style, in order
fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attribute(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
