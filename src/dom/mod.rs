//! Document access for the overlay controller
//!
//! The controller never talks to a concrete DOM. Everything it reads or
//! mutates goes through the [`Dom`] trait, which is implemented by:
//!
//! - [`MemoryDom`]: an in-memory document used by tests and session replay
//! - `WebDom` in the `wasm-overlay` crate: the live browser document
//!
//! Node handles are cheap clonable references (`NodeId` here,
//! `web_sys::Element` in the browser) compared by identity.

pub mod memory;
pub mod selector;

pub use memory::{MemoryDom, NodeId, ScrollCommand};
pub use selector::Selector;

use crate::error::Result;
use std::fmt;

/// A scrollable region: the page itself or a nested element
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollSurface<N> {
    Page,
    Element(N),
}

impl<N> Default for ScrollSurface<N> {
    fn default() -> Self {
        ScrollSurface::Page
    }
}

/// Where a DOM event originated
#[derive(Debug, Clone, PartialEq)]
pub enum EventTarget<N> {
    /// The document itself (page-level scroll events target the document)
    Document,
    Element(N),
}

impl<N> From<EventTarget<N>> for ScrollSurface<N> {
    fn from(target: EventTarget<N>) -> Self {
        match target {
            EventTarget::Document => ScrollSurface::Page,
            EventTarget::Element(node) => ScrollSurface::Element(node),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollError {
    /// The surface has no smooth `scrollTo` capability
    Unsupported,
}

impl fmt::Display for ScrollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrollError::Unsupported => write!(f, "smooth scrolling not supported"),
        }
    }
}

pub trait Dom {
    type Node: Clone + PartialEq + fmt::Debug;

    fn body(&self) -> Option<Self::Node>;
    fn head(&self) -> Option<Self::Node>;
    fn document_element(&self) -> Option<Self::Node>;
    fn element_by_id(&self, id: &str) -> Option<Self::Node>;

    /// First attached element matching `selector`, in document order
    fn query(&self, selector: &Selector) -> Option<Self::Node>;
    fn query_all(&self, selector: &Selector) -> Vec<Self::Node>;
    /// First descendant of `root` matching `selector`
    fn query_in(&self, root: &Self::Node, selector: &Selector) -> Option<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
    fn matches(&self, node: &Self::Node, selector: &Selector) -> bool;

    /// Nearest inclusive ancestor matching `selector`
    fn closest(&self, node: &Self::Node, selector: &Selector) -> Option<Self::Node> {
        let mut current = Some(node.clone());
        while let Some(candidate) = current {
            if self.matches(&candidate, selector) {
                return Some(candidate);
            }
            current = self.parent(&candidate);
        }
        None
    }

    /// Whether `node` is `ancestor` or lies somewhere beneath it
    fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool {
        let mut current = Some(node.clone());
        while let Some(candidate) = current {
            if &candidate == ancestor {
                return true;
            }
            current = self.parent(&candidate);
        }
        false
    }

    fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn inner_html(&self, node: &Self::Node) -> String;
    fn has_class(&self, node: &Self::Node, class: &str) -> bool;
    fn is_attached(&self, node: &Self::Node) -> bool;

    fn create_element(&mut self, tag: &str) -> Result<Self::Node>;
    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str);
    fn set_text(&mut self, node: &Self::Node, text: &str);
    fn set_style(&mut self, node: &Self::Node, property: &str, value: &str);
    fn set_class(&mut self, node: &Self::Node, class: &str, present: bool);
    fn append_child(&mut self, parent: &Self::Node, child: &Self::Node);
    /// Detach `node` from its parent. A detached node is left alone.
    fn remove(&mut self, node: &Self::Node);

    fn set_visible(&mut self, node: &Self::Node, visible: bool) {
        self.set_style(node, "display", if visible { "block" } else { "none" });
    }

    fn scroll_top(&self, surface: &ScrollSurface<Self::Node>) -> f64;
    fn smooth_scroll_to(
        &mut self,
        surface: &ScrollSurface<Self::Node>,
        top: f64,
    ) -> std::result::Result<(), ScrollError>;
    fn set_scroll_top(&mut self, surface: &ScrollSurface<Self::Node>, top: f64);
}
