//! Scroll tracking and the scroll-to-top control
//!
//! Scroll events are observed at document scope (capture phase in the
//! browser) so nested scroll containers report in as well as the page. The
//! most recent origin always wins; there is no debouncing.

use crate::config::ScrollRoot;
use crate::dom::{Dom, EventTarget, ScrollSurface, Selector};
use crate::error::Result;
use tracing::{debug, info};

pub const SCROLL_BUTTON_ID: &str = "scrollTopBtn";

/// Above the modal overlay and its close button
pub const SCROLL_BUTTON_Z_INDEX: &str = "1000002";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    pub fn is_visible(self) -> bool {
        self == Visibility::Visible
    }
}

#[derive(Debug)]
pub struct ScrollTracker<N> {
    active: ScrollSurface<N>,
    last_offset: f64,
    threshold: f64,
}

impl<N: Clone + PartialEq> ScrollTracker<N> {
    pub fn new(threshold: f64) -> Self {
        Self {
            active: ScrollSurface::Page,
            last_offset: 0.0,
            threshold,
        }
    }

    /// Record a scroll notification and decide control visibility
    pub fn observe<D: Dom<Node = N>>(&mut self, dom: &D, origin: EventTarget<N>) -> Visibility {
        let surface = ScrollSurface::from(origin);
        self.last_offset = dom.scroll_top(&surface);
        self.active = surface;

        if self.last_offset > self.threshold {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }

    pub fn active(&self) -> &ScrollSurface<N> {
        &self.active
    }

    pub fn last_offset(&self) -> f64 {
        self.last_offset
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

/// A configured scroll root with its selector compiled
#[derive(Debug, Clone)]
pub enum RootTarget {
    Page,
    DocumentElement,
    Body,
    Selector(Selector),
}

impl RootTarget {
    pub fn compile(root: &ScrollRoot) -> Result<Self> {
        Ok(match root {
            ScrollRoot::Page => RootTarget::Page,
            ScrollRoot::DocumentElement => RootTarget::DocumentElement,
            ScrollRoot::Body => RootTarget::Body,
            ScrollRoot::Selector(s) => RootTarget::Selector(Selector::parse(s)?),
        })
    }

    fn resolve<D: Dom>(&self, dom: &D) -> Option<ScrollSurface<D::Node>> {
        match self {
            RootTarget::Page => Some(ScrollSurface::Page),
            RootTarget::DocumentElement => dom.document_element().map(ScrollSurface::Element),
            RootTarget::Body => dom.body().map(ScrollSurface::Element),
            RootTarget::Selector(sel) => dom.query(sel).map(ScrollSurface::Element),
        }
    }
}

#[derive(Debug)]
pub struct ScrollToTopControl<N> {
    node: Option<N>,
    visible: bool,
}

impl<N> Default for ScrollToTopControl<N> {
    fn default() -> Self {
        Self {
            node: None,
            visible: false,
        }
    }
}

impl<N: Clone + PartialEq> ScrollToTopControl<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the control, removing any stale instance first
    pub fn install<D: Dom<Node = N>>(&mut self, dom: &mut D) -> Result<()> {
        if let Some(stale) = dom.element_by_id(SCROLL_BUTTON_ID) {
            debug!("Removing stale scroll-to-top control");
            dom.remove(&stale);
        }
        if let Some(previous) = self.node.take() {
            dom.remove(&previous);
        }

        let button = dom.create_element("button")?;
        dom.set_attribute(&button, "id", SCROLL_BUTTON_ID);
        dom.set_attribute(&button, "title", "Back to Top");
        dom.set_text(&button, "↑");
        dom.set_style(&button, "position", "fixed");
        dom.set_style(&button, "bottom", "20px");
        dom.set_style(&button, "right", "20px");
        dom.set_style(&button, "z-index", SCROLL_BUTTON_Z_INDEX);
        dom.set_visible(&button, false);

        if let Some(body) = dom.body() {
            dom.append_child(&body, &button);
        }

        info!(z_index = SCROLL_BUTTON_Z_INDEX, "Scroll-to-top control installed");
        self.node = Some(button);
        self.visible = false;
        Ok(())
    }

    pub fn set_visibility<D: Dom<Node = N>>(&mut self, dom: &mut D, visibility: Visibility) {
        let visible = visibility.is_visible();
        if let Some(ref node) = self.node {
            dom.set_visible(node, visible);
        }
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn node(&self) -> Option<&N> {
        self.node.as_ref()
    }

    /// Whether a click on `target` landed on the control
    pub fn is_hit<D: Dom<Node = N>>(&self, dom: &D, target: &N) -> bool {
        self.node
            .as_ref()
            .map(|node| dom.contains(node, target))
            .unwrap_or(false)
    }

    /// Smoothly return `active` to offset zero, then the redundant roots.
    ///
    /// Each surface gets at most one request per activation. Returns the
    /// surfaces that were scrolled, in order.
    pub fn activate<D: Dom<Node = N>>(
        &self,
        dom: &mut D,
        active: &ScrollSurface<N>,
        roots: &[RootTarget],
    ) -> Vec<ScrollSurface<N>> {
        let mut scrolled = vec![active.clone()];
        scroll_to_top(dom, active);

        for root in roots {
            let Some(surface) = root.resolve(dom) else {
                continue;
            };
            if scrolled.contains(&surface) {
                continue;
            }
            scroll_to_top(dom, &surface);
            scrolled.push(surface);
        }

        debug!(surfaces = scrolled.len(), "Scroll-to-top activated");
        scrolled
    }
}

/// Smooth scroll with a direct assignment fallback
pub fn scroll_to_top<D: Dom>(dom: &mut D, surface: &ScrollSurface<D::Node>) {
    if let Err(err) = dom.smooth_scroll_to(surface, 0.0) {
        debug!("Falling back to direct offset assignment: {err}");
        dom.set_scroll_top(surface, 0.0);
    }
}
