//! `Dom` over the live browser document

use report_overlay::dom::{Dom, ScrollError, ScrollSurface, Selector};
use report_overlay::{Error, Result};
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlElement, ScrollBehavior, ScrollToOptions, Window};

pub struct WebDom {
    window: Window,
    document: Document,
}

impl WebDom {
    pub fn new(window: Window, document: Document) -> Self {
        Self { window, document }
    }

    fn smooth_options(top: f64) -> ScrollToOptions {
        let options = ScrollToOptions::new();
        options.set_top(top);
        options.set_behavior(ScrollBehavior::Smooth);
        options
    }
}

/// Whether the element exposes a callable `scrollTo`
fn supports_scroll_to(element: &Element) -> bool {
    js_sys::Reflect::get(element, &"scrollTo".into())
        .map(|f| f.is_function())
        .unwrap_or(false)
}

impl Dom for WebDom {
    type Node = Element;

    fn body(&self) -> Option<Element> {
        self.document.body().map(Into::into)
    }

    fn head(&self) -> Option<Element> {
        self.document.head().map(Into::into)
    }

    fn document_element(&self) -> Option<Element> {
        self.document.document_element()
    }

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn query(&self, selector: &Selector) -> Option<Element> {
        self.document.query_selector(selector.as_str()).ok().flatten()
    }

    fn query_all(&self, selector: &Selector) -> Vec<Element> {
        let Ok(list) = self.document.query_selector_all(selector.as_str()) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.get(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn query_in(&self, root: &Element, selector: &Selector) -> Option<Element> {
        root.query_selector(selector.as_str()).ok().flatten()
    }

    fn parent(&self, node: &Element) -> Option<Element> {
        node.parent_element()
    }

    fn matches(&self, node: &Element, selector: &Selector) -> bool {
        node.matches(selector.as_str()).unwrap_or(false)
    }

    fn closest(&self, node: &Element, selector: &Selector) -> Option<Element> {
        node.closest(selector.as_str()).ok().flatten()
    }

    fn contains(&self, ancestor: &Element, node: &Element) -> bool {
        let node: &web_sys::Node = node;
        ancestor.contains(Some(node))
    }

    fn attribute(&self, node: &Element, name: &str) -> Option<String> {
        node.get_attribute(name)
    }

    fn inner_html(&self, node: &Element) -> String {
        node.inner_html()
    }

    fn has_class(&self, node: &Element, class: &str) -> bool {
        node.class_list().contains(class)
    }

    fn is_attached(&self, node: &Element) -> bool {
        node.is_connected()
    }

    fn create_element(&mut self, tag: &str) -> Result<Element> {
        self.document
            .create_element(tag)
            .map_err(|e| Error::Dom(format!("create <{}>: {:?}", tag, e)))
    }

    fn set_attribute(&mut self, node: &Element, name: &str, value: &str) {
        node.set_attribute(name, value).ok();
    }

    fn set_text(&mut self, node: &Element, text: &str) {
        node.set_text_content(Some(text));
    }

    fn set_style(&mut self, node: &Element, property: &str, value: &str) {
        if let Some(html) = node.dyn_ref::<HtmlElement>() {
            html.style().set_property(property, value).ok();
        }
    }

    fn set_class(&mut self, node: &Element, class: &str, present: bool) {
        node.class_list().toggle_with_force(class, present).ok();
    }

    fn append_child(&mut self, parent: &Element, child: &Element) {
        parent.append_child(child).ok();
    }

    fn remove(&mut self, node: &Element) {
        node.remove();
    }

    fn scroll_top(&self, surface: &ScrollSurface<Element>) -> f64 {
        match surface {
            ScrollSurface::Page => self.window.scroll_y().unwrap_or(0.0),
            ScrollSurface::Element(node) => f64::from(node.scroll_top()),
        }
    }

    fn smooth_scroll_to(&mut self, surface: &ScrollSurface<Element>, top: f64) -> std::result::Result<(), ScrollError> {
        match surface {
            ScrollSurface::Page => self.window.scroll_to_with_scroll_to_options(&Self::smooth_options(top)),
            ScrollSurface::Element(node) => {
                if !supports_scroll_to(node) {
                    return Err(ScrollError::Unsupported);
                }
                node.scroll_to_with_scroll_to_options(&Self::smooth_options(top));
            }
        }
        Ok(())
    }

    fn set_scroll_top(&mut self, surface: &ScrollSurface<Element>, top: f64) {
        let top = top.round() as i32;
        match surface {
            ScrollSurface::Page => {
                if let Some(root) = self.document.document_element() {
                    root.set_scroll_top(top);
                }
            }
            ScrollSurface::Element(node) => node.set_scroll_top(top),
        }
    }
}
