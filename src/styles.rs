//! Page-level stylesheet
//!
//! The preview and scroll control carry their own inline styles. What can't
//! be inline lives here: smooth scrolling on the root, the hover state of the
//! close button and hiding the export storage element.

use crate::dom::Dom;
use crate::error::Result;
use crate::modal::CLOSE_CLASS;
use crate::scroll::SCROLL_BUTTON_ID;
use tracing::debug;

pub const STYLESHEET_ID: &str = "reportOverlayStyles";

/// CSS for the page, with the export storage element hidden by id
pub fn stylesheet(storage_id: &str) -> String {
    format!(
        "html, body {{ scroll-behavior: smooth !important; }}\n\
         .{close}:hover {{ background: #c82333 !important; transform: scale(1.1); }}\n\
         #{button} {{ z-index: 1000002 !important; }}\n\
         #{storage} {{ display: none !important; }}\n",
        close = CLOSE_CLASS,
        button = SCROLL_BUTTON_ID,
        storage = storage_id,
    )
}

/// Append the stylesheet to `<head>`, replacing one left by an earlier install
pub fn install_stylesheet<D: Dom>(dom: &mut D, css: &str) -> Result<D::Node> {
    if let Some(stale) = dom.element_by_id(STYLESHEET_ID) {
        debug!("Removing stale overlay stylesheet");
        dom.remove(&stale);
    }

    let style = dom.create_element("style")?;
    dom.set_attribute(&style, "id", STYLESHEET_ID);
    dom.set_text(&style, css);
    if let Some(head) = dom.head().or_else(|| dom.body()) {
        dom.append_child(&head, &style);
    }
    Ok(style)
}
