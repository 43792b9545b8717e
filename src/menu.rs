//! Navigation menu toggle and scroll dismissal
//!
//! Both elements are optional. A page without a menu simply never matches.

use crate::config::MenuConfig;
use crate::dom::Dom;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct NavigationMenu {
    toggle_id: String,
    panel_id: String,
    active_class: String,
}

impl NavigationMenu {
    pub fn new(config: &MenuConfig) -> Self {
        Self {
            toggle_id: config.toggle_id.clone(),
            panel_id: config.panel_id.clone(),
            active_class: config.active_class.clone(),
        }
    }

    pub fn is_open<D: Dom>(&self, dom: &D) -> bool {
        dom.element_by_id(&self.panel_id)
            .map(|panel| dom.has_class(&panel, &self.active_class))
            .unwrap_or(false)
    }

    /// Toggle the menu if `target` sits inside the toggle element.
    ///
    /// The toggle's state decides: the panel is set to match it rather than
    /// flipped on its own, so a pair left out of sync re-aligns on one click.
    pub fn handle_click<D: Dom>(&self, dom: &mut D, target: &D::Node) -> bool {
        let Some(toggle) = dom.element_by_id(&self.toggle_id) else {
            return false;
        };
        if !dom.contains(&toggle, target) {
            return false;
        }

        let open = !dom.has_class(&toggle, &self.active_class);
        dom.set_class(&toggle, &self.active_class, open);
        if let Some(panel) = dom.element_by_id(&self.panel_id) {
            dom.set_class(&panel, &self.active_class, open);
        }
        debug!(open, "Menu toggled");
        true
    }

    /// Any scroll closes an open menu. Returns whether it was open.
    pub fn close_on_scroll<D: Dom>(&self, dom: &mut D) -> bool {
        let (Some(toggle), Some(panel)) = (
            dom.element_by_id(&self.toggle_id),
            dom.element_by_id(&self.panel_id),
        ) else {
            return false;
        };
        if !dom.has_class(&panel, &self.active_class) {
            return false;
        }

        debug!("Closing menu on scroll");
        dom.set_class(&toggle, &self.active_class, false);
        dom.set_class(&panel, &self.active_class, false);
        true
    }
}
