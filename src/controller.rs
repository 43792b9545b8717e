//! The overlay controller: one owner for all page-wide interaction state
//!
//! A host adapter forwards three kinds of document events here (capture
//! phase scrolls, root-level clicks, keydowns) plus a single deferred settle
//! call. The controller holds the only scroll-to-top control and the only
//! preview modal; nothing is reachable through globals.

use crate::actions::{ActionDispatcher, ActionOutcome, ActionTargets, ClickEvent};
use crate::browser::Browser;
use crate::config::OverlayConfig;
use crate::disposer::ListenerRegistry;
use crate::dom::{Dom, EventTarget, ScrollSurface};
use crate::error::Result;
use crate::menu::NavigationMenu;
use crate::modal::{CloseReason, ModalClick, ModalController};
use crate::report::ReportExporter;
use crate::scroll::{scroll_to_top, RootTarget, ScrollToTopControl, ScrollTracker};
use crate::styles;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// What a click ended up doing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClickOutcome {
    ScrolledToTop { surfaces: usize },
    ModalClosed { reason: String },
    /// Click inside the preview content; swallowed without action
    ModalContent,
    MenuToggled,
    Action(ActionOutcome),
    Ignored,
}

pub struct OverlayController<N> {
    tracker: ScrollTracker<N>,
    scroll_control: ScrollToTopControl<N>,
    scroll_roots: Vec<RootTarget>,
    modal: ModalController<N>,
    menu: NavigationMenu,
    dispatcher: ActionDispatcher,
    exporter: ReportExporter,
    listeners: ListenerRegistry,
    stylesheet: String,
    init_delay: Duration,
}

impl<N: Clone + PartialEq> OverlayController<N> {
    pub fn new(config: &OverlayConfig) -> Result<Self> {
        let scroll_roots = config
            .redundant_scroll_roots
            .iter()
            .map(RootTarget::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            tracker: ScrollTracker::new(config.scroll_threshold),
            scroll_control: ScrollToTopControl::new(),
            scroll_roots,
            modal: ModalController::new()?,
            menu: NavigationMenu::new(&config.menu),
            dispatcher: ActionDispatcher::new(&config.markers)?,
            exporter: ReportExporter::new(&config.export)?,
            listeners: ListenerRegistry::new(),
            stylesheet: styles::stylesheet(&config.export.storage_id),
            init_delay: Duration::from_millis(config.init_delay_ms),
        })
    }

    /// Add the page stylesheet and the persistent scroll-to-top control.
    /// Safe to call again.
    pub fn install<D: Dom<Node = N>>(&mut self, dom: &mut D) -> Result<()> {
        styles::install_stylesheet(dom, &self.stylesheet)?;
        self.scroll_control.install(dom)
    }

    /// How long the host should wait before calling [`settle`](Self::settle)
    pub fn init_delay(&self) -> Duration {
        self.init_delay
    }

    /// The settle delay as a `setTimeout` argument, saturating at `i32::MAX`
    pub fn timer_delay_ms(&self) -> i32 {
        i32::try_from(self.init_delay.as_millis()).unwrap_or(i32::MAX)
    }

    /// Deferred one-shot step once the page has been assembled
    pub fn settle<D: Dom<Node = N>>(&mut self, dom: &mut D) {
        self.modal.reconcile(dom, &mut self.listeners);
        debug!("Settling page at top");
        scroll_to_top(dom, &ScrollSurface::Page);
    }

    pub fn handle_scroll<D: Dom<Node = N>>(&mut self, dom: &mut D, origin: EventTarget<N>) {
        self.modal.reconcile(dom, &mut self.listeners);
        let visibility = self.tracker.observe(dom, origin);
        self.scroll_control.set_visibility(dom, visibility);
        self.menu.close_on_scroll(dom);
    }

    pub fn handle_click<D: Dom<Node = N>, B: Browser>(
        &mut self,
        dom: &mut D,
        browser: &mut B,
        event: &mut ClickEvent<N>,
    ) -> Result<ClickOutcome> {
        self.modal.reconcile(dom, &mut self.listeners);

        if self.scroll_control.is_hit(dom, &event.target) {
            event.prevent_default();
            event.stop_propagation();
            let scrolled = self
                .scroll_control
                .activate(dom, self.tracker.active(), &self.scroll_roots);
            return Ok(ClickOutcome::ScrolledToTop {
                surfaces: scrolled.len(),
            });
        }

        match self.modal.handle_click(dom, &mut self.listeners, &event.target) {
            ModalClick::Closed(reason) => {
                if reason == CloseReason::Button {
                    event.stop_propagation();
                }
                return Ok(ClickOutcome::ModalClosed {
                    reason: reason.to_string(),
                });
            }
            ModalClick::Content => return Ok(ClickOutcome::ModalContent),
            ModalClick::Outside => {}
        }

        if self.menu.handle_click(dom, &event.target) {
            event.prevent_default();
            event.stop_propagation();
            return Ok(ClickOutcome::MenuToggled);
        }

        let targets = ActionTargets {
            modal: &mut self.modal,
            registry: &mut self.listeners,
            exporter: &self.exporter,
        };
        Ok(match self.dispatcher.dispatch(dom, browser, targets, event)? {
            Some(outcome) => ClickOutcome::Action(outcome),
            None => ClickOutcome::Ignored,
        })
    }

    /// Returns whether the key closed the preview
    pub fn handle_keydown<D: Dom<Node = N>>(&mut self, dom: &mut D, key: &str) -> bool {
        self.modal.reconcile(dom, &mut self.listeners);
        self.modal.handle_key(dom, &mut self.listeners, key)
    }

    pub fn active_surface(&self) -> &ScrollSurface<N> {
        self.tracker.active()
    }

    pub fn scroll_control_visible(&self) -> bool {
        self.scroll_control.is_visible()
    }

    pub fn scroll_control(&self) -> &ScrollToTopControl<N> {
        &self.scroll_control
    }

    pub fn modal(&self) -> &ModalController<N> {
        &self.modal
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn is_menu_open<D: Dom<Node = N>>(&self, dom: &D) -> bool {
        self.menu.is_open(dom)
    }
}
