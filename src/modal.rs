//! Full-screen image preview
//!
//! At most one preview exists at a time. Opening a new one tears down the
//! current one first. Each instance carries a [`Disposer`] created with it
//! that releases its keydown registration; every close path (button,
//! backdrop, Escape, replacement, or the node vanishing under us) funnels
//! through [`ModalController::close_with`], so cleanup runs exactly once.

use crate::disposer::{Disposer, ListenerId, ListenerKind, ListenerRegistry};
use crate::dom::{Dom, Selector};
use crate::error::Result;
use std::fmt;
use tracing::{debug, info};

pub const MODAL_CLASS: &str = "fixed-modal";
pub const CONTENT_CLASS: &str = "fixed-modal-content";
pub const TITLE_CLASS: &str = "fixed-modal-title";
pub const CLOSE_CLASS: &str = "fixed-modal-close";

pub const MODAL_Z_INDEX: &str = "1000000";
pub const CLOSE_Z_INDEX: &str = "1000001";
pub const TITLE_Z_INDEX: &str = "1000002";

/// Full-screen dimmed backdrop; tall images scroll inside it
const OVERLAY_STYLE: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("top", "0"),
    ("left", "0"),
    ("width", "100%"),
    ("height", "100%"),
    ("background", "rgba(0, 0, 0, 0.95)"),
    ("z-index", MODAL_Z_INDEX),
    ("display", "flex"),
    ("justify-content", "center"),
    ("align-items", "flex-start"),
    ("overflow-y", "auto"),
    ("padding", "40px 20px"),
];

const CONTENT_STYLE: &[(&str, &str)] = &[
    ("position", "relative"),
    ("max-width", "90%"),
    ("margin", "40px auto"),
    ("text-align", "center"),
];

const IMAGE_STYLE: &[(&str, &str)] = &[
    ("max-width", "100%"),
    ("max-height", "calc(100vh - 120px)"),
    ("width", "auto"),
    ("height", "auto"),
    ("border-radius", "8px"),
    ("box-shadow", "0 15px 40px rgba(0, 0, 0, 0.7)"),
    ("object-fit", "contain"),
    ("display", "block"),
];

const TITLE_STYLE: &[(&str, &str)] = &[
    ("position", "absolute"),
    ("top", "15px"),
    ("right", "15px"),
    ("color", "white"),
    ("background", "rgba(0, 0, 0, 0.8)"),
    ("padding", "8px 16px"),
    ("border-radius", "20px"),
    ("font-family", "system-ui, -apple-system, sans-serif"),
    ("font-size", "14px"),
    ("font-weight", "600"),
    ("z-index", TITLE_Z_INDEX),
    ("backdrop-filter", "blur(5px)"),
    ("border", "1px solid rgba(255, 255, 255, 0.2)"),
];

const CLOSE_STYLE: &[(&str, &str)] = &[
    ("position", "fixed"),
    ("top", "50px"),
    ("left", "50px"),
    ("background", "#dc3545"),
    ("color", "white"),
    ("border", "none"),
    ("border-radius", "50%"),
    ("width", "45px"),
    ("height", "45px"),
    ("cursor", "pointer"),
    ("font-size", "20px"),
    ("font-weight", "bold"),
    ("z-index", CLOSE_Z_INDEX),
    ("display", "flex"),
    ("align-items", "center"),
    ("justify-content", "center"),
    ("box-shadow", "0 2px 8px rgba(0, 0, 0, 0.3)"),
    ("transition", "all 0.2s ease"),
];

fn apply_style<D: Dom>(dom: &mut D, node: &D::Node, style: &[(&str, &str)]) {
    for (property, value) in style {
        dom.set_style(node, property, value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Button,
    Backdrop,
    Escape,
    /// A new preview was opened on top
    Replaced,
    /// Someone else removed the overlay node
    Detached,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloseReason::Button => "button",
            CloseReason::Backdrop => "backdrop",
            CloseReason::Escape => "escape",
            CloseReason::Replaced => "replaced",
            CloseReason::Detached => "detached",
        };
        f.write_str(s)
    }
}

/// What a click meant to the open preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalClick {
    Closed(CloseReason),
    /// Landed on the image or title: keeps the preview open
    Content,
    /// No preview open, or the click was elsewhere
    Outside,
}

#[derive(Debug)]
pub struct ModalInstance<N> {
    overlay: N,
    close_button: N,
    media: String,
    title: String,
    key_listener: ListenerId,
    disposer: Disposer,
}

impl<N> ModalInstance<N> {
    pub fn overlay(&self) -> &N {
        &self.overlay
    }

    pub fn media(&self) -> &str {
        &self.media
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn key_listener(&self) -> ListenerId {
        self.key_listener
    }
}

#[derive(Debug)]
pub struct ModalController<N> {
    instance: Option<ModalInstance<N>>,
    overlay_selector: Selector,
}

impl<N: Clone + PartialEq> ModalController<N> {
    pub fn new() -> Result<Self> {
        Ok(Self {
            instance: None,
            overlay_selector: Selector::parse(&format!(".{}", MODAL_CLASS))?,
        })
    }

    pub fn is_open(&self) -> bool {
        self.instance.is_some()
    }

    pub fn instance(&self) -> Option<&ModalInstance<N>> {
        self.instance.as_ref()
    }

    /// Show `media` full screen, replacing any preview already in the document
    pub fn open<D: Dom<Node = N>>(
        &mut self,
        dom: &mut D,
        registry: &mut ListenerRegistry,
        media: &str,
        title: &str,
    ) -> Result<()> {
        self.close_with(dom, registry, CloseReason::Replaced);
        for stale in dom.query_all(&self.overlay_selector) {
            debug!("Removing stale preview overlay");
            dom.remove(&stale);
        }

        let overlay = dom.create_element("div")?;
        dom.set_attribute(&overlay, "class", MODAL_CLASS);
        apply_style(dom, &overlay, OVERLAY_STYLE);

        let content = dom.create_element("div")?;
        dom.set_attribute(&content, "class", CONTENT_CLASS);
        apply_style(dom, &content, CONTENT_STYLE);

        let image = dom.create_element("img")?;
        dom.set_attribute(&image, "src", media);
        dom.set_attribute(&image, "alt", title);
        apply_style(dom, &image, IMAGE_STYLE);

        let label = dom.create_element("div")?;
        dom.set_attribute(&label, "class", TITLE_CLASS);
        apply_style(dom, &label, TITLE_STYLE);
        dom.set_text(&label, title);

        let close_button = dom.create_element("button")?;
        dom.set_attribute(&close_button, "class", CLOSE_CLASS);
        apply_style(dom, &close_button, CLOSE_STYLE);
        dom.set_text(&close_button, "×");

        dom.append_child(&content, &image);
        dom.append_child(&content, &label);
        dom.append_child(&overlay, &content);
        dom.append_child(&overlay, &close_button);

        let key_listener = registry.register(ListenerKind::Keydown);
        let disposer = Disposer::new(move |registry| {
            registry.unregister(key_listener);
        });

        if let Some(body) = dom.body() {
            dom.append_child(&body, &overlay);
        }

        info!(title, "Preview opened");
        self.instance = Some(ModalInstance {
            overlay,
            close_button,
            media: media.to_string(),
            title: title.to_string(),
            key_listener,
            disposer,
        });
        Ok(())
    }

    /// Remove the overlay and release its listeners. No-op when closed.
    pub fn close_with<D: Dom<Node = N>>(
        &mut self,
        dom: &mut D,
        registry: &mut ListenerRegistry,
        reason: CloseReason,
    ) -> bool {
        let Some(mut instance) = self.instance.take() else {
            return false;
        };
        dom.remove(&instance.overlay);
        instance.disposer.dispose(registry);
        info!(%reason, "Preview closed");
        true
    }

    pub fn close<D: Dom<Node = N>>(&mut self, dom: &mut D, registry: &mut ListenerRegistry) -> bool {
        self.close_with(dom, registry, CloseReason::Button)
    }

    /// Dispose an instance whose overlay was removed by some other path
    pub fn reconcile<D: Dom<Node = N>>(&mut self, dom: &mut D, registry: &mut ListenerRegistry) -> bool {
        let detached = self
            .instance
            .as_ref()
            .map(|i| !dom.is_attached(&i.overlay))
            .unwrap_or(false);
        if detached {
            self.close_with(dom, registry, CloseReason::Detached)
        } else {
            false
        }
    }

    pub fn handle_click<D: Dom<Node = N>>(
        &mut self,
        dom: &mut D,
        registry: &mut ListenerRegistry,
        target: &N,
    ) -> ModalClick {
        let Some(ref instance) = self.instance else {
            return ModalClick::Outside;
        };

        let reason = if dom.contains(&instance.close_button, target) {
            CloseReason::Button
        } else if *target == instance.overlay {
            CloseReason::Backdrop
        } else if dom.contains(&instance.overlay, target) {
            return ModalClick::Content;
        } else {
            return ModalClick::Outside;
        };

        self.close_with(dom, registry, reason);
        ModalClick::Closed(reason)
    }

    /// Route a keydown to the preview's Escape handler while it is registered
    pub fn handle_key<D: Dom<Node = N>>(
        &mut self,
        dom: &mut D,
        registry: &mut ListenerRegistry,
        key: &str,
    ) -> bool {
        let listening = self
            .instance
            .as_ref()
            .map(|i| registry.is_active(i.key_listener))
            .unwrap_or(false);
        if listening && key == "Escape" {
            self.close_with(dom, registry, CloseReason::Escape)
        } else {
            false
        }
    }
}
